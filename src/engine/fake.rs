//! Shell-script stand-ins for `ffmpeg` / `ffprobe` used by process-level
//! tests. Every invocation is appended to `calls.log` in the temp dir.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::tools::Toolchain;
use crate::config::ToolsConfig;

pub(crate) const SAMPLE_MEASUREMENT: &str = r#"{"input_i":"-20.1","input_tp":"-3.0","input_lra":"5.0","input_thresh":"-30.1","target_offset":"6.1"}"#;

/// Configurable fake engine living in its own temp dir.
pub(crate) struct FakeEngine {
    dir: TempDir,
    /// stderr of the analysis pass.
    pub measure_stderr: String,
    /// stdout lines of the correction pass.
    pub progress_lines: Vec<String>,
    /// stderr of the correction pass.
    pub correction_stderr: String,
    /// Exit status of the correction pass; the output file is only created
    /// on `0`.
    pub correction_exit: i32,
    /// `Duration:` value printed by the analyze-only fallback run.
    pub banner_duration: String,
    /// `None` leaves ffprobe out of the toolchain.
    pub ffprobe: Option<FakeProbe>,
}

pub(crate) struct FakeProbe {
    /// Printed for `format=duration`; `None` makes ffprobe fail.
    pub duration: Option<String>,
    /// Printed for `stream=bit_rate`.
    pub bit_rate: String,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("temp dir"),
            measure_stderr: format!(
                "Input #0, wav, from 'in.wav':\n[Parsed_loudnorm_0 @ 0x5581]\n{SAMPLE_MEASUREMENT}\n[out#0/null @ 0x55] size=N/A\n"
            ),
            progress_lines: vec![
                "frame=0".into(),
                "out_time_ms=50000".into(),
                "progress=continue".into(),
                "out_time_us=75000000".into(),
                "progress=continue".into(),
                "out_time=00:01:40.000000".into(),
                "progress=end".into(),
            ],
            correction_stderr: "[Parsed_loudnorm_0 @ 0x1] summary".into(),
            correction_exit: 0,
            banner_duration: "00:01:40.00".into(),
            ffprobe: Some(FakeProbe {
                duration: Some("100.000000".into()),
                bit_rate: "192000".into(),
            }),
        }
    }

    /// Scratch directory for inputs and outputs.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn log_path(&self) -> PathBuf {
        self.dir.path().join("calls.log")
    }

    /// Write the scripts and return a config pointing at them.
    pub fn tools_config(&self) -> ToolsConfig {
        let bin = self.dir.path().join("bin");
        std::fs::create_dir_all(&bin).expect("bin dir");

        let ffmpeg = bin.join("ffmpeg");
        write_script(&ffmpeg, &self.ffmpeg_script());

        let ffprobe = bin.join("ffprobe");
        if let Some(probe) = &self.ffprobe {
            write_script(&ffprobe, &self.ffprobe_script(probe));
        }

        ToolsConfig { ffmpeg, ffprobe }
    }

    pub fn toolchain(&self) -> Toolchain {
        Toolchain::discover(&self.tools_config()).expect("fake toolchain")
    }

    /// Recorded invocations, one `"<tool> <args>"` line each.
    pub fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.log_path())
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Create an input file in the scratch dir.
    pub fn input(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, b"RIFF....WAVE").expect("write input");
        path
    }

    fn ffmpeg_script(&self) -> String {
        format!(
            r#"#!/bin/sh
echo "ffmpeg $*" >> "{log}"
for last in "$@"; do :; done
case "$*" in
  *print_format=json*)
    cat >&2 <<'__MEASURE__'
{measure}
__MEASURE__
    exit 0
    ;;
  *"-progress pipe:1"*)
    cat <<'__PROGRESS__'
{progress}
__PROGRESS__
    cat >&2 <<'__STDERR__'
{stderr}
__STDERR__
    if [ {exit} -eq 0 ]; then : > "$last"; fi
    exit {exit}
    ;;
esac
echo "  Duration: {banner}, start: 0.000000, bitrate: 192 kb/s" >&2
exit 0
"#,
            log = self.log_path().display(),
            measure = self.measure_stderr,
            progress = self.progress_lines.join("\n"),
            stderr = self.correction_stderr,
            exit = self.correction_exit,
            banner = self.banner_duration,
        )
    }

    fn ffprobe_script(&self, probe: &FakeProbe) -> String {
        let duration = match &probe.duration {
            Some(value) => format!("echo \"{value}\"; exit 0"),
            None => "exit 1".to_string(),
        };
        format!(
            r#"#!/bin/sh
echo "ffprobe $*" >> "{log}"
case "$*" in
  *format=duration*) {duration} ;;
  *stream=bit_rate*) echo "{bit_rate}"; exit 0 ;;
esac
exit 1
"#,
            log = self.log_path().display(),
            bit_rate = probe.bit_rate,
        )
    }
}

fn write_script(path: &Path, body: &str) {
    std::fs::write(path, body).expect("write script");
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
}
