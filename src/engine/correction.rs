//! Second pass: apply the linear loudnorm correction and stream progress.
//!
//! ```text
//! ffmpeg ... -progress pipe:1 <out>
//!    stdout ──▶ read line by line ──▶ ProgressReporter ──▶ on_progress(f)
//!    stderr ──▶ drain task ──▶ DiagnosticTail (last 200 lines)
//!    exit   ──▶ on_progress(1.0) (drop guard), non-zero ⇒ SecondPass error
//! ```

use std::ffi::OsString;
use std::path::Path;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use super::encode::EncodeSettings;
use super::loudnorm::{correction_filter, LoudnessMeasurement, LoudnessTargets};
use super::process::{engine_command, spawn_error, DiagnosticTail};
use super::progress::{ProgressFn, ProgressReporter};
use super::tools::Toolchain;
use crate::normalize::NormalizeError;

/// Characters of second-pass stderr surfaced on failure.
const FAILURE_TAIL_CHARS: usize = 2000;

/// Everything the correction pass needs besides the toolchain.
#[derive(Debug, Clone, Copy)]
pub struct CorrectionPass<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub targets: &'a LoudnessTargets,
    pub measurement: &'a LoudnessMeasurement,
    pub encode: &'a EncodeSettings,
}

impl CorrectionPass<'_> {
    /// Full ffmpeg argument list. Never contains `-y`.
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-nostats".into(),
            "-i".into(),
            self.input.into(),
            "-af".into(),
            correction_filter(self.targets, self.measurement).into(),
            "-progress".into(),
            "pipe:1".into(),
        ];
        args.extend(self.encode.to_args());
        args.push(self.output.into());
        args
    }
}

/// Run the correction pass.
///
/// `duration_secs` enables fractional progress; `on_progress` receives a
/// final `1.0` however this function returns.
///
/// # Errors
///
/// * [`NormalizeError::Spawn`] if ffmpeg cannot be started.
/// * [`NormalizeError::SecondPass`] on a non-zero exit, with the last 2000
///   characters of stderr.
pub async fn run_correction(
    tools: &Toolchain,
    pass: &CorrectionPass<'_>,
    duration_secs: Option<f64>,
    on_progress: ProgressFn<'_>,
) -> Result<(), NormalizeError> {
    let mut reporter = ProgressReporter::new(on_progress, duration_secs);

    let args = pass.args();
    let mut child = engine_command(&tools.ffmpeg, &args)
        .spawn()
        .map_err(|e| spawn_error(&tools.ffmpeg, e))?;

    let drain = tokio::spawn(drain_stderr(child.stderr.take()));

    if let Some(stdout) = child.stdout.take() {
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => reporter.observe_line(&String::from_utf8_lossy(&buf)),
                Err(e) => {
                    log::debug!("ffmpeg: progress stream read failed: {e}");
                    break;
                }
            }
        }
    }

    let status = child.wait().await?;
    let tail = drain.await.unwrap_or_default();
    drop(reporter);

    if !status.success() {
        return Err(NormalizeError::SecondPass {
            status: status.to_string(),
            stderr_tail: tail.render(FAILURE_TAIL_CHARS),
        });
    }
    Ok(())
}

/// Read stderr to EOF so ffmpeg never blocks on a full pipe, keeping only
/// the most recent lines.
async fn drain_stderr<R>(stderr: Option<R>) -> DiagnosticTail
where
    R: AsyncRead + Unpin,
{
    let mut tail = DiagnosticTail::default();
    let Some(stderr) = stderr else {
        return tail;
    };

    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                tail.push(line.trim_end_matches(['\r', '\n']).to_string());
            }
            Err(e) => {
                log::debug!("ffmpeg: stderr drain stopped: {e}");
                break;
            }
        }
    }
    tail
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::encode::ChannelLayout;
    use std::path::PathBuf;

    fn measurement() -> LoudnessMeasurement {
        LoudnessMeasurement {
            measured_i: -20.1,
            measured_lra: 5.0,
            measured_tp: -3.0,
            measured_thresh: -30.1,
            offset: 6.1,
        }
    }

    #[test]
    fn args_layout() {
        let targets = LoudnessTargets::default();
        let m = measurement();
        let encode = EncodeSettings::resolve(
            Path::new("out.mp3"),
            Some("192k"),
            None,
            Some(ChannelLayout::Stereo),
        );
        let pass = CorrectionPass {
            input: Path::new("in.wav"),
            output: Path::new("out.mp3"),
            targets: &targets,
            measurement: &m,
            encode: &encode,
        };

        let args: Vec<String> = pass
            .args()
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(&args[..4], ["-hide_banner", "-nostats", "-i", "in.wav"]);
        assert_eq!(args[4], "-af");
        assert!(args[5].contains("linear=true"));
        assert_eq!(&args[6..8], ["-progress", "pipe:1"]);
        assert_eq!(
            &args[8..],
            ["-c:a", "libmp3lame", "-b:a", "192k", "-ac", "2", "out.mp3"]
        );
        assert!(!args.iter().any(|a| a == "-y"));
    }

    #[tokio::test]
    async fn drain_keeps_last_lines() {
        let text: String = (0..250).map(|i| format!("line {i}\n")).collect();
        let tail = drain_stderr(Some(text.as_bytes())).await;
        assert_eq!(tail.len(), DiagnosticTail::DEFAULT_LINES);
        assert!(tail.render(FAILURE_TAIL_CHARS).ends_with("line 249"));
    }

    #[tokio::test]
    async fn drain_without_stream_is_empty() {
        let tail = drain_stderr::<&[u8]>(None).await;
        assert!(tail.is_empty());
    }

    #[tokio::test]
    async fn spawn_failure_still_reports_completion() {
        let tools = Toolchain {
            ffmpeg: PathBuf::from("/nonexistent/ffmpeg-binary"),
            ffprobe: None,
        };
        let targets = LoudnessTargets::default();
        let m = measurement();
        let encode = EncodeSettings::default();
        let pass = CorrectionPass {
            input: Path::new("in.wav"),
            output: Path::new("out.wav"),
            targets: &targets,
            measurement: &m,
            encode: &encode,
        };

        let mut seen = Vec::new();
        let mut sink = |f: f64| seen.push(f);
        let err = run_correction(&tools, &pass, Some(10.0), &mut sink)
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), 1);
        assert_eq!(seen, vec![1.0]);
    }
}
