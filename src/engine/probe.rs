//! Duration and bitrate probing.
//!
//! Both probes prefer `ffprobe`. Duration falls back to the `Duration:` line
//! of an analyze-only `ffmpeg` run; bitrate has no fallback. Neither probe is
//! ever fatal: failures degrade to `None`.

use std::ffi::OsString;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use super::process::run_captured;
use super::tools::Toolchain;

/// `Duration: HH:MM:SS.cc` as printed in ffmpeg's input banner.
static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Duration:\s*(\d{2}):(\d{2}):(\d{2})\.(\d{2})").expect("valid duration regex")
});

/// Media duration in seconds, or `None` when it cannot be determined.
pub async fn probe_duration(tools: &Toolchain, input: &Path) -> Option<f64> {
    if let Some(ffprobe) = &tools.ffprobe {
        let args: Vec<OsString> = vec![
            "-v".into(),
            "error".into(),
            "-show_entries".into(),
            "format=duration".into(),
            "-of".into(),
            "default=noprint_wrappers=1:nokey=1".into(),
            input.into(),
        ];
        match run_captured(ffprobe, &args).await {
            Ok(out) if out.status.success() => {
                let text = String::from_utf8_lossy(&out.stdout);
                if let Some(secs) = parse_probe_seconds(&text) {
                    return Some(secs);
                }
                log::debug!("ffmpeg: ffprobe duration unusable ({:?})", text.trim());
            }
            Ok(out) => log::debug!("ffmpeg: ffprobe duration exited with {}", out.status),
            Err(e) => log::debug!("ffmpeg: ffprobe duration failed: {e}"),
        }
    }

    let args: Vec<OsString> = vec![
        "-hide_banner".into(),
        "-i".into(),
        input.into(),
        "-f".into(),
        "null".into(),
        "-".into(),
    ];
    match run_captured(&tools.ffmpeg, &args).await {
        Ok(out) => parse_duration_banner(&String::from_utf8_lossy(&out.stderr)),
        Err(e) => {
            log::debug!("ffmpeg: duration fallback failed: {e}");
            None
        }
    }
}

/// Audio bitrate of the first audio stream as `"<n>k"`, if ffprobe knows it.
pub async fn probe_bitrate(tools: &Toolchain, input: &Path) -> Option<String> {
    let ffprobe = tools.ffprobe.as_ref()?;
    let args: Vec<OsString> = vec![
        "-v".into(),
        "error".into(),
        "-select_streams".into(),
        "a:0".into(),
        "-show_entries".into(),
        "stream=bit_rate".into(),
        "-of".into(),
        "default=noprint_wrappers=1:nokey=1".into(),
        input.into(),
    ];

    let out = match run_captured(ffprobe, &args).await {
        Ok(out) if out.status.success() => out,
        Ok(out) => {
            log::debug!("ffmpeg: ffprobe bitrate exited with {}", out.status);
            return None;
        }
        Err(e) => {
            log::debug!("ffmpeg: ffprobe bitrate failed: {e}");
            return None;
        }
    };

    let text = String::from_utf8_lossy(&out.stdout);
    let value = text.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse::<u64>().ok().and_then(format_kbps)
}

/// Parse ffprobe's bare `format=duration` output.
pub fn parse_probe_seconds(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs > 0.0)
}

/// Extract the `Duration:` line from ffmpeg's diagnostic text.
///
/// ```
/// use lufs_normalizer::engine::probe::parse_duration_banner;
///
/// let secs = parse_duration_banner("  Duration: 00:02:03.45, start: 0.000000").unwrap();
/// assert!((secs - 123.45).abs() < 1e-9);
/// ```
pub fn parse_duration_banner(stderr: &str) -> Option<f64> {
    let caps = DURATION_RE.captures(stderr)?;
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
    let (h, m, s, cs) = (field(1)?, field(2)?, field(3)?, field(4)?);
    Some(f64::from(h) * 3600.0 + f64::from(m) * 60.0 + f64::from(s) + f64::from(cs) / 100.0)
}

/// Round bits-per-second to the nearest kilobit (minimum `1k`).
pub fn format_kbps(bits_per_second: u64) -> Option<String> {
    if bits_per_second == 0 {
        return None;
    }
    let kbps = ((bits_per_second as f64) / 1000.0).round().max(1.0) as u64;
    Some(format!("{kbps}k"))
}
