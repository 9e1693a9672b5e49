//! The `loudnorm` filter: targets, first-pass measurement and the filter
//! directives for both passes.

use std::ffi::OsString;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::process::{run_captured, tail_chars};
use super::tools::Toolchain;
use crate::config::LoudnessConfig;
use crate::normalize::NormalizeError;

/// Brace-delimited block starting with `"input_i"`, surrounded by log noise.
static JSON_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\{\s*"input_i"[\s\S]*?\}"#).expect("valid loudnorm regex"));

/// Characters of first-pass stderr surfaced when the JSON block is missing.
const MEASUREMENT_TAIL_CHARS: usize = 1000;

// ---------------------------------------------------------------------------
// LoudnessTargets
// ---------------------------------------------------------------------------

/// Target integrated loudness, true-peak ceiling and loudness range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessTargets {
    /// Integrated loudness in LUFS.
    pub i: f64,
    /// True peak in dBTP.
    pub tp: f64,
    /// Loudness range.
    pub lra: f64,
}

impl Default for LoudnessTargets {
    fn default() -> Self {
        LoudnessConfig::default().into()
    }
}

impl From<LoudnessConfig> for LoudnessTargets {
    fn from(cfg: LoudnessConfig) -> Self {
        Self {
            i: cfg.integrated,
            tp: cfg.true_peak,
            lra: cfg.range,
        }
    }
}

// ---------------------------------------------------------------------------
// LoudnessMeasurement
// ---------------------------------------------------------------------------

/// Statistics measured by the first pass, fed verbatim into the second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessMeasurement {
    pub measured_i: f64,
    pub measured_lra: f64,
    pub measured_tp: f64,
    pub measured_thresh: f64,
    pub offset: f64,
}

/// loudnorm's native JSON field names. Values arrive as strings.
#[derive(Debug, Deserialize)]
struct LoudnormReport {
    input_i: String,
    input_tp: String,
    input_lra: String,
    input_thresh: String,
    target_offset: String,
}

impl LoudnessMeasurement {
    /// Locate and parse the loudnorm JSON block inside `stderr`.
    ///
    /// Returns a short reason on failure; the caller attaches the stderr tail.
    pub fn from_diagnostics(stderr: &str) -> Result<Self, String> {
        let block = JSON_BLOCK_RE
            .find(stderr)
            .ok_or_else(|| "no loudnorm JSON block in ffmpeg output".to_string())?;

        let report: LoudnormReport =
            serde_json::from_str(block.as_str()).map_err(|e| format!("invalid JSON: {e}"))?;

        let num = |name: &str, raw: &str| {
            raw.trim()
                .parse::<f64>()
                .map_err(|_| format!("{name} is not a number: {raw:?}"))
        };

        Ok(Self {
            measured_i: num("input_i", &report.input_i)?,
            measured_lra: num("input_lra", &report.input_lra)?,
            measured_tp: num("input_tp", &report.input_tp)?,
            measured_thresh: num("input_thresh", &report.input_thresh)?,
            offset: num("target_offset", &report.target_offset)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Filter directives
// ---------------------------------------------------------------------------

/// `-af` value for the analysis pass.
pub fn analysis_filter(targets: &LoudnessTargets) -> String {
    format!(
        "loudnorm=I={}:TP={}:LRA={}:print_format=json",
        targets.i, targets.tp, targets.lra
    )
}

/// `-af` value for the correction pass.
pub fn correction_filter(targets: &LoudnessTargets, m: &LoudnessMeasurement) -> String {
    format!(
        "loudnorm=I={}:TP={}:LRA={}:measured_I={}:measured_TP={}:measured_LRA={}:measured_thresh={}:offset={}:linear=true:print_format=summary",
        targets.i,
        targets.tp,
        targets.lra,
        m.measured_i,
        m.measured_tp,
        m.measured_lra,
        m.measured_thresh,
        m.offset,
    )
}

// ---------------------------------------------------------------------------
// First pass
// ---------------------------------------------------------------------------

/// Run the analysis pass and return the measured statistics.
///
/// # Errors
///
/// [`NormalizeError::Measurement`] when no JSON block can be parsed; the
/// error carries the last 1000 characters of stderr.
pub async fn measure(
    tools: &Toolchain,
    input: &Path,
    targets: &LoudnessTargets,
) -> Result<LoudnessMeasurement, NormalizeError> {
    let args: Vec<OsString> = vec![
        "-hide_banner".into(),
        "-nostats".into(),
        "-i".into(),
        input.into(),
        "-af".into(),
        analysis_filter(targets).into(),
        "-f".into(),
        "null".into(),
        "-".into(),
    ];

    let output = run_captured(&tools.ffmpeg, &args).await?;
    let stderr = String::from_utf8_lossy(&output.stderr);

    match LoudnessMeasurement::from_diagnostics(&stderr) {
        Ok(m) => {
            log::debug!("normalize: first pass measured {m:?}");
            Ok(m)
        }
        Err(reason) => Err(NormalizeError::Measurement {
            reason,
            stderr_tail: tail_chars(&stderr, MEASUREMENT_TAIL_CHARS).to_string(),
        }),
    }
}
