//! FFmpeg engine plumbing.
//!
//! # Architecture
//!
//! ```text
//! Toolchain::discover ──▶ ffmpeg (required) + ffprobe (optional)
//!
//! probe_duration  ── ffprobe format=duration ─┐ fallback: ffmpeg "Duration:" line
//! probe_bitrate   ── ffprobe stream=bit_rate
//! measure         ── ffmpeg loudnorm print_format=json  ──▶ LoudnessMeasurement
//! run_correction  ── ffmpeg loudnorm measured_*  -progress pipe:1
//!                      └─▶ ProgressReporter ──▶ on_progress(f64)
//! ```
//!
//! Nothing here decides output names or batch policy; that lives in
//! [`crate::normalize`].

pub mod correction;
pub mod encode;
pub mod loudnorm;
pub mod probe;
pub mod process;
pub mod progress;
pub mod tools;

#[cfg(all(test, unix))]
pub(crate) mod fake;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use correction::{run_correction, CorrectionPass};
pub use encode::{ChannelLayout, EncodeSettings, LOSSY_EXTENSIONS};
pub use loudnorm::{measure, LoudnessMeasurement, LoudnessTargets};
pub use probe::{probe_bitrate, probe_duration};
pub use progress::{fraction, ProgressEncoding, ProgressFn, ProgressReporter};
pub use tools::Toolchain;
