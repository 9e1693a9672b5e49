//! Dual-pass loudness normalization driven by FFmpeg's `loudnorm` filter.
//!
//! * [`engine`]: ffmpeg / ffprobe plumbing: probes, measurement, correction
//!   pass and progress parsing.
//! * [`normalize`]: unit of work, output naming, batch runner and errors.
//! * [`cli`] / [`app`] + [`session`]: the two front ends.
//! * [`config`]: persisted settings.

pub mod app;
pub mod cli;
pub mod config;
pub mod engine;
pub mod normalize;
pub mod session;
