//! Unit-of-work description types.

use std::path::PathBuf;

use crate::config::AppConfig;
use crate::engine::{ChannelLayout, LoudnessTargets};

/// Parameters shared by every file of a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeSettings {
    pub targets: LoudnessTargets,
    /// Explicit bitrate such as `"192k"`; `None` lets the encode policy decide.
    pub bitrate: Option<String>,
    /// `None` keeps the source channel count.
    pub channels: Option<ChannelLayout>,
}

impl NormalizeSettings {
    /// Settings seeded from the configured default targets.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            targets: config.loudness.into(),
            bitrate: None,
            channels: None,
        }
    }
}

/// One input → one output normalization.
///
/// `output` is the candidate path; the file actually written is the first
/// free name derived from it, so an existing file is never overwritten.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub targets: LoudnessTargets,
    pub bitrate: Option<String>,
    pub channels: Option<ChannelLayout>,
}

impl NormalizationRequest {
    pub fn new(input: PathBuf, output: PathBuf, settings: &NormalizeSettings) -> Self {
        Self {
            input,
            output,
            targets: settings.targets,
            bitrate: settings.bitrate.clone(),
            channels: settings.channels,
        }
    }
}
