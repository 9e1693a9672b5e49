//! Command-line surface and run-mode selection.

use std::path::PathBuf;

use clap::Parser;

use crate::config::AppConfig;
use crate::engine::{ChannelLayout, LoudnessTargets};
use crate::normalize::{BatchJob, NormalizeError, NormalizeSettings};

/// Command-line arguments for lufs-normalizer
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "lufs-normalizer")]
#[command(about = "Dual-pass FFmpeg loudnorm normalizer (defaults to -14 LUFS)")]
#[command(version)]
pub struct Cli {
    /// Input audio files; none opens the desktop form
    pub inputs: Vec<PathBuf>,

    /// Output file (only with a single input)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Audio bitrate for the output, e.g. 192k
    #[arg(long, value_name = "RATE")]
    pub bitrate: Option<String>,

    /// Integrated loudness target (LUFS)
    #[arg(long = "I", value_name = "LUFS", allow_negative_numbers = true)]
    pub integrated: Option<f64>,

    /// True-peak ceiling (dBTP)
    #[arg(long = "TP", value_name = "DBTP", allow_negative_numbers = true)]
    pub true_peak: Option<f64>,

    /// Loudness range target
    #[arg(long = "LRA", value_name = "LU", allow_negative_numbers = true)]
    pub range: Option<f64>,

    /// Force the output channel layout
    #[arg(long, value_enum)]
    pub channels: Option<ChannelLayout>,

    /// Never open the desktop form
    #[arg(long)]
    pub no_gui: bool,

    /// Alternative settings file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// What `main` should do after parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum RunMode {
    /// Open the desktop form with these field values.
    Gui { prefill: NormalizeSettings },
    Batch(BatchJob),
}

impl Cli {
    /// Config defaults overridden by the flags given.
    pub fn settings(&self, config: &AppConfig) -> NormalizeSettings {
        let defaults = LoudnessTargets::from(config.loudness);
        NormalizeSettings {
            targets: LoudnessTargets {
                i: self.integrated.unwrap_or(defaults.i),
                tp: self.true_peak.unwrap_or(defaults.tp),
                lra: self.range.unwrap_or(defaults.lra),
            },
            bitrate: self.bitrate.clone().filter(|b| !b.trim().is_empty()),
            channels: self.channels,
        }
    }

    /// Pick the run mode. Batch jobs are validated here, before any tool
    /// lookup or process launch.
    pub fn plan(&self, config: &AppConfig) -> Result<RunMode, NormalizeError> {
        let settings = self.settings(config);
        if self.inputs.is_empty() && !self.no_gui {
            return Ok(RunMode::Gui { prefill: settings });
        }

        let job = BatchJob {
            inputs: self.inputs.clone(),
            explicit_output: self.output.clone(),
            settings,
            naming: config.output.clone(),
        };
        job.validate()?;
        Ok(RunMode::Batch(job))
    }
}
