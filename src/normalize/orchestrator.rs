//! Dual-pass unit of work: measure, pick a safe output path, correct.
//!
//! # Flow
//!
//! ```text
//! input exists? ──no──▶ InputNotFound
//!      │
//!      ├─ probe_duration ─┐  (concurrently)
//!      └─ measure ────────┤
//!                         ▼
//! avoid_overwrite_path + create parent dirs
//!                         ▼
//! [lossy, no bitrate] probe_bitrate
//!                         ▼
//! run_correction ──▶ on_progress(..., 1.0) ──▶ Ok(output)
//! ```
//!
//! The measurement lives only for the duration of one call; a retry runs
//! both passes again.

use std::path::{Path, PathBuf};

use crate::engine::{
    measure, probe_bitrate, probe_duration, run_correction, CorrectionPass, EncodeSettings,
    ProgressFn, Toolchain,
};

use super::paths::{avoid_overwrite_path, ensure_parent_dir};
use super::request::NormalizationRequest;
use super::NormalizeError;

/// Runs normalization units against a resolved [`Toolchain`].
#[derive(Debug, Clone)]
pub struct Normalizer {
    tools: Toolchain,
}

impl Normalizer {
    pub fn new(tools: Toolchain) -> Self {
        Self { tools }
    }

    pub fn tools(&self) -> &Toolchain {
        &self.tools
    }

    /// Normalize one file and return the path actually written.
    ///
    /// `on_progress` receives second-pass fractions and always a final
    /// `1.0` once the second pass has been attempted.
    pub async fn normalize(
        &self,
        request: &NormalizationRequest,
        on_progress: ProgressFn<'_>,
    ) -> Result<PathBuf, NormalizeError> {
        let input = request.input.as_path();
        if !input.exists() {
            return Err(NormalizeError::InputNotFound(request.input.clone()));
        }

        log::info!("normalize: measuring {}", input.display());
        let (duration, measurement) = tokio::join!(
            probe_duration(&self.tools, input),
            measure(&self.tools, input, &request.targets),
        );
        let measurement = measurement?;
        match duration {
            Some(secs) => log::debug!("normalize: duration {secs:.2}s"),
            None => log::debug!("normalize: duration unknown, progress is indeterminate"),
        }

        let output = avoid_overwrite_path(&request.output)?;
        if output != request.output {
            log::info!(
                "normalize: {} exists, writing {} instead",
                request.output.display(),
                output.display()
            );
        }
        ensure_parent_dir(&output)?;

        let encode = self.encode_settings(request, &output).await;

        log::info!("normalize: applying correction -> {}", output.display());
        let pass = CorrectionPass {
            input,
            output: &output,
            targets: &request.targets,
            measurement: &measurement,
            encode: &encode,
        };
        run_correction(&self.tools, &pass, duration, on_progress).await?;

        Ok(output)
    }

    async fn encode_settings(&self, request: &NormalizationRequest, output: &Path) -> EncodeSettings {
        let explicit = request.bitrate.as_deref();
        let probed = if EncodeSettings::wants_probed_bitrate(output, explicit) {
            probe_bitrate(&self.tools, &request.input).await
        } else {
            None
        };
        EncodeSettings::resolve(output, explicit, probed, request.channels)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
