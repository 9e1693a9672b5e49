//! Sequential batch over several inputs.
//!
//! Units run one after another on the caller's task. Every state change is
//! reported through an `emit` callback as a [`BatchEvent`]; the CLI prints
//! them, the desktop form forwards them over a channel to the UI thread.

use std::path::PathBuf;

use crate::config::OutputConfig;

use super::orchestrator::Normalizer;
use super::paths::default_output_path;
use super::request::{NormalizationRequest, NormalizeSettings};
use super::NormalizeError;

/// What to do when a unit fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop and return the first error (CLI).
    AbortOnError,
    /// Record the failure and move on to the next input (desktop form).
    ContinueOnError,
}

/// Inputs plus the parameters shared by all of them.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchJob {
    pub inputs: Vec<PathBuf>,
    /// Only valid with exactly one input.
    pub explicit_output: Option<PathBuf>,
    pub settings: NormalizeSettings,
    pub naming: OutputConfig,
}

impl BatchJob {
    /// Reject invalid input / output combinations before any process runs.
    pub fn validate(&self) -> Result<(), NormalizeError> {
        if self.inputs.is_empty() {
            return Err(NormalizeError::NoInputs);
        }
        if self.explicit_output.is_some() && self.inputs.len() != 1 {
            return Err(NormalizeError::OutputWithMultipleInputs);
        }
        Ok(())
    }

    /// One request per input, in order.
    pub fn requests(&self) -> Vec<NormalizationRequest> {
        self.inputs
            .iter()
            .map(|input| {
                let output =
                    default_output_path(input, self.explicit_output.as_deref(), &self.naming);
                NormalizationRequest::new(input.clone(), output, &self.settings)
            })
            .collect()
    }
}

/// Outcome of a whole batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    /// Output paths actually written.
    pub succeeded: Vec<PathBuf>,
    /// Failed inputs with their error message.
    pub failed: Vec<(PathBuf, String)>,
}

/// Progress and outcome notifications of a running batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    UnitStarted {
        index: usize,
        total: usize,
        input: PathBuf,
    },
    /// Second-pass fraction in `[0, 1]` for unit `index`.
    Progress { index: usize, fraction: f64 },
    UnitFinished {
        index: usize,
        input: PathBuf,
        output: PathBuf,
    },
    UnitFailed {
        index: usize,
        input: PathBuf,
        message: String,
        exit_code: i32,
    },
    BatchFinished(BatchSummary),
}

/// Normalize every input of `job` in order.
///
/// With [`FailurePolicy::AbortOnError`] the first failing unit ends the
/// batch and its error is returned (after a `UnitFailed` event). With
/// [`FailurePolicy::ContinueOnError`] failures are collected in the summary
/// and the result is `Ok` unless the job itself is invalid.
pub async fn run_batch(
    normalizer: &Normalizer,
    job: &BatchJob,
    policy: FailurePolicy,
    mut emit: impl FnMut(BatchEvent) + Send,
) -> Result<BatchSummary, NormalizeError> {
    job.validate()?;

    let requests = job.requests();
    let total = requests.len();
    let mut summary = BatchSummary::default();
    log::info!("batch: {total} file(s), policy {policy:?}");

    for (index, request) in requests.iter().enumerate() {
        emit(BatchEvent::UnitStarted {
            index,
            total,
            input: request.input.clone(),
        });

        let result = {
            let mut on_progress = |fraction: f64| emit(BatchEvent::Progress { index, fraction });
            normalizer.normalize(request, &mut on_progress).await
        };

        match result {
            Ok(output) => {
                log::info!(
                    "batch: [{}/{total}] {} -> {}",
                    index + 1,
                    request.input.display(),
                    output.display()
                );
                summary.succeeded.push(output.clone());
                emit(BatchEvent::UnitFinished {
                    index,
                    input: request.input.clone(),
                    output,
                });
            }
            Err(err) => {
                log::warn!(
                    "batch: [{}/{total}] {} failed: {err}",
                    index + 1,
                    request.input.display()
                );
                emit(BatchEvent::UnitFailed {
                    index,
                    input: request.input.clone(),
                    message: err.to_string(),
                    exit_code: err.exit_code(),
                });
                if policy == FailurePolicy::AbortOnError {
                    return Err(err);
                }
                summary.failed.push((request.input.clone(), err.to_string()));
            }
        }
    }

    emit(BatchEvent::BatchFinished(summary.clone()));
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
