//! Fatal conditions of a normalization run and their process exit statuses.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that terminate a unit of work (and, in CLI mode, the run).
///
/// None of them are retried. Each maps to a distinct exit status via
/// [`NormalizeError::exit_code`].
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// A required engine binary could not be found.
    #[error("{tool} not found in PATH. Install ffmpeg first.")]
    ToolMissing { tool: String },

    /// An engine binary was found but the OS refused to start it.
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The first pass produced no usable loudnorm JSON block.
    #[error("failed to parse loudnorm JSON from the first pass: {reason}")]
    Measurement { reason: String, stderr_tail: String },

    /// The second pass exited unsuccessfully.
    #[error("ffmpeg second pass failed ({status})")]
    SecondPass { status: String, stderr_tail: String },

    #[error("input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("use --output only with a single input file")]
    OutputWithMultipleInputs,

    /// Every `-001` … `-999` candidate is taken.
    #[error("refusing to overwrite: exhausted suffixes -001..-999 for '{0}'")]
    DisambiguationExhausted(String),

    #[error("desktop form unavailable: {0}")]
    GuiUnavailable(String),

    #[error("no inputs provided; run without arguments to use the desktop form")]
    NoInputs,

    /// Command-line arguments could not be parsed.
    #[error("{0}")]
    Usage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NormalizeError {
    /// Process exit status for this condition (never `0`).
    pub fn exit_code(&self) -> i32 {
        match self {
            NormalizeError::ToolMissing { .. } | NormalizeError::Spawn { .. } => 1,
            NormalizeError::Measurement { .. } => 2,
            NormalizeError::SecondPass { .. } => 3,
            NormalizeError::InputNotFound(_) => 4,
            NormalizeError::OutputWithMultipleInputs | NormalizeError::Usage(_) => 5,
            NormalizeError::DisambiguationExhausted(_) => 6,
            NormalizeError::GuiUnavailable(_) => 7,
            NormalizeError::NoInputs => 8,
            NormalizeError::Io(_) => 9,
        }
    }

    /// Tail of the engine's diagnostic stream, when the error carries one.
    pub fn stderr_tail(&self) -> Option<&str> {
        match self {
            NormalizeError::Measurement { stderr_tail, .. }
            | NormalizeError::SecondPass { stderr_tail, .. } => {
                Some(stderr_tail.as_str()).filter(|t| !t.trim().is_empty())
            }
            _ => None,
        }
    }
}
