//! Desktop form state, kept apart from the egui drawing code.
//!
//! [`Session`] owns everything the user edits (selected files, last used
//! directory, output field, parameter fields) plus what the worker reports
//! back (per-file progress, log lines, running flag). The worker never sees
//! the session; it receives a [`BatchJob`] snapshot built by
//! [`Session::build_job`] and answers with [`UiMessage`]s.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::{AppPaths, OutputConfig};
use crate::engine::{ChannelLayout, LoudnessTargets};
use crate::normalize::{default_file_name, BatchEvent, BatchJob, NormalizeSettings};

/// Text shown in the disabled output field when several files are selected.
pub const OUTPUT_PLACEHOLDER: &str = "(outputs next to inputs)";

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Everything delivered to the UI thread over its channel.
#[derive(Debug, Clone, PartialEq)]
pub enum UiMessage {
    Batch(BatchEvent),
    /// Result of the bitrate prefill probe for a single selected file.
    BitrateProbed(Option<String>),
    /// The worker stopped without finishing the batch.
    WorkerFailed(String),
}

/// Why Run was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Please add one or more input audio files.")]
    NoFiles,
    #[error("I/TP/LRA must be numbers.")]
    InvalidNumber,
}

// ---------------------------------------------------------------------------
// FileProgress
// ---------------------------------------------------------------------------

/// Progress bar state for the file currently being processed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileProgress {
    Idle,
    /// Running, no fraction received yet.
    Indeterminate,
    Fraction(f32),
}

impl FileProgress {
    pub fn label(self) -> String {
        match self {
            FileProgress::Idle => "0%".into(),
            FileProgress::Indeterminate => "Processing...".into(),
            FileProgress::Fraction(f) => format!("{}%", (f * 100.0).clamp(0.0, 100.0) as u32),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Session {
    pub selected_files: Vec<PathBuf>,
    pub last_dir: PathBuf,
    pub output: String,
    pub integrated: String,
    pub true_peak: String,
    pub range: String,
    pub bitrate: String,
    /// `None` keeps the source layout.
    pub channels: Option<ChannelLayout>,
    pub progress: FileProgress,
    pub running: bool,
    log: Vec<String>,
}

impl Session {
    /// Fresh form prefilled from `prefill` (config defaults or CLI flags).
    pub fn new(prefill: &NormalizeSettings, last_dir: Option<PathBuf>) -> Self {
        let targets = prefill.targets;
        Self {
            selected_files: Vec::new(),
            last_dir: last_dir.unwrap_or_else(AppPaths::default_browse_dir),
            output: OUTPUT_PLACEHOLDER.into(),
            integrated: targets.i.to_string(),
            true_peak: targets.tp.to_string(),
            range: targets.lra.to_string(),
            bitrate: prefill.bitrate.clone().unwrap_or_default(),
            channels: prefill.channels,
            progress: FileProgress::Idle,
            running: false,
            log: Vec::new(),
        }
    }

    // ── File selection ───────────────────────────────────────────────────

    /// Append newly picked files, skipping duplicates.
    ///
    /// Returns the file whose bitrate should be probed when exactly one file
    /// was picked.
    pub fn add_files(&mut self, picked: Vec<PathBuf>) -> Option<PathBuf> {
        if let Some(dir) = picked.first().and_then(|p| p.parent()) {
            if !dir.as_os_str().is_empty() {
                self.last_dir = dir.to_path_buf();
            }
        }
        let probe = match picked.as_slice() {
            [single] => Some(single.clone()),
            _ => None,
        };
        for path in picked {
            if !self.selected_files.contains(&path) {
                self.selected_files.push(path);
            }
        }
        self.refresh_output();
        probe
    }

    pub fn clear_files(&mut self) {
        self.selected_files.clear();
        self.refresh_output();
    }

    /// The output field is only editable with exactly one input.
    pub fn output_enabled(&self) -> bool {
        self.selected_files.len() == 1
    }

    fn refresh_output(&mut self) {
        if !self.output_enabled() {
            self.output = OUTPUT_PLACEHOLDER.into();
        } else if self.output == OUTPUT_PLACEHOLDER {
            self.output.clear();
        }
    }

    /// Name proposed by the save dialog for the single selected file.
    pub fn suggested_output_name(&self, naming: &OutputConfig) -> Option<String> {
        match self.selected_files.as_slice() {
            [single] => Some(default_file_name(single, naming)),
            _ => None,
        }
    }

    /// Accept a path chosen in the save dialog.
    pub fn set_output(&mut self, path: &Path) {
        self.output = path.display().to_string();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            self.last_dir = dir.to_path_buf();
        }
    }

    // ── Run ──────────────────────────────────────────────────────────────

    /// Validate the form and snapshot it into a job for the worker.
    pub fn build_job(&self, naming: &OutputConfig) -> Result<BatchJob, FormError> {
        if self.selected_files.is_empty() {
            return Err(FormError::NoFiles);
        }
        let number = |field: &str| field.trim().parse::<f64>().map_err(|_| FormError::InvalidNumber);
        let targets = LoudnessTargets {
            i: number(&self.integrated)?,
            tp: number(&self.true_peak)?,
            lra: number(&self.range)?,
        };

        let bitrate = Some(self.bitrate.trim())
            .filter(|b| !b.is_empty())
            .map(str::to_string);
        let explicit_output = if self.output_enabled() {
            Some(self.output.trim())
                .filter(|o| !o.is_empty() && !o.starts_with("(outputs "))
                .map(PathBuf::from)
        } else {
            None
        };

        Ok(BatchJob {
            inputs: self.selected_files.clone(),
            explicit_output,
            settings: NormalizeSettings {
                targets,
                bitrate,
                channels: self.channels,
            },
            naming: naming.clone(),
        })
    }

    pub fn start_run(&mut self) {
        self.running = true;
        self.progress = FileProgress::Idle;
    }

    // ── Worker messages ──────────────────────────────────────────────────

    pub fn apply(&mut self, message: UiMessage) {
        match message {
            UiMessage::Batch(event) => self.apply_event(event),
            UiMessage::BitrateProbed(Some(bitrate)) => self.bitrate = bitrate,
            UiMessage::BitrateProbed(None) => {}
            UiMessage::WorkerFailed(message) => {
                self.push_log(format!("Error: {message}"));
                self.running = false;
                self.progress = FileProgress::Idle;
            }
        }
    }

    fn apply_event(&mut self, event: BatchEvent) {
        match event {
            BatchEvent::UnitStarted { input, .. } => {
                self.push_log(format!("Processing: {}", input.display()));
                self.progress = FileProgress::Indeterminate;
            }
            BatchEvent::Progress { fraction, .. } => {
                self.progress = FileProgress::Fraction(fraction as f32);
            }
            BatchEvent::UnitFinished { output, .. } => {
                self.push_log(format!("Done: {}", output.display()));
            }
            BatchEvent::UnitFailed { input, message, .. } => {
                self.push_log(format!("Error processing {}: {message}", input.display()));
            }
            BatchEvent::BatchFinished(summary) => {
                if !summary.failed.is_empty() {
                    self.push_log(format!(
                        "Finished: {} ok, {} failed",
                        summary.succeeded.len(),
                        summary.failed.len()
                    ));
                }
                self.running = false;
            }
        }
    }

    // ── Log pane ─────────────────────────────────────────────────────────

    pub fn push_log(&mut self, line: impl Into<String>) {
        self.log.push(line.into());
    }

    pub fn log_lines(&self) -> &[String] {
        &self.log
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
