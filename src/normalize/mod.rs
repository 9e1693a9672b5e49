//! Normalization workflow on top of the engine.
//!
//! ```text
//! BatchJob ──validate──▶ NormalizationRequest (one per input)
//!                               │
//!                               ▼
//!                    Normalizer::normalize
//!               measure → safe output path → correct
//!                               │
//!                               ▼
//!                BatchEvent stream ──▶ CLI printer / desktop form
//! ```

pub mod batch;
pub mod error;
pub mod orchestrator;
pub mod paths;
pub mod request;

pub use batch::{run_batch, BatchEvent, BatchJob, BatchSummary, FailurePolicy};
pub use error::NormalizeError;
pub use orchestrator::Normalizer;
pub use paths::{avoid_overwrite_path, default_file_name, default_output_path, ensure_parent_dir};
pub use request::{NormalizationRequest, NormalizeSettings};
