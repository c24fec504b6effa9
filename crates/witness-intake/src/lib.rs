//! # witness-intake: Report Intake Pipeline
//!
//! Turns an inbound submission (seven metadata fields plus two staged
//! attachments) into a committed registry record, or into a failure or
//! ambiguous outcome the caller can act on.
//!
//! - [`staging`]: per-request temp files that are always cleaned up.
//! - [`request`]: [`SubmitReport`] and its validated form.
//! - [`pipeline`]: [`IntakePipeline`], the stage machine.
//! - [`outcome`]: terminal states and the error taxonomy.
//! - [`config`]: timeouts and retry policies.

pub mod config;
pub mod outcome;
pub mod pipeline;
pub mod request;
pub mod staging;
pub mod telemetry;

pub use config::{ConfigError, PipelineConfig, RetryPolicy};
pub use outcome::{
    AmbiguousCommit, CommitDisposition, IntakeError, IntakeFailure, IntakeOutcome, Stage,
    SubmissionReceipt,
};
pub use pipeline::IntakePipeline;
pub use request::{SubmitReport, ValidatedSubmission};
pub use staging::{StagedUpload, StagingArea};
