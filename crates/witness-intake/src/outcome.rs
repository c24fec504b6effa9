//! # Intake Outcomes
//!
//! Every submission ends in exactly one of three terminal states:
//!
//! - [`IntakeOutcome::Succeeded`]: the record is committed and both
//!   attachments are durably stored.
//! - [`IntakeOutcome::Failed`]: nothing was committed by this request.
//! - [`IntakeOutcome::Ambiguous`]: a commit was attempted and its result is
//!   unknown. The caller holds the submission token needed to find out.
//!
//! Each outcome reports the stage it ended in, whether content was stored,
//! whether a commit may have landed, and whether resubmitting is safe.

use serde::Serialize;
use witness_core::{ContentId, RegistryId, SubmissionToken, ValidationError};
use witness_registry::RegistryError;
use witness_store::StoreError;

/// Pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validating,
    Storing,
    Committing,
    CleaningUp,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Validating => "validating",
            Self::Storing => "storing",
            Self::Committing => "committing",
            Self::CleaningUp => "cleaning_up",
        })
    }
}

/// How a successful submission reached the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitDisposition {
    /// Committed by this request.
    Committed,
    /// The commit timed out but was found on the ledger afterwards.
    Recovered,
    /// An earlier request with the same token had already committed it.
    Replayed,
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub registry_id: RegistryId,
    pub document_content_id: ContentId,
    pub identity_content_id: ContentId,
    pub submission_token: SubmissionToken,
    pub disposition: CommitDisposition,
}

/// A commit whose outcome could not be determined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmbiguousCommit {
    pub submission_token: SubmissionToken,
    pub document_content_id: ContentId,
    pub identity_content_id: ContentId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    pub detail: String,
}

/// Errors that end a submission in [`IntakeOutcome::Failed`].
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    #[error("submission token {token} already identifies a different report ({existing})")]
    IdempotencyConflict {
        token: SubmissionToken,
        existing: RegistryId,
    },

    #[error("could not read staged {part}: {reason}")]
    Staging { part: &'static str, reason: String },

    #[error("storing {part} failed after {attempts} attempt(s): {source}")]
    StorageFailure {
        part: &'static str,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error("registry rejected the submission: {reason}")]
    SubmissionRejected { reason: String },

    #[error("registry unavailable: {reason}")]
    RegistryUnavailable { reason: String },
}

impl IntakeError {
    /// Whether the same request may succeed if resubmitted, without risk of
    /// a duplicate record.
    pub fn retry_safe(&self) -> bool {
        match self {
            Self::InvalidRequest(_) | Self::IdempotencyConflict { .. } => false,
            Self::SubmissionRejected { .. } => false,
            Self::Staging { .. } | Self::RegistryUnavailable { .. } => true,
            Self::StorageFailure { source, .. } => source.is_transient(),
        }
    }
}

impl From<RegistryError> for IntakeError {
    /// Map a definite registry failure. Ambiguous errors are never passed
    /// through here.
    fn from(err: RegistryError) -> Self {
        debug_assert!(!err.is_ambiguous(), "ambiguous registry error mapped as definite: {err}");
        match err {
            RegistryError::SubmissionRejected { reason } => Self::SubmissionRejected { reason },
            other => Self::RegistryUnavailable {
                reason: other.to_string(),
            },
        }
    }
}

/// A definite failure with its context.
#[derive(Debug)]
pub struct IntakeFailure {
    pub stage: Stage,
    /// Both attachments were durably stored before the failure.
    pub content_stored: bool,
    /// A record carrying this request's token may exist on the ledger.
    pub may_have_landed: bool,
    /// Token of the failed request, once one was assigned.
    pub submission_token: Option<SubmissionToken>,
    pub error: IntakeError,
}

/// Terminal state of one submission.
#[derive(Debug)]
pub enum IntakeOutcome {
    Succeeded(SubmissionReceipt),
    Failed(IntakeFailure),
    Ambiguous(AmbiguousCommit),
}

impl IntakeOutcome {
    /// Stage the request ended in. `None` for success.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Succeeded(_) => None,
            Self::Failed(failure) => Some(failure.stage),
            Self::Ambiguous(_) => Some(Stage::Committing),
        }
    }

    pub fn content_stored(&self) -> bool {
        match self {
            Self::Succeeded(_) | Self::Ambiguous(_) => true,
            Self::Failed(failure) => failure.content_stored,
        }
    }

    pub fn may_have_landed(&self) -> bool {
        match self {
            Self::Succeeded(_) | Self::Ambiguous(_) => true,
            Self::Failed(failure) => failure.may_have_landed,
        }
    }

    /// Whether resubmitting cannot create a duplicate record. An ambiguous
    /// commit is only safe to resubmit with the same submission token.
    pub fn retry_safe(&self) -> bool {
        match self {
            Self::Succeeded(_) => false,
            Self::Failed(failure) => failure.error.retry_safe(),
            Self::Ambiguous(_) => true,
        }
    }

    /// Short label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Succeeded(_) => "succeeded",
            Self::Failed(_) => "failed",
            Self::Ambiguous(_) => "ambiguous",
        }
    }
}
