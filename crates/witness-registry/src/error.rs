//! Registry client error types.

use witness_core::RegistryId;

/// Errors from registry operations, classified by what they mean for the
/// caller's next step.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The ledger definitively refused the submission. Not retried.
    #[error("submission rejected: {reason}")]
    SubmissionRejected { reason: String },

    /// The outcome of a submission is unknown: it may or may not have
    /// landed. `tx_hash` is set when the gateway accepted the submission
    /// before confirmation stalled.
    #[error("submission timed out before confirmation{}: {detail}", .tx_hash.as_deref().map(|h| format!(" (tx {h})")).unwrap_or_default())]
    SubmissionTimedOut {
        tx_hash: Option<String>,
        detail: String,
    },

    /// A record carrying the same submission token is already committed.
    #[error("a record with this submission token already exists as {existing}")]
    DuplicateSubmission { existing: RegistryId },

    /// No record exists under this id.
    #[error("report {0} not found")]
    NotFound(RegistryId),

    /// The id was refused by the registry as malformed.
    #[error("invalid report id: {0}")]
    InvalidId(String),

    /// The registry could not be reached. For submissions this is only used
    /// when the request provably never left this process.
    #[error("registry unavailable: {reason}")]
    Unavailable { reason: String },

    /// The registry answered with something this client cannot interpret.
    #[error("unexpected registry response from {endpoint}: {detail}")]
    Protocol { endpoint: String, detail: String },
}

impl RegistryError {
    /// Build an [`RegistryError::Unavailable`] from any displayable cause.
    pub fn unavailable(reason: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            reason: reason.to_string(),
        }
    }

    /// Whether the submission outcome is unknown.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::SubmissionTimedOut { .. })
    }

    /// Whether a read may succeed if repeated.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
