//! Content store error types.

use witness_core::ContentId;

/// Errors from content store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not complete the call. Retrying may succeed.
    #[error("content store unavailable: {reason}")]
    Unavailable { reason: String },

    /// Stored bytes no longer hash to their id. Never retried, never served.
    #[error("integrity violation: content {expected} hashes to {actual}")]
    Corrupt {
        expected: ContentId,
        actual: ContentId,
    },
}

impl StoreError {
    /// Build an [`StoreError::Unavailable`] from any displayable cause.
    pub fn unavailable(reason: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            reason: reason.to_string(),
        }
    }

    /// Whether the caller may retry the same call.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::unavailable(format!("io: {err}"))
    }
}
