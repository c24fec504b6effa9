//! # Error Types
//!
//! Validation failures for caller-supplied input and wire-format
//! identifiers. All errors use `thiserror` for derive-based `Display`.

use thiserror::Error;

/// Rejection of caller input before any side effect has happened.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// One or more required metadata fields or attachments are absent or
    /// blank. Every offending name is listed.
    #[error("required fields missing or empty: {}", .0.join(", "))]
    EmptyFields(Vec<&'static str>),

    /// A content identifier string is not `sha256:<64 hex>`.
    #[error("invalid content id {value:?}: {reason}")]
    InvalidContentId {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A registry identifier string is not an unsigned integer.
    #[error("invalid registry id {0:?}")]
    InvalidRegistryId(String),

    /// A submission token is empty, too long, or has forbidden characters.
    #[error("invalid submission token {value:?}: {reason}")]
    InvalidToken {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}
