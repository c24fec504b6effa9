//! # Registry Identifiers and Submission Tokens
//!
//! - [`RegistryId`] is assigned by the ledger at commit time. It is
//!   monotonically increasing and opaque to the intake pipeline. On the wire
//!   it travels as a decimal string because ledger ids are 256-bit integers
//!   on the contract side; JSON numbers are accepted on input.
//! - [`SubmissionToken`] is generated per logical request (or supplied by the
//!   caller as an idempotency key) and embedded in the committed record, so a
//!   commit whose outcome is unknown can be looked up afterwards.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::ValidationError;

/// Maximum length of a caller-supplied submission token.
pub const MAX_TOKEN_LEN: usize = 128;

/// Ledger-assigned identifier of a committed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistryId(pub u64);

impl RegistryId {
    /// The numeric value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RegistryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RegistryId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidRegistryId(s.to_string()));
        }
        trimmed
            .parse::<u64>()
            .map(Self)
            .map_err(|_| ValidationError::InvalidRegistryId(s.to_string()))
    }
}

impl Serialize for RegistryId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RegistryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Number(u64),
            Text(String),
        }

        match Wire::deserialize(deserializer)? {
            Wire::Number(n) => Ok(Self(n)),
            Wire::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Idempotency token embedded in every committed record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubmissionToken(String);

impl SubmissionToken {
    /// Generate a fresh random token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accept a caller-supplied idempotency key.
    ///
    /// Keys must be 1..=128 characters of `[A-Za-z0-9._:-]`, and not only
    /// dots.
    pub fn from_key(key: &str) -> Result<Self, ValidationError> {
        let key = key.trim();
        let invalid = |reason| ValidationError::InvalidToken {
            value: key.to_string(),
            reason,
        };
        if key.is_empty() {
            return Err(invalid("token must not be empty"));
        }
        if key.len() > MAX_TOKEN_LEN {
            return Err(invalid("token longer than 128 characters"));
        }
        if !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '-'))
        {
            return Err(invalid("token may only contain [A-Za-z0-9._:-]"));
        }
        // "." and ".." collapse as URL path segments.
        if key.chars().all(|c| c == '.') {
            return Err(invalid("token must not consist only of dots"));
        }
        Ok(Self(key.to_string()))
    }

    /// The token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubmissionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SubmissionToken {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_key(&value)
    }
}

impl From<SubmissionToken> for String {
    fn from(token: SubmissionToken) -> Self {
        token.0
    }
}
