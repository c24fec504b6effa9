//! # Content Identifiers
//!
//! A [`ContentId`] is the SHA-256 digest of an attachment's raw bytes,
//! rendered as `sha256:<64 lowercase hex>`. Identical bytes always yield the
//! identical id, which is what makes content-store writes idempotent and
//! safe to retry.
//!
//! ## Integrity Invariant
//!
//! [`ContentId::matches`] recomputes the digest of candidate bytes and
//! compares in constant time. Stores call it on every read so that corrupt
//! or substituted content is never served under a valid id.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::ValidationError;

/// Algorithm tag carried in the string form of every content id.
pub const CONTENT_ID_PREFIX: &str = "sha256:";

/// Content-addressed identifier of an attachment.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentId([u8; 32]);

impl ContentId {
    /// Compute the content id of `bytes`.
    pub fn digest(bytes: &[u8]) -> Self {
        let hash = Sha256::digest(bytes);
        let mut out = [0u8; 32];
        out.copy_from_slice(&hash);
        Self(out)
    }

    /// Wrap a raw 32-byte digest.
    pub fn from_digest(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering of the digest, without the algorithm prefix.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse the bare 64-character hex form (no prefix).
    pub fn from_hex(hex: &str) -> Result<Self, ValidationError> {
        let invalid = |reason| ValidationError::InvalidContentId {
            value: hex.to_string(),
            reason,
        };
        let hex = hex.trim();
        if hex.len() != 64 {
            return Err(invalid("digest must be 64 hex chars"));
        }
        let mut out = [0u8; 32];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk).map_err(|_| invalid("non-ascii digest"))?;
            out[i] = u8::from_str_radix(pair, 16).map_err(|_| invalid("non-hex characters"))?;
        }
        Ok(Self(out))
    }

    /// Whether `bytes` hash to this id. Constant-time on the digest compare.
    pub fn matches(&self, bytes: &[u8]) -> bool {
        let actual = Self::digest(bytes);
        bool::from(actual.0.ct_eq(&self.0))
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CONTENT_ID_PREFIX}{}", self.to_hex())
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({self})")
    }
}

impl FromStr for ContentId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex = trimmed
            .get(..CONTENT_ID_PREFIX.len())
            .filter(|p| p.eq_ignore_ascii_case(CONTENT_ID_PREFIX))
            .map(|_| &trimmed[CONTENT_ID_PREFIX.len()..])
            .ok_or_else(|| ValidationError::InvalidContentId {
                value: s.to_string(),
                reason: "missing sha256: prefix",
            })?;
        Self::from_hex(hex).map_err(|_| ValidationError::InvalidContentId {
            value: s.to_string(),
            reason: "digest must be 64 hex chars",
        })
    }
}

impl TryFrom<String> for ContentId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContentId> for String {
    fn from(id: ContentId) -> Self {
        id.to_string()
    }
}
