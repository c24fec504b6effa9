//! # Report Records
//!
//! - [`SubmissionFields`]: raw caller input, every field optional.
//! - [`ReportMetadata`]: the seven validated metadata fields.
//! - [`Record`]: metadata plus both attachment content ids and the
//!   submission token; the unit committed to the ledger.
//! - [`CommittedRecord`]: a record as stored by the ledger, with its
//!   registry id and commit time.
//!
//! ## Record Invariant
//!
//! A `Record` references content that has already been confirmed written.
//! This crate cannot enforce that on its own; the intake pipeline only
//! builds records from stored-attachment receipts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::ContentId;
use crate::error::ValidationError;
use crate::identity::{RegistryId, SubmissionToken};

/// Unvalidated metadata as decoded from a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionFields {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub occurred_date: Option<String>,
    pub occurred_time: Option<String>,
    pub reporter_name: Option<String>,
    pub nearest_facility: Option<String>,
    pub reporter_address: Option<String>,
}

impl SubmissionFields {
    /// Check that every required field is present and non-blank.
    ///
    /// All offending fields are reported at once rather than the first one.
    pub fn validate(self) -> Result<ReportMetadata, ValidationError> {
        let mut missing = Vec::new();
        let mut take = |name: &'static str, value: Option<String>| -> String {
            match value {
                Some(v) if !v.trim().is_empty() => v,
                _ => {
                    missing.push(name);
                    String::new()
                }
            }
        };

        let metadata = ReportMetadata {
            category: take("category", self.category),
            subcategory: take("subcategory", self.subcategory),
            occurred_date: take("occurredDate", self.occurred_date),
            occurred_time: take("occurredTime", self.occurred_time),
            reporter_name: take("reporterName", self.reporter_name),
            nearest_facility: take("nearestFacility", self.nearest_facility),
            reporter_address: take("reporterAddress", self.reporter_address),
        };

        if missing.is_empty() {
            Ok(metadata)
        } else {
            Err(ValidationError::EmptyFields(missing))
        }
    }
}

/// Validated report metadata. Every field is non-blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub category: String,
    pub subcategory: String,
    pub occurred_date: String,
    pub occurred_time: String,
    pub reporter_name: String,
    pub nearest_facility: String,
    pub reporter_address: String,
}

/// The immutable unit of truth committed to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(flatten)]
    pub metadata: ReportMetadata,
    pub document_content_id: ContentId,
    pub identity_content_id: ContentId,
    pub submission_token: SubmissionToken,
}

impl Record {
    /// Assemble a record from validated metadata and stored content ids.
    pub fn new(
        metadata: ReportMetadata,
        document_content_id: ContentId,
        identity_content_id: ContentId,
        submission_token: SubmissionToken,
    ) -> Self {
        Self {
            metadata,
            document_content_id,
            identity_content_id,
            submission_token,
        }
    }

    /// Both content ids referenced by this record, document first.
    pub fn content_ids(&self) -> [ContentId; 2] {
        [self.document_content_id, self.identity_content_id]
    }
}

/// A record as held by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittedRecord {
    pub registry_id: RegistryId,
    pub record: Record,
    pub committed_at: DateTime<Utc>,
}
