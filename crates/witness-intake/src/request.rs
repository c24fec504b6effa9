//! Submission requests and their validated form.
//!
//! A [`SubmitReport`] is what the transport layer decodes. It only becomes a
//! [`ValidatedSubmission`] once every required field and both attachments
//! are present, so later stages never see incomplete input.

use witness_core::{ReportMetadata, SubmissionFields, SubmissionToken, ValidationError};

use crate::staging::StagedUpload;

/// Name of the supporting-document part in validation errors.
pub const DOCUMENT_PART: &str = "document";
/// Name of the identity-document part in validation errors.
pub const IDENTITY_PART: &str = "identityDocument";

/// A decoded but unvalidated submission.
#[derive(Debug, Default)]
pub struct SubmitReport {
    pub fields: SubmissionFields,
    pub document: Option<StagedUpload>,
    pub identity: Option<StagedUpload>,
    /// Caller-supplied idempotency key, used as the submission token.
    pub idempotency_key: Option<String>,
}

/// A submission that passed validation. Owns both staged attachments.
#[derive(Debug)]
pub struct ValidatedSubmission {
    pub metadata: ReportMetadata,
    pub document: StagedUpload,
    pub identity: StagedUpload,
    pub token: SubmissionToken,
    /// Whether `token` came from the caller rather than being generated.
    pub caller_supplied_token: bool,
}

impl SubmitReport {
    /// Check the request without side effects.
    ///
    /// Blank metadata fields and missing or empty attachments are reported
    /// together. Staged files of a rejected request are released before
    /// returning.
    pub fn validate(self) -> Result<ValidatedSubmission, ValidationError> {
        let (metadata, mut missing) = match self.fields.validate() {
            Ok(metadata) => (Some(metadata), Vec::new()),
            Err(ValidationError::EmptyFields(fields)) => (None, fields),
            Err(other) => return Err(other),
        };

        let document = take_non_empty(self.document);
        let identity = take_non_empty(self.identity);
        if document.is_none() {
            missing.push(DOCUMENT_PART);
        }
        if identity.is_none() {
            missing.push(IDENTITY_PART);
        }

        let (Some(metadata), Some(document), Some(identity)) = (metadata, document, identity)
        else {
            return Err(ValidationError::EmptyFields(missing));
        };

        let (token, caller_supplied_token) = match self.idempotency_key.as_deref() {
            Some(key) => (SubmissionToken::from_key(key)?, true),
            None => (SubmissionToken::generate(), false),
        };

        Ok(ValidatedSubmission {
            metadata,
            document,
            identity,
            token,
            caller_supplied_token,
        })
    }
}

fn take_non_empty(upload: Option<StagedUpload>) -> Option<StagedUpload> {
    match upload {
        Some(upload) if !upload.is_empty() => Some(upload),
        Some(empty) => {
            empty.release();
            None
        }
        None => None,
    }
}
