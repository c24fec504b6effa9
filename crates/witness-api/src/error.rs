//! # API Error Types
//!
//! [`AppError`] implements `IntoResponse`, mapping intake, registry and
//! store errors to status codes and a JSON body:
//!
//! ```json
//! {"error": {"code": "VALIDATION_ERROR", "message": "...", "details": {...}}}
//! ```
//!
//! Messages of 5xx errors are logged and replaced with a generic text.
//! Intake failures carry their stage and retry verdict in `details`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use witness_intake::{IntakeError, IntakeFailure};
use witness_registry::RegistryError;
use witness_store::StoreError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable code, e.g. `NOT_FOUND`.
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed request framing or identifier (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// Logged, never returned (500).
    #[error("internal error: {0}")]
    Internal(String),

    /// Ledger gateway answered nonsense (502).
    #[error("upstream registry error: {0}")]
    Upstream(String),

    /// A backend is unreachable (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// A submission that ended in failure, with its stage context.
    #[error("{}", .0.error)]
    Intake(IntakeFailure),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            Self::Intake(failure) => match &failure.error {
                IntakeError::InvalidRequest(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR")
                }
                IntakeError::IdempotencyConflict { .. } => {
                    (StatusCode::CONFLICT, "IDEMPOTENCY_CONFLICT")
                }
                IntakeError::SubmissionRejected { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "SUBMISSION_REJECTED")
                }
                IntakeError::StorageFailure { source, .. } if !source.is_transient() => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTEGRITY_ERROR")
                }
                IntakeError::StorageFailure { .. } => {
                    (StatusCode::SERVICE_UNAVAILABLE, "STORAGE_UNAVAILABLE")
                }
                IntakeError::RegistryUnavailable { .. } => {
                    (StatusCode::SERVICE_UNAVAILABLE, "REGISTRY_UNAVAILABLE")
                }
                IntakeError::Staging { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Intake(failure) => Some(json!({
                "stage": failure.stage,
                "contentStored": failure.content_stored,
                "mayHaveLanded": failure.may_have_landed,
                "retrySafe": failure.error.retry_safe(),
                "submissionToken": failure.submission_token,
            })),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if status.is_server_error() {
            match status {
                StatusCode::SERVICE_UNAVAILABLE => {
                    tracing::warn!(error = %self, "service unavailable");
                    "A required service is temporarily unavailable".to_string()
                }
                StatusCode::BAD_GATEWAY => {
                    tracing::error!(error = %self, "upstream registry error");
                    "An upstream service error occurred".to_string()
                }
                _ => {
                    tracing::error!(error = %self, "internal server error");
                    "An internal error occurred".to_string()
                }
            }
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<witness_core::ValidationError> for AppError {
    fn from(err: witness_core::ValidationError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

/// Read-path registry errors.
impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => Self::NotFound(format!("report {id} not found")),
            RegistryError::InvalidId(raw) => Self::BadRequest(format!("invalid report id {raw:?}")),
            RegistryError::Unavailable { .. } => Self::ServiceUnavailable(err.to_string()),
            RegistryError::Protocol { .. } => Self::Upstream(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable { .. } => Self::ServiceUnavailable(err.to_string()),
            StoreError::Corrupt { .. } => Self::Internal(err.to_string()),
        }
    }
}
