//! # Report Routes
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | POST | `/v1/reports` | [`submit_report`] |
//! | POST | `/upload-report` | [`submit_report`] |
//! | GET | `/v1/reports/{reportId}` | [`get_report`] |
//! | GET | `/get-report?reportId=` | [`get_report_legacy`] |
//! | GET | `/v1/reports/by-token/{token}` | [`find_by_token`] |

use std::str::FromStr;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use witness_core::{CommittedRecord, RegistryId, SubmissionToken};
use witness_intake::{AmbiguousCommit, CommitDisposition, IntakeOutcome, SubmissionReceipt};

use crate::error::AppError;
use crate::multipart::decode_submission;
use crate::state::AppState;

/// Header carrying a caller-chosen submission token.
pub const IDEMPOTENCY_KEY: &str = "idempotency-key";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/reports", post(submit_report))
        .route("/upload-report", post(submit_report))
        .route("/v1/reports/by-token/{token}", get(find_by_token))
        .route("/v1/reports/{report_id}", get(get_report))
        .route("/get-report", get(get_report_legacy))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub message: String,
    pub registry_id: RegistryId,
    pub document_hash: String,
    pub user_id_hash: String,
    pub submission_token: SubmissionToken,
    pub disposition: CommitDisposition,
}

impl From<SubmissionReceipt> for SubmitResponse {
    fn from(receipt: SubmissionReceipt) -> Self {
        let message = match receipt.disposition {
            CommitDisposition::Replayed => "Report was already stored on-chain",
            _ => "Report stored successfully on-chain",
        };
        Self {
            message: message.to_string(),
            registry_id: receipt.registry_id,
            document_hash: receipt.document_content_id.to_string(),
            user_id_hash: receipt.identity_content_id.to_string(),
            submission_token: receipt.submission_token,
            disposition: receipt.disposition,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmbiguousResponse {
    pub message: String,
    pub submission_token: SubmissionToken,
    pub document_hash: String,
    pub user_id_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

impl From<AmbiguousCommit> for AmbiguousResponse {
    fn from(ambiguous: AmbiguousCommit) -> Self {
        Self {
            message: "Report commit outcome is unknown; look it up by submission token or resubmit with the same Idempotency-Key".to_string(),
            submission_token: ambiguous.submission_token,
            document_hash: ambiguous.document_content_id.to_string(),
            user_id_hash: ambiguous.identity_content_id.to_string(),
            tx_hash: ambiguous.tx_hash,
        }
    }
}

/// A committed report in the public field naming.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub report_id: RegistryId,
    pub category: String,
    pub subcategory: String,
    pub date: String,
    pub time: String,
    pub name: String,
    pub nearest_police_station: String,
    pub address: String,
    pub document_hash: String,
    pub user_id_hash: String,
    pub submission_token: SubmissionToken,
    pub committed_at: DateTime<Utc>,
}

impl From<CommittedRecord> for ReportResponse {
    fn from(committed: CommittedRecord) -> Self {
        let record = committed.record;
        let m = record.metadata;
        Self {
            report_id: committed.registry_id,
            category: m.category,
            subcategory: m.subcategory,
            date: m.occurred_date,
            time: m.occurred_time,
            name: m.reporter_name,
            nearest_police_station: m.nearest_facility,
            address: m.reporter_address,
            document_hash: record.document_content_id.to_string(),
            user_id_hash: record.identity_content_id.to_string(),
            submission_token: record.submission_token,
            committed_at: committed.committed_at,
        }
    }
}

/// POST /v1/reports: accept a multipart report submission.
///
/// 201 when committed (or replayed), 202 when the commit outcome is
/// unknown, error statuses per [`AppError`] otherwise.
pub async fn submit_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let mut request = decode_submission(multipart, &state.staging).await?;
    request.idempotency_key = headers
        .get(IDEMPOTENCY_KEY)
        .map(|v| {
            v.to_str()
                .map(str::to_string)
                .map_err(|_| AppError::BadRequest("Idempotency-Key must be ASCII".into()))
        })
        .transpose()?;

    match state.pipeline.submit(request).await {
        IntakeOutcome::Succeeded(receipt) => {
            Ok((StatusCode::CREATED, Json(SubmitResponse::from(receipt))).into_response())
        }
        IntakeOutcome::Ambiguous(ambiguous) => {
            tracing::warn!(token = %ambiguous.submission_token, "returning ambiguous commit to caller");
            Ok((StatusCode::ACCEPTED, Json(AmbiguousResponse::from(ambiguous))).into_response())
        }
        IntakeOutcome::Failed(failure) => Err(AppError::Intake(failure)),
    }
}

/// GET /v1/reports/{reportId}
pub async fn get_report(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
) -> Result<Json<ReportResponse>, AppError> {
    let id = RegistryId::from_str(&report_id)?;
    let committed = state.pipeline.get_report(id).await?;
    Ok(Json(committed.into()))
}

#[derive(Debug, Deserialize)]
pub struct LegacyReportQuery {
    #[serde(rename = "reportId")]
    report_id: Option<String>,
}

/// GET /get-report?reportId=
pub async fn get_report_legacy(
    State(state): State<AppState>,
    Query(query): Query<LegacyReportQuery>,
) -> Result<Json<ReportResponse>, AppError> {
    let raw = query
        .report_id
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Report ID is required".into()))?;
    let id = RegistryId::from_str(&raw)?;
    let committed = state.pipeline.get_report(id).await?;
    Ok(Json(committed.into()))
}

/// GET /v1/reports/by-token/{token}
pub async fn find_by_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<ReportResponse>, AppError> {
    let token = SubmissionToken::from_key(&token)?;
    match state.pipeline.find_report(&token).await? {
        Some(committed) => Ok(Json(committed.into())),
        None => Err(AppError::NotFound(format!(
            "no report carries submission token {token}"
        ))),
    }
}
