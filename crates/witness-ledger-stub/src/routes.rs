//! Route definitions for the ledger gateway stub.
//!
//! Implements the endpoints `HttpRegistryClient` calls, with bodies taken
//! from `witness_registry::wire` so both sides share one schema.

use std::str::FromStr;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use witness_core::{RegistryId, SubmissionToken};
use witness_registry::wire::{GatewayError, SubmitAccepted, SubmitRequest};
use witness_registry::RegistryError;

use crate::store::LedgerState;

/// Build the complete gateway router.
pub fn router(state: LedgerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/reports", post(submit))
        .route("/v1/reports/by-token/{token}", get(find_by_token))
        .route("/v1/reports/{report_id}", get(get_report))
        .route("/v1/transactions/{tx_hash}", get(transaction))
        .fallback(not_implemented)
        .with_state(state)
}

fn gateway_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(GatewayError {
            error: message.into(),
        }),
    )
        .into_response()
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn submit(State(state): State<LedgerState>, Json(body): Json<SubmitRequest>) -> Response {
    match state.submit(&body.record) {
        Ok(tx_hash) => {
            tracing::info!(%tx_hash, token = %body.record.submission_token, "transaction accepted");
            (StatusCode::ACCEPTED, Json(SubmitAccepted { tx_hash })).into_response()
        }
        Err(RegistryError::DuplicateSubmission { existing }) => {
            tracing::info!(report_id = %existing, "duplicate submission token");
            (StatusCode::CONFLICT, Json(state.report_ref(existing))).into_response()
        }
        Err(e) => gateway_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    }
}

async fn transaction(State(state): State<LedgerState>, Path(tx_hash): Path<String>) -> Response {
    match state.status(&tx_hash) {
        Some(status) => Json(status).into_response(),
        None => gateway_error(
            StatusCode::NOT_FOUND,
            format!("unknown transaction {tx_hash}"),
        ),
    }
}

async fn get_report(State(state): State<LedgerState>, Path(report_id): Path<String>) -> Response {
    let id = match RegistryId::from_str(&report_id) {
        Ok(id) => id,
        Err(e) => return gateway_error(StatusCode::BAD_REQUEST, e.to_string()),
    };
    match state.ledger().get(id) {
        Some(committed) => Json(committed).into_response(),
        None => gateway_error(StatusCode::NOT_FOUND, format!("report {id} not found")),
    }
}

async fn find_by_token(State(state): State<LedgerState>, Path(token): Path<String>) -> Response {
    let token = match SubmissionToken::from_key(&token) {
        Ok(token) => token,
        Err(e) => return gateway_error(StatusCode::BAD_REQUEST, e.to_string()),
    };
    match state.ledger().lookup_token(&token) {
        Some(report_id) => Json(state.report_ref(report_id)).into_response(),
        None => gateway_error(StatusCode::NOT_FOUND, format!("no report for token {token}")),
    }
}

async fn not_implemented() -> Response {
    gateway_error(StatusCode::NOT_IMPLEMENTED, "not implemented by ledger stub")
}
