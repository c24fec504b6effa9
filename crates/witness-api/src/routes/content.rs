//! GET `/v1/content/{contentId}`: serve a stored attachment.
//!
//! Bytes are re-verified against their id by the store; a blob that fails
//! the check is never served.

use std::str::FromStr;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use witness_core::ContentId;
use witness_store::ContentStore as _;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/content/{content_id}", get(get_content))
}

async fn get_content(
    State(state): State<AppState>,
    Path(content_id): Path<String>,
) -> Result<Response, AppError> {
    let id = ContentId::from_str(&content_id)?;
    match state.pipeline.store().get(&id).await? {
        Some(bytes) => Ok((
            [
                (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                (header::ETAG, format!("\"{id}\"")),
            ],
            bytes,
        )
            .into_response()),
        None => Err(AppError::NotFound(format!("content {id} not found"))),
    }
}
