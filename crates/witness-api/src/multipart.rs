//! Multipart decoding of report submissions.
//!
//! Text parts map onto [`SubmissionFields`]; file parts are streamed chunk
//! by chunk into staged uploads. Both the public field names and the
//! canonical camelCase names are accepted. Unknown parts are skipped and
//! the first occurrence of a duplicated part wins.

use axum::extract::multipart::{Field, Multipart, MultipartError};
use axum::http::StatusCode;
use witness_core::SubmissionFields;
use witness_intake::{StagedUpload, StagingArea, SubmitReport};

use crate::error::AppError;

enum Part {
    Text(fn(&mut SubmissionFields) -> &mut Option<String>),
    Document,
    Identity,
}

fn classify(name: &str) -> Option<Part> {
    let part = match name {
        "category" => Part::Text(|f| &mut f.category),
        "subcategory" => Part::Text(|f| &mut f.subcategory),
        "date" | "occurredDate" => Part::Text(|f| &mut f.occurred_date),
        "time" | "occurredTime" => Part::Text(|f| &mut f.occurred_time),
        "name" | "reporterName" => Part::Text(|f| &mut f.reporter_name),
        "nearestPoliceStation" | "nearestFacility" => Part::Text(|f| &mut f.nearest_facility),
        "userAddress" | "address" | "reporterAddress" => Part::Text(|f| &mut f.reporter_address),
        "document" => Part::Document,
        "userId" | "identityDocument" => Part::Identity,
        _ => return None,
    };
    Some(part)
}

/// Decode a multipart submission, staging file parts as they arrive.
///
/// On error every upload staged so far is released.
pub async fn decode_submission(
    mut multipart: Multipart,
    staging: &StagingArea,
) -> Result<SubmitReport, AppError> {
    let mut report = SubmitReport::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(part) = field.name().and_then(classify) else {
            tracing::debug!(name = ?field.name(), "skipping unknown multipart part");
            continue;
        };

        match part {
            Part::Text(slot) => {
                let value = field.text().await.map_err(multipart_error)?;
                let slot = slot(&mut report.fields);
                if slot.is_none() {
                    *slot = Some(value);
                }
            }
            Part::Document if report.document.is_none() => {
                report.document = Some(stage_field(field, staging).await?);
            }
            Part::Identity if report.identity.is_none() => {
                report.identity = Some(stage_field(field, staging).await?);
            }
            Part::Document | Part::Identity => {
                tracing::debug!(name = ?field.name(), "ignoring duplicate file part");
            }
        }
    }
    Ok(report)
}

async fn stage_field(mut field: Field<'_>, staging: &StagingArea) -> Result<StagedUpload, AppError> {
    let mut upload = staging
        .create()
        .map_err(|e| AppError::Internal(format!("create staged upload: {e}")))?;
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        upload
            .write_chunk(&chunk)
            .await
            .map_err(|e| AppError::Internal(format!("write staged upload: {e}")))?;
    }
    upload
        .finish()
        .await
        .map_err(|e| AppError::Internal(format!("flush staged upload: {e}")))?;
    Ok(upload)
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(err.body_text())
    }
}
