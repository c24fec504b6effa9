//! Retry with exponential backoff for idempotent gateway reads.
//!
//! Only reads go through here. Submissions are never replayed blindly: a
//! resent submission could land twice.

use std::time::Duration;

use reqwest::StatusCode;

/// Retry attempts after the initial request.
const MAX_RETRIES: u32 = 3;

/// Base delay between retries, doubled each attempt.
const BASE_DELAY_MS: u64 = 200;

/// Send a read request, retrying transport failures and gateway-side
/// 502/503/504 answers with 200ms, 400ms, 800ms backoff.
///
/// Whatever the final attempt yields is returned to the caller for status
/// inspection.
pub(crate) async fn retry_read<F, Fut>(
    endpoint: &str,
    f: F,
) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    for attempt in 0..MAX_RETRIES {
        let failure = match f().await {
            Ok(resp) if !is_retryable_status(resp.status()) => return Ok(resp),
            Ok(resp) => format!("gateway answered {}", resp.status()),
            Err(e) => e.to_string(),
        };
        let delay = Duration::from_millis(BASE_DELAY_MS * 2u64.pow(attempt));
        tracing::warn!(
            endpoint,
            attempt = attempt + 1,
            max_retries = MAX_RETRIES,
            "registry read failed, retrying in {delay:?}: {failure}"
        );
        tokio::time::sleep(delay).await;
    }
    f().await
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}
