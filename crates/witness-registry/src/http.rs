//! Typed client for the ledger gateway.
//!
//! The gateway fronts the on-chain report contract and owns signing. This
//! client submits records, polls the resulting transaction until it reaches
//! the configured confirmation depth, and reads records back.
//!
//! ## Submission outcomes
//!
//! | Gateway answer | Result |
//! |----------------|--------|
//! | connection refused / DNS failure | `Unavailable` (nothing was sent) |
//! | send timeout, reset mid-request | `SubmissionTimedOut { tx_hash: None }` |
//! | `202 {txHash}` then confirmed | `Ok(reportId)` |
//! | `202 {txHash}` then failed | `SubmissionRejected` |
//! | `202 {txHash}` then deadline | `SubmissionTimedOut { tx_hash: Some }` |
//! | `409 {reportId}`, settled | `DuplicateSubmission` |
//! | `409 {reportId, txHash}`, not yet deep enough | `SubmissionTimedOut { tx_hash: Some }` |
//! | other `4xx` | `SubmissionRejected` |
//! | `5xx` | `SubmissionTimedOut { tx_hash: None }` |
//!
//! A `5xx` on submit is treated as ambiguous: the gateway may have broadcast
//! the transaction before failing.
//!
//! Token lookups and duplicate answers that carry a `txHash` resolve only
//! once that transaction reaches the configured depth. Until then the
//! report may still be dropped, so it is reported as not found.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use witness_core::{CommittedRecord, Record, RegistryId, SubmissionToken};

use crate::config::RegistryHttpConfig;
use crate::error::RegistryError;
use crate::retry::retry_read;
use crate::wire::{ReportRef, SubmitAccepted, SubmitRequest, TransactionStatus, TxState};
use crate::RegistryClient;

/// [`RegistryClient`] backed by the ledger gateway REST API.
#[derive(Debug, Clone)]
pub struct HttpRegistryClient {
    http: reqwest::Client,
    base: String,
    confirmations: u32,
    commit_timeout: std::time::Duration,
    poll_interval: std::time::Duration,
}

impl HttpRegistryClient {
    pub fn new(config: RegistryHttpConfig) -> Result<Self, RegistryError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &config.api_token {
            let value =
                reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
                    .map_err(|_| RegistryError::Protocol {
                        endpoint: "client_init".into(),
                        detail: "registry token is not a valid header value".into(),
                    })?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| RegistryError::unavailable(format!("client init: {e}")))?;

        Ok(Self {
            http,
            base: config.base_url.as_str().trim_end_matches('/').to_string(),
            confirmations: config.confirmations.max(1),
            commit_timeout: config.commit_timeout,
            poll_interval: config.poll_interval,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Submit a record and return the transaction hash the gateway assigned.
    async fn submit(&self, record: &Record) -> Result<String, RegistryError> {
        let endpoint = "POST /v1/reports";
        let body = SubmitRequest {
            record: record.clone(),
        };

        let resp = match self.http.post(self.url("/v1/reports")).json(&body).send().await {
            Ok(resp) => resp,
            Err(e) if e.is_connect() => {
                return Err(RegistryError::unavailable(format!("{endpoint}: {e}")));
            }
            Err(e) => {
                return Err(RegistryError::SubmissionTimedOut {
                    tx_hash: None,
                    detail: format!("{endpoint}: {e}"),
                });
            }
        };

        let status = resp.status();
        if status.is_success() {
            let accepted: SubmitAccepted = decode(endpoint, resp).await?;
            return Ok(accepted.tx_hash);
        }
        if status == StatusCode::CONFLICT {
            let existing: ReportRef = decode(endpoint, resp).await?;
            return Err(match self.settled(&existing).await {
                Ok(true) => RegistryError::DuplicateSubmission {
                    existing: existing.report_id,
                },
                Ok(false) => RegistryError::SubmissionTimedOut {
                    tx_hash: existing.tx_hash,
                    detail: format!(
                        "token already used by report {} which is not yet confirmed",
                        existing.report_id
                    ),
                },
                Err(e) => RegistryError::SubmissionTimedOut {
                    tx_hash: existing.tx_hash,
                    detail: format!("token already used, depth unknown: {e}"),
                },
            });
        }
        let body = resp.text().await.unwrap_or_default();
        if status.is_client_error() {
            Err(RegistryError::SubmissionRejected {
                reason: format!("{status}: {body}"),
            })
        } else {
            Err(RegistryError::SubmissionTimedOut {
                tx_hash: None,
                detail: format!("{endpoint} answered {status}: {body}"),
            })
        }
    }

    /// Current status of a submitted transaction.
    pub async fn transaction(&self, tx_hash: &str) -> Result<TransactionStatus, RegistryError> {
        let endpoint = "GET /v1/transactions/{txHash}";
        let url = self.url(&format!("/v1/transactions/{tx_hash}"));
        let resp = retry_read(endpoint, || self.http.get(&url).send())
            .await
            .map_err(|e| RegistryError::unavailable(format!("{endpoint}: {e}")))?;
        if !resp.status().is_success() {
            return Err(unexpected(endpoint, resp).await);
        }
        decode(endpoint, resp).await
    }

    /// Whether the transaction behind `found` has reached the configured
    /// depth. A reference without a transaction hash is taken as settled.
    async fn settled(&self, found: &ReportRef) -> Result<bool, RegistryError> {
        let Some(tx_hash) = &found.tx_hash else {
            return Ok(true);
        };
        let status = self.transaction(tx_hash).await?;
        let deep = status.status == TxState::Confirmed
            && status.confirmations >= self.confirmations
            && status.report_id == Some(found.report_id);
        if !deep {
            tracing::debug!(
                %tx_hash,
                report_id = %found.report_id,
                state = ?status.status,
                confirmations = status.confirmations,
                required = self.confirmations,
                "report not yet settled"
            );
        }
        Ok(deep)
    }

    /// Poll `tx_hash` until it is confirmed deep enough, fails, or `deadline`
    /// passes. Read errors while polling are tolerated until the deadline.
    async fn await_confirmation(
        &self,
        tx_hash: String,
        deadline: Instant,
    ) -> Result<RegistryId, RegistryError> {
        let mut last_seen = String::from("no status received");
        loop {
            match self.transaction(&tx_hash).await {
                Ok(TransactionStatus {
                    status: TxState::Confirmed,
                    confirmations,
                    report_id: Some(id),
                    ..
                }) if confirmations >= self.confirmations => {
                    tracing::debug!(%tx_hash, registry_id = %id, confirmations, "transaction confirmed");
                    return Ok(id);
                }
                Ok(TransactionStatus {
                    status: TxState::Failed,
                    reason,
                    ..
                }) => {
                    return Err(RegistryError::SubmissionRejected {
                        reason: reason.unwrap_or_else(|| format!("transaction {tx_hash} failed")),
                    });
                }
                Ok(status) => {
                    last_seen = format!(
                        "{:?} with {}/{} confirmations",
                        status.status, status.confirmations, self.confirmations
                    );
                }
                Err(e) => {
                    tracing::warn!(%tx_hash, error = %e, "confirmation poll failed");
                    last_seen = e.to_string();
                }
            }

            if Instant::now() + self.poll_interval >= deadline {
                return Err(RegistryError::SubmissionTimedOut {
                    tx_hash: Some(tx_hash),
                    detail: format!("confirmation deadline passed, last seen {last_seen}"),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn commit(&self, record: &Record) -> Result<RegistryId, RegistryError> {
        let deadline = Instant::now() + self.commit_timeout;
        let tx_hash = self.submit(record).await?;
        tracing::info!(%tx_hash, token = %record.submission_token, "submission accepted by gateway");
        self.await_confirmation(tx_hash, deadline).await
    }

    async fn fetch(&self, id: RegistryId) -> Result<CommittedRecord, RegistryError> {
        let endpoint = "GET /v1/reports/{reportId}";
        let url = self.url(&format!("/v1/reports/{id}"));
        let resp = retry_read(endpoint, || self.http.get(&url).send())
            .await
            .map_err(|e| RegistryError::unavailable(format!("{endpoint}: {e}")))?;

        match resp.status() {
            StatusCode::NOT_FOUND => Err(RegistryError::NotFound(id)),
            StatusCode::BAD_REQUEST => Err(RegistryError::InvalidId(id.to_string())),
            s if s.is_success() => decode(endpoint, resp).await,
            _ => Err(unexpected(endpoint, resp).await),
        }
    }

    async fn find_by_token(
        &self,
        token: &SubmissionToken,
    ) -> Result<Option<RegistryId>, RegistryError> {
        let endpoint = "GET /v1/reports/by-token/{token}";
        let url = self.url(&format!("/v1/reports/by-token/{token}"));
        let resp = retry_read(endpoint, || self.http.get(&url).send())
            .await
            .map_err(|e| RegistryError::unavailable(format!("{endpoint}: {e}")))?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let found: ReportRef = decode(endpoint, resp).await?;
                if self.settled(&found).await? {
                    Ok(Some(found.report_id))
                } else {
                    Ok(None)
                }
            }
            _ => Err(unexpected(endpoint, resp).await),
        }
    }

    async fn check(&self) -> Result<(), RegistryError> {
        let endpoint = "GET /health";
        let resp = self
            .http
            .get(self.url("/health"))
            .send()
            .await
            .map_err(|e| RegistryError::unavailable(format!("{endpoint}: {e}")))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(RegistryError::unavailable(format!(
                "{endpoint} answered {}",
                resp.status()
            )))
        }
    }
}

async fn decode<T: DeserializeOwned>(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<T, RegistryError> {
    resp.json().await.map_err(|e| RegistryError::Protocol {
        endpoint: endpoint.into(),
        detail: e.to_string(),
    })
}

/// Map a non-success read answer. Server-side failures are transient.
async fn unexpected(endpoint: &str, resp: reqwest::Response) -> RegistryError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    if status.is_server_error() {
        RegistryError::unavailable(format!("{endpoint} answered {status}: {body}"))
    } else {
        RegistryError::Protocol {
            endpoint: endpoint.into(),
            detail: format!("{status}: {body}"),
        }
    }
}
