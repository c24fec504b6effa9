//! Ledger gateway wire types, shared by the HTTP client and the stub
//! gateway.

use serde::{Deserialize, Serialize};
use witness_core::{Record, RegistryId};

/// Body of `POST /v1/reports`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub record: Record,
}

/// `202 Accepted` answer to a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAccepted {
    pub tx_hash: String,
}

/// Answer carrying a report id. Used by token lookups and by the `409`
/// duplicate-token answer to a submission.
///
/// `tx_hash` names the transaction that wrote the report. When present, the
/// report counts as settled only once that transaction is confirmed deep
/// enough.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRef {
    pub report_id: RegistryId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

/// Lifecycle of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxState {
    Pending,
    Confirmed,
    Failed,
}

/// Body of `GET /v1/transactions/{txHash}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStatus {
    pub tx_hash: String,
    pub status: TxState,
    #[serde(default)]
    pub confirmations: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_id: Option<RegistryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Error body returned by the gateway for non-2xx answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayError {
    pub error: String,
}
