//! # witness-registry: Append-Only Report Registry
//!
//! Defines the [`RegistryClient`] contract and its implementations:
//!
//! - [`MemoryLedger`]: an in-process append-only ledger. Ids start at 1 and
//!   increase monotonically; submission tokens are unique.
//! - [`HttpRegistryClient`]: typed client for the ledger gateway, the REST
//!   service that fronts the on-chain contract and owns wallet/signing.
//!
//! ## Gateway Protocol
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST   | `/v1/reports` | Submit a record, returns `{txHash}` |
//! | GET    | `/v1/transactions/{txHash}` | Confirmation status |
//! | GET    | `/v1/reports/{reportId}` | Fetch a committed record |
//! | GET    | `/v1/reports/by-token/{token}` | Resolve a submission token |
//! | GET    | `/health` | Liveness of the gateway |
//!
//! ## Error Classification
//!
//! Every failure is classified at this boundary as fatal
//! ([`RegistryError::SubmissionRejected`]), ambiguous
//! ([`RegistryError::SubmissionTimedOut`]) or transient-and-definite
//! ([`RegistryError::Unavailable`]). Callers must never treat an ambiguous
//! result as either success or failure.

pub mod config;
pub mod error;
pub mod http;
pub mod memory;
pub(crate) mod retry;
pub mod wire;

pub use config::{ConfigError, RegistryHttpConfig};
pub use error::RegistryError;
pub use http::HttpRegistryClient;
pub use memory::MemoryLedger;

use async_trait::async_trait;
use witness_core::{CommittedRecord, Record, RegistryId, SubmissionToken};

/// Access to a single append-only, id-indexed ledger.
///
/// Implementations must be safe for concurrent use. Ordering among
/// concurrent commits from the same process is not guaranteed.
#[async_trait]
pub trait RegistryClient: Send + Sync + std::fmt::Debug {
    /// Submit `record` and resolve once it reaches the configured
    /// confirmation depth.
    async fn commit(&self, record: &Record) -> Result<RegistryId, RegistryError>;

    /// Read a committed record. Never mutates ledger state.
    async fn fetch(&self, id: RegistryId) -> Result<CommittedRecord, RegistryError>;

    /// Resolve a submission token to the id of the record that carries it.
    async fn find_by_token(
        &self,
        token: &SubmissionToken,
    ) -> Result<Option<RegistryId>, RegistryError>;

    /// Readiness probe.
    async fn check(&self) -> Result<(), RegistryError> {
        Ok(())
    }
}
