//! # In-Memory Ledger
//!
//! Append-only, id-indexed record log held in process memory. Used when no
//! gateway is configured, as the backing store of the stub gateway, and in
//! tests.
//!
//! Ids start at 1 and are assigned in commit order. A submission token may
//! appear on at most one record; a second commit carrying it is refused with
//! [`RegistryError::DuplicateSubmission`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use witness_core::{CommittedRecord, Record, RegistryId, SubmissionToken};

use crate::error::RegistryError;
use crate::RegistryClient;

#[derive(Debug, Default)]
struct LedgerState {
    entries: Vec<CommittedRecord>,
    by_token: HashMap<SubmissionToken, RegistryId>,
}

/// Process-local append-only ledger. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `record` and return its id.
    ///
    /// Records with a blank metadata field are refused the way the on-chain
    /// contract reverts them.
    pub fn append(&self, record: &Record) -> Result<RegistryId, RegistryError> {
        if let Some(field) = blank_field(record) {
            return Err(RegistryError::SubmissionRejected {
                reason: format!("field {field} is empty"),
            });
        }

        let mut state = self.state.write();
        if let Some(existing) = state.by_token.get(&record.submission_token) {
            return Err(RegistryError::DuplicateSubmission {
                existing: *existing,
            });
        }
        let id = RegistryId(state.entries.len() as u64 + 1);
        state.entries.push(CommittedRecord {
            registry_id: id,
            record: record.clone(),
            committed_at: Utc::now(),
        });
        state.by_token.insert(record.submission_token.clone(), id);
        Ok(id)
    }

    /// Look up a record by id.
    pub fn get(&self, id: RegistryId) -> Option<CommittedRecord> {
        let index = usize::try_from(id.get()).ok()?.checked_sub(1)?;
        self.state.read().entries.get(index).cloned()
    }

    /// Look up the id carrying `token`.
    pub fn lookup_token(&self, token: &SubmissionToken) -> Option<RegistryId> {
        self.state.read().by_token.get(token).copied()
    }

    /// Number of committed records.
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn blank_field(record: &Record) -> Option<&'static str> {
    let m = &record.metadata;
    [
        ("category", &m.category),
        ("subcategory", &m.subcategory),
        ("occurredDate", &m.occurred_date),
        ("occurredTime", &m.occurred_time),
        ("reporterName", &m.reporter_name),
        ("nearestFacility", &m.nearest_facility),
        ("reporterAddress", &m.reporter_address),
    ]
    .into_iter()
    .find(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name)
}

#[async_trait]
impl RegistryClient for MemoryLedger {
    async fn commit(&self, record: &Record) -> Result<RegistryId, RegistryError> {
        let id = self.append(record)?;
        tracing::debug!(registry_id = %id, token = %record.submission_token, "record appended");
        Ok(id)
    }

    async fn fetch(&self, id: RegistryId) -> Result<CommittedRecord, RegistryError> {
        self.get(id).ok_or(RegistryError::NotFound(id))
    }

    async fn find_by_token(
        &self,
        token: &SubmissionToken,
    ) -> Result<Option<RegistryId>, RegistryError> {
        Ok(self.lookup_token(token))
    }
}
