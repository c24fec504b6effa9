//! In-memory ledger state.
//!
//! Records live in a [`MemoryLedger`]; submitted transactions are tracked in
//! a `DashMap` keyed by transaction hash. Confirmation depth is simulated
//! from the time elapsed since acceptance and a fixed block interval. Each
//! report remembers the transaction that wrote it, so lookups can tell
//! callers which transaction to check for depth.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;
use witness_core::{Record, RegistryId};
use witness_registry::wire::{ReportRef, TransactionStatus, TxState};
use witness_registry::{MemoryLedger, RegistryError};

/// Depth reported for every transaction when the block interval is zero.
const INSTANT_DEPTH: u32 = 64;

struct Transaction {
    accepted_at: Instant,
    outcome: Result<RegistryId, String>,
}

struct Inner {
    ledger: MemoryLedger,
    transactions: DashMap<String, Transaction>,
    written_by: DashMap<RegistryId, String>,
    block_interval: Duration,
}

/// Shared gateway state. Clones share the same ledger.
#[derive(Clone)]
pub struct LedgerState {
    inner: Arc<Inner>,
}

impl LedgerState {
    pub fn new(block_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                ledger: MemoryLedger::new(),
                transactions: DashMap::new(),
                written_by: DashMap::new(),
                block_interval,
            }),
        }
    }

    pub fn ledger(&self) -> &MemoryLedger {
        &self.inner.ledger
    }

    /// Accept `record` into a new transaction and return its hash.
    ///
    /// A record the contract would revert still gets a transaction, which
    /// reports `failed` once mined. A duplicate token is refused up front.
    pub fn submit(&self, record: &Record) -> Result<String, RegistryError> {
        let outcome = match self.inner.ledger.append(record) {
            Ok(id) => Ok(id),
            Err(RegistryError::SubmissionRejected { reason }) => Err(reason),
            Err(other) => return Err(other),
        };
        let tx_hash = format!("0x{}", Uuid::new_v4().simple());
        if let Ok(id) = &outcome {
            self.inner.written_by.insert(*id, tx_hash.clone());
        }
        self.inner.transactions.insert(
            tx_hash.clone(),
            Transaction {
                accepted_at: Instant::now(),
                outcome,
            },
        );
        Ok(tx_hash)
    }

    /// Reference to report `id` naming the transaction that wrote it.
    pub fn report_ref(&self, id: RegistryId) -> ReportRef {
        ReportRef {
            report_id: id,
            tx_hash: self.inner.written_by.get(&id).map(|tx| tx.value().clone()),
        }
    }

    /// Current status of `tx_hash`, or `None` for an unknown hash.
    pub fn status(&self, tx_hash: &str) -> Option<TransactionStatus> {
        let tx = self.inner.transactions.get(tx_hash)?;
        let confirmations = self.depth(tx.accepted_at);
        let mined = confirmations > 0;
        let (status, report_id, reason) = match (&tx.outcome, mined) {
            (_, false) => (TxState::Pending, None, None),
            (Ok(id), true) => (TxState::Confirmed, Some(*id), None),
            (Err(reason), true) => (TxState::Failed, None, Some(reason.clone())),
        };
        Some(TransactionStatus {
            tx_hash: tx_hash.to_string(),
            status,
            confirmations,
            report_id,
            reason,
        })
    }

    fn depth(&self, since: Instant) -> u32 {
        let interval = self.inner.block_interval.as_millis();
        if interval == 0 {
            return INSTANT_DEPTH;
        }
        u32::try_from(since.elapsed().as_millis() / interval).unwrap_or(u32::MAX)
    }
}
