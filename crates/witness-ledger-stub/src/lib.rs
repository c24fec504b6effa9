//! In-memory ledger gateway for development and tests.
//!
//! Speaks the gateway protocol `witness_registry::HttpRegistryClient` uses,
//! backed by a `MemoryLedger`. A record becomes readable as soon as its
//! transaction is accepted, before any confirmation. Nothing survives a
//! restart.

pub mod routes;
pub mod store;

pub use routes::router;
pub use store::LedgerState;
