//! # witness-store: Content-Addressed Attachment Storage
//!
//! Defines the [`ContentStore`] contract used by the intake pipeline and two
//! implementations:
//!
//! - [`FsContentStore`]: the local content-store node. Blobs live at
//!   `{root}/sha256/{aa}/{digest_hex}` and are written via temp file, fsync
//!   and atomic rename, so a successful `put` means the bytes are durably
//!   retrievable.
//! - [`MemoryContentStore`]: process-local, for development and tests.
//!
//! ## Contract
//!
//! - `put` is deterministic and idempotent: equal bytes yield equal ids and a
//!   second write of present content is a no-op.
//! - `get` verifies the digest of what it read. A mismatch is
//!   [`StoreError::Corrupt`] and the bytes are never returned.
//! - Errors are classified here, at the boundary:
//!   [`StoreError::is_transient`] tells callers whether a retry can help.
//!
//! ## Crate Policy
//!
//! - Depends only on `witness-core` internally.
//! - Knows nothing about reports; stores opaque bytes.

pub mod error;
pub mod fs;
pub mod memory;

pub use error::StoreError;
pub use fs::FsContentStore;
pub use memory::MemoryContentStore;

use async_trait::async_trait;
use witness_core::ContentId;

/// A content-addressed blob store.
///
/// Implementations must be safe for concurrent use from many requests.
#[async_trait]
pub trait ContentStore: Send + Sync + std::fmt::Debug {
    /// Store `bytes`, returning their content id once durably retrievable.
    async fn put(&self, bytes: &[u8]) -> Result<ContentId, StoreError>;

    /// Fetch the bytes stored under `id`, or `None` if absent.
    async fn get(&self, id: &ContentId) -> Result<Option<Vec<u8>>, StoreError>;

    /// Whether content with this id is present, without reading it.
    async fn contains(&self, id: &ContentId) -> Result<bool, StoreError>;

    /// Readiness probe. Succeeds when the store can accept writes.
    async fn check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
