//! In-memory content store backed by `DashMap`.
//!
//! Blobs are held as `Arc<[u8]>` keyed by content id. Cheaply cloneable;
//! all clones share the same data. Data is lost when the process exits.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use witness_core::ContentId;

use crate::error::StoreError;
use crate::ContentStore;

/// Process-local content store.
#[derive(Debug, Clone, Default)]
pub struct MemoryContentStore {
    blobs: Arc<DashMap<ContentId, Arc<[u8]>>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct blobs held.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Overwrite the bytes under `id` without rehashing. Test hook for
    /// exercising corruption handling.
    pub fn corrupt(&self, id: &ContentId, bytes: &[u8]) {
        self.blobs.insert(*id, Arc::from(bytes));
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, bytes: &[u8]) -> Result<ContentId, StoreError> {
        let id = ContentId::digest(bytes);
        self.blobs.entry(id).or_insert_with(|| Arc::from(bytes));
        Ok(id)
    }

    async fn get(&self, id: &ContentId) -> Result<Option<Vec<u8>>, StoreError> {
        let Some(blob) = self.blobs.get(id).map(|entry| Arc::clone(entry.value())) else {
            return Ok(None);
        };
        if !id.matches(&blob) {
            return Err(StoreError::Corrupt {
                expected: *id,
                actual: ContentId::digest(&blob),
            });
        }
        Ok(Some(blob.to_vec()))
    }

    async fn contains(&self, id: &ContentId) -> Result<bool, StoreError> {
        Ok(self.blobs.contains_key(id))
    }
}
