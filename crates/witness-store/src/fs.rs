//! # Filesystem Content Store
//!
//! The local content-store node. Blobs are stored at
//! `{root}/sha256/{aa}/{digest_hex}` where `aa` is the first byte of the
//! digest, which keeps directory fan-out bounded.
//!
//! ## Durability
//!
//! A blob is written to a temp file in its final directory, fsynced, then
//! renamed into place with no-clobber semantics and the directory fsynced.
//! `put` returns only after all of that, so the id it returns is always
//! resolvable, including after a crash. Readers never observe a partially
//! written blob under its final name. A blob already present is re-hashed
//! before `put` trusts it, and replaced when it no longer matches.
//!
//! ## Integrity
//!
//! Every `get` recomputes the digest of what it read and compares it to the
//! id it was asked for. Corruption or tampering surfaces as
//! [`StoreError::Corrupt`].
//!
//! Filesystem calls run on tokio's blocking pool.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use witness_core::ContentId;

use crate::error::StoreError;
use crate::ContentStore;

/// Directory under the root holding SHA-256 addressed blobs.
const ALGORITHM_DIR: &str = "sha256";

/// A durable content store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    /// Create a store rooted at `root`.
    ///
    /// The directory does not need to exist yet; it is created on the first
    /// write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path at which the blob for `id` is (or would be) stored.
    pub fn blob_path(&self, id: &ContentId) -> PathBuf {
        blob_path(&self.root, id)
    }

    /// List every content id held by the store, sorted.
    ///
    /// Entries whose file name is not a valid digest (for example temp files
    /// left by an interrupted write) are skipped.
    pub fn list(&self) -> Result<Vec<ContentId>, StoreError> {
        let base = self.root.join(ALGORITHM_DIR);
        if !base.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for shard in fs::read_dir(&base)? {
            let shard = shard?;
            if !shard.file_type()?.is_dir() {
                continue;
            }
            for entry in fs::read_dir(shard.path())? {
                let entry = entry?;
                if let Some(name) = entry.file_name().to_str() {
                    if let Ok(id) = ContentId::from_hex(name) {
                        ids.push(id);
                    }
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

fn blob_path(root: &Path, id: &ContentId) -> PathBuf {
    let hex = id.to_hex();
    root.join(ALGORITHM_DIR).join(&hex[..2]).join(hex)
}

/// Write `bytes` under `id`. Returns whether a blob was written.
///
/// An existing blob is kept only while it still hashes to `id`; a damaged
/// one is replaced from `bytes`.
fn write_blob(root: &Path, id: &ContentId, bytes: &[u8]) -> Result<bool, StoreError> {
    let path = blob_path(root, id);
    let repair = match fs::read(&path) {
        Ok(existing) if id.matches(&existing) => return Ok(false),
        Ok(existing) => {
            tracing::warn!(
                expected = %id,
                actual = %ContentId::digest(&existing),
                path = %path.display(),
                "replacing corrupt blob"
            );
            true
        }
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => return Err(e.into()),
    };
    let dir = path
        .parent()
        .ok_or_else(|| StoreError::unavailable("blob path has no parent directory"))?
        .to_path_buf();
    fs::create_dir_all(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;

    if repair {
        tmp.persist(&path).map_err(|e| StoreError::from(e.error))?;
    } else {
        match tmp.persist_noclobber(&path) {
            Ok(_) => {}
            // A concurrent writer of the same content got there first.
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(e.error.into()),
        }
    }
    sync_dir(&dir)?;
    Ok(true)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

fn read_blob(root: &Path, id: &ContentId) -> Result<Option<Vec<u8>>, StoreError> {
    let path = blob_path(root, id);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if !id.matches(&bytes) {
        let actual = ContentId::digest(&bytes);
        tracing::error!(
            expected = %id,
            %actual,
            path = %path.display(),
            "stored blob failed integrity check"
        );
        return Err(StoreError::Corrupt {
            expected: *id,
            actual,
        });
    }
    Ok(Some(bytes))
}

async fn blocking<T, F>(f: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::unavailable(format!("blocking task failed: {e}")))?
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn put(&self, bytes: &[u8]) -> Result<ContentId, StoreError> {
        let root = self.root.clone();
        let owned = bytes.to_vec();
        let (id, written) = blocking(move || {
            let id = ContentId::digest(&owned);
            let written = write_blob(&root, &id, &owned)?;
            Ok((id, written))
        })
        .await?;

        if written {
            tracing::debug!(content_id = %id, size = bytes.len(), "blob stored");
        } else {
            tracing::debug!(content_id = %id, "blob already present");
        }
        Ok(id)
    }

    async fn get(&self, id: &ContentId) -> Result<Option<Vec<u8>>, StoreError> {
        let root = self.root.clone();
        let id = *id;
        blocking(move || read_blob(&root, &id)).await
    }

    async fn contains(&self, id: &ContentId) -> Result<bool, StoreError> {
        let path = self.blob_path(id);
        blocking(move || Ok(path.is_file())).await
    }

    async fn check(&self) -> Result<(), StoreError> {
        let base = self.root.join(ALGORITHM_DIR);
        blocking(move || {
            fs::create_dir_all(&base)?;
            NamedTempFile::new_in(&base)?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FsContentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContentStore::new(dir.path().join("cas"));
        (dir, store)
    }

    #[tokio::test]
    async fn put_then_get_roundtrip() {
        let (_dir, store) = store();
        let id = store.put(b"supporting document").await.unwrap();
        assert_eq!(id, ContentId::digest(b"supporting document"));
        let bytes = store.get(&id).await.unwrap().unwrap();
        assert_eq!(bytes, b"supporting document");
    }

    #[tokio::test]
    async fn put_is_idempotent_and_deduplicated() {
        let (_dir, store) = store();
        let a = store.put(b"same bytes").await.unwrap();
        let b = store.put(b"same bytes").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(store.list().unwrap(), vec![a]);
    }

    #[tokio::test]
    async fn blob_lands_in_sharded_path() {
        let (dir, store) = store();
        let id = store.put(b"x").await.unwrap();
        let hex = id.to_hex();
        let expected = dir
            .path()
            .join("cas")
            .join("sha256")
            .join(&hex[..2])
            .join(&hex);
        assert_eq!(store.blob_path(&id), expected);
        assert!(expected.is_file());
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let (_dir, store) = store();
        let id = ContentId::digest(b"never stored");
        assert!(store.get(&id).await.unwrap().is_none());
        assert!(!store.contains(&id).await.unwrap());
    }

    #[tokio::test]
    async fn get_detects_corruption() {
        let (_dir, store) = store();
        let id = store.put(b"original").await.unwrap();
        fs::write(store.blob_path(&id), b"tampered").unwrap();

        match store.get(&id).await {
            Err(StoreError::Corrupt { expected, actual }) => {
                assert_eq!(expected, id);
                assert_eq!(actual, ContentId::digest(b"tampered"));
            }
            other => panic!("expected corruption, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn put_repairs_corrupt_blob() {
        let (_dir, store) = store();
        let id = store.put(b"evidence").await.unwrap();
        fs::write(store.blob_path(&id), b"bitrot").unwrap();

        assert_eq!(store.put(b"evidence").await.unwrap(), id);
        assert_eq!(store.get(&id).await.unwrap().unwrap(), b"evidence");
        assert_eq!(store.list().unwrap(), vec![id]);
    }

    #[tokio::test]
    async fn empty_payload_is_storable() {
        let (_dir, store) = store();
        let id = store.put(b"").await.unwrap();
        assert_eq!(store.get(&id).await.unwrap().unwrap(), Vec::<u8>::new());
    }

    #[tokio::test]
    async fn concurrent_puts_of_same_content_converge() {
        let (_dir, store) = store();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.put(b"raced content").await
            }));
        }
        for handle in handles {
            assert_eq!(
                handle.await.unwrap().unwrap(),
                ContentId::digest(b"raced content")
            );
        }
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_skips_stray_files() {
        let (_dir, store) = store();
        let id = store.put(b"kept").await.unwrap();
        let shard = store.blob_path(&id).parent().unwrap().to_path_buf();
        fs::write(shard.join(".tmpabc123"), b"partial").unwrap();
        fs::write(store.root().join("sha256").join("README"), b"stray").unwrap();
        assert_eq!(store.list().unwrap(), vec![id]);
    }

    #[tokio::test]
    async fn list_on_fresh_store_is_empty() {
        let (_dir, store) = store();
        assert!(store.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn check_creates_root() {
        let (_dir, store) = store();
        store.check().await.unwrap();
        assert!(store.root().join("sha256").is_dir());
    }
}
