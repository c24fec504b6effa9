//! # Upload Staging
//!
//! Each inbound attachment is written to its own temp file in the staging
//! directory before it reaches the content store. A [`StagedUpload`] owns
//! its file exclusively and deletes it when released or dropped, so the
//! staging directory is left empty whatever the request outcome.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

/// Directory in which per-request upload files are created.
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the staging directory if it does not exist.
    pub async fn ensure(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Open a fresh, empty staged upload.
    pub fn create(&self) -> io::Result<StagedUpload> {
        let file = tempfile::Builder::new()
            .prefix("upload-")
            .tempfile_in(&self.dir)?;
        let writer = tokio::fs::File::from_std(file.as_file().try_clone()?);
        Ok(StagedUpload {
            file: Some(file),
            writer: Some(writer),
            len: 0,
        })
    }

    /// Stage an in-memory buffer in one step.
    pub async fn stage_bytes(&self, bytes: &[u8]) -> io::Result<StagedUpload> {
        let mut upload = self.create()?;
        upload.write_chunk(bytes).await?;
        upload.finish().await?;
        Ok(upload)
    }
}

/// One attachment staged on local disk for the duration of a request.
#[derive(Debug)]
pub struct StagedUpload {
    file: Option<NamedTempFile>,
    writer: Option<tokio::fs::File>,
    len: u64,
}

impl StagedUpload {
    /// Append a chunk.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "staged upload is sealed"))?;
        writer.write_all(chunk).await?;
        self.len += chunk.len() as u64;
        Ok(())
    }

    /// Flush and seal the upload. Further writes fail.
    pub async fn finish(&mut self) -> io::Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().await?;
        }
        Ok(())
    }

    /// Number of bytes written.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Location of the staged file, until released.
    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(NamedTempFile::path)
    }

    /// Read the full staged contents.
    pub async fn read(&self) -> io::Result<Vec<u8>> {
        match self.path() {
            Some(path) => tokio::fs::read(path).await,
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                "staged upload already released",
            )),
        }
    }

    /// Delete the staged file now. Failures are logged, never returned.
    pub fn release(mut self) {
        self.discard();
    }

    fn discard(&mut self) {
        self.writer = None;
        if let Some(file) = self.file.take() {
            let path = file.path().to_path_buf();
            if let Err(e) = file.close() {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove staged upload");
            }
        }
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        self.discard();
    }
}
