//! # Store Subcommand
//!
//! Direct operations on the filesystem content store.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use witness_core::ContentId;
use witness_store::{ContentStore, FsContentStore, StoreError};

use crate::EXIT_NOT_FOUND;

/// Store subcommand arguments.
#[derive(Args, Debug)]
pub struct StoreArgs {
    #[command(subcommand)]
    pub command: StoreCommand,
}

#[derive(Subcommand, Debug)]
pub enum StoreCommand {
    /// Store a file and print its content id.
    Put {
        file: PathBuf,
    },

    /// Print or save the bytes stored under a content id.
    Get {
        content_id: String,

        /// Write the bytes to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Re-hash stored content and compare it with its id.
    Verify {
        content_id: String,
    },

    /// List every stored content id.
    List,
}

/// Execute the store subcommand against the store rooted at `cas_dir`.
pub async fn run_store(args: &StoreArgs, cas_dir: &Path) -> Result<u8> {
    let store = FsContentStore::new(cas_dir);
    match &args.command {
        StoreCommand::Put { file } => run_put(&store, file).await,
        StoreCommand::Get { content_id, output } => {
            run_get(&store, content_id, output.as_deref()).await
        }
        StoreCommand::Verify { content_id } => run_verify(&store, content_id).await,
        StoreCommand::List => run_list(&store),
    }
}

async fn run_put(store: &FsContentStore, file: &Path) -> Result<u8> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let id = store.put(&bytes).await?;
    tracing::info!(content_id = %id, size = bytes.len(), "stored");
    println!("{id}");
    Ok(0)
}

async fn run_get(store: &FsContentStore, raw: &str, output: Option<&Path>) -> Result<u8> {
    let id = ContentId::from_str(raw)?;
    let Some(bytes) = store.get(&id).await? else {
        eprintln!("content {id} not found");
        return Ok(EXIT_NOT_FOUND);
    };
    match output {
        Some(path) => {
            tokio::fs::write(path, &bytes)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("wrote {} bytes to {}", bytes.len(), path.display());
        }
        None => {
            use std::io::Write;
            std::io::stdout()
                .write_all(&bytes)
                .context("failed to write to stdout")?;
        }
    }
    Ok(0)
}

async fn run_verify(store: &FsContentStore, raw: &str) -> Result<u8> {
    let id = ContentId::from_str(raw)?;
    match store.get(&id).await {
        Ok(Some(bytes)) => {
            println!("OK: {id} ({} bytes)", bytes.len());
            Ok(0)
        }
        Ok(None) => {
            eprintln!("content {id} not found");
            Ok(EXIT_NOT_FOUND)
        }
        Err(StoreError::Corrupt { actual, .. }) => {
            eprintln!("CORRUPT: {id} now hashes to {actual}");
            Ok(1)
        }
        Err(e) => Err(e.into()),
    }
}

fn run_list(store: &FsContentStore) -> Result<u8> {
    let ids = store.list()?;
    for id in &ids {
        println!("{id}");
    }
    tracing::info!(count = ids.len(), root = %store.root().display(), "listed content");
    Ok(0)
}
