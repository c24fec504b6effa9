//! # Report Subcommand
//!
//! Reads reports from the ledger gateway and submits new ones through the
//! intake pipeline, storing attachments in the local content store.
//!
//! ```bash
//! witness report get 12
//! witness report find 3f2c9a0e-...
//! witness report submit --category theft ... --document a.pdf --identity id.png
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use url::Url;
use witness_core::{RegistryId, SubmissionFields, SubmissionToken};
use witness_intake::{IntakeOutcome, IntakePipeline, PipelineConfig, StagingArea, SubmitReport};
use witness_registry::{HttpRegistryClient, RegistryClient, RegistryError, RegistryHttpConfig};
use witness_store::FsContentStore;

use crate::{EXIT_AMBIGUOUS, EXIT_NOT_FOUND};

/// Report subcommand arguments.
#[derive(Args, Debug)]
pub struct ReportArgs {
    #[command(subcommand)]
    pub command: ReportCommand,
}

#[derive(Subcommand, Debug)]
pub enum ReportCommand {
    /// Print a committed report by registry id.
    Get { report_id: String },

    /// Print the report carrying a submission token.
    Find { token: String },

    /// Store both attachments and commit a new report.
    Submit(SubmitArgs),
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    #[arg(long)]
    pub category: String,
    #[arg(long)]
    pub subcategory: String,
    /// Date the incident occurred.
    #[arg(long)]
    pub date: String,
    /// Time the incident occurred.
    #[arg(long)]
    pub time: String,
    /// Reporter name.
    #[arg(long)]
    pub name: String,
    #[arg(long = "nearest-police-station", alias = "nearest-facility")]
    pub nearest_facility: String,
    /// Reporter address.
    #[arg(long)]
    pub address: String,
    /// Supporting document.
    #[arg(long)]
    pub document: PathBuf,
    /// Identity document.
    #[arg(long)]
    pub identity: PathBuf,
    /// Submission token to reuse. Resubmitting with the same key never
    /// creates a second record.
    #[arg(long)]
    pub idempotency_key: Option<String>,
}

impl SubmitArgs {
    fn fields(&self) -> SubmissionFields {
        SubmissionFields {
            category: Some(self.category.clone()),
            subcategory: Some(self.subcategory.clone()),
            occurred_date: Some(self.date.clone()),
            occurred_time: Some(self.time.clone()),
            reporter_name: Some(self.name.clone()),
            nearest_facility: Some(self.nearest_facility.clone()),
            reporter_address: Some(self.address.clone()),
        }
    }
}

/// Execute the report subcommand.
pub async fn run_report(args: &ReportArgs, cas_dir: &Path, registry_url: Option<&str>) -> Result<u8> {
    let url = registry_url
        .context("report commands need --registry-url or WITNESS_REGISTRY_URL")?;
    let client = HttpRegistryClient::new(registry_config(url)?)?;

    match &args.command {
        ReportCommand::Get { report_id } => run_get(&client, report_id).await,
        ReportCommand::Find { token } => run_find(&client, token).await,
        ReportCommand::Submit(submit) => run_submit(Arc::new(client), cas_dir, submit).await,
    }
}

/// Gateway settings from the environment, pointed at `url`.
fn registry_config(url: &str) -> Result<RegistryHttpConfig> {
    let base_url = Url::parse(url).with_context(|| format!("invalid registry URL {url:?}"))?;
    Ok(RegistryHttpConfig::from_env_with_url(base_url)?)
}

async fn run_get(client: &HttpRegistryClient, raw: &str) -> Result<u8> {
    let id = RegistryId::from_str(raw)?;
    match client.fetch(id).await {
        Ok(committed) => {
            println!("{}", serde_json::to_string_pretty(&committed)?);
            Ok(0)
        }
        Err(RegistryError::NotFound(_)) => {
            eprintln!("report {id} not found");
            Ok(EXIT_NOT_FOUND)
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_find(client: &HttpRegistryClient, raw: &str) -> Result<u8> {
    let token = SubmissionToken::from_key(raw)?;
    let Some(id) = client.find_by_token(&token).await? else {
        eprintln!("no report carries token {token}");
        return Ok(EXIT_NOT_FOUND);
    };
    let committed = client.fetch(id).await?;
    println!("{}", serde_json::to_string_pretty(&committed)?);
    Ok(0)
}

async fn run_submit(
    registry: Arc<dyn RegistryClient>,
    cas_dir: &Path,
    args: &SubmitArgs,
) -> Result<u8> {
    let scratch = tempfile::tempdir().context("failed to create staging directory")?;
    let staging = StagingArea::new(scratch.path());
    let document = stage_file(&staging, &args.document).await?;
    let identity = stage_file(&staging, &args.identity).await?;

    let pipeline = IntakePipeline::new(
        Arc::new(FsContentStore::new(cas_dir)),
        registry,
        PipelineConfig::from_env()?,
    );
    let request = SubmitReport {
        fields: args.fields(),
        document: Some(document),
        identity: Some(identity),
        idempotency_key: args.idempotency_key.clone(),
    };

    match pipeline.submit(request).await {
        IntakeOutcome::Succeeded(receipt) => {
            println!("{}", serde_json::to_string_pretty(&receipt)?);
            Ok(0)
        }
        IntakeOutcome::Ambiguous(ambiguous) => {
            println!("{}", serde_json::to_string_pretty(&ambiguous)?);
            eprintln!(
                "commit outcome unknown; check with `witness report find {}` or resubmit with --idempotency-key {}",
                ambiguous.submission_token, ambiguous.submission_token
            );
            Ok(EXIT_AMBIGUOUS)
        }
        IntakeOutcome::Failed(failure) => {
            eprintln!("submission failed while {}: {}", failure.stage, failure.error);
            if failure.content_stored {
                eprintln!("attachments were stored and can be reused");
            }
            if failure.error.retry_safe() {
                eprintln!("it is safe to retry");
            }
            Ok(1)
        }
    }
}

async fn stage_file(
    staging: &StagingArea,
    path: &Path,
) -> Result<witness_intake::StagedUpload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    staging
        .stage_bytes(&bytes)
        .await
        .with_context(|| format!("failed to stage {}", path.display()))
}
