//! # witness CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use witness_cli::report::{run_report, ReportArgs};
use witness_cli::store::{run_store, StoreArgs};

/// Witness registry operator CLI.
#[derive(Parser, Debug)]
#[command(name = "witness", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Content store root directory.
    #[arg(long, env = "WITNESS_CAS_DIR", default_value = "./data/cas", global = true)]
    cas_dir: PathBuf,

    /// Ledger gateway base URL.
    #[arg(long, env = "WITNESS_REGISTRY_URL", global = true)]
    registry_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Content store operations (put, get, verify, list).
    Store(StoreArgs),

    /// Report lookup and submission.
    Report(ReportArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Store(args) => run_store(args, &cli.cas_dir).await,
        Commands::Report(args) => {
            run_report(args, &cli.cas_dir, cli.registry_url.as_deref()).await
        }
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
