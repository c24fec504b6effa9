//! Ledger gateway stub server.
//!
//! `WITNESS_LEDGER_STUB_PORT` (default 8090) selects the port and
//! `WITNESS_LEDGER_BLOCK_MS` (default 500) the simulated block interval.

use std::net::SocketAddr;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use witness_ledger_stub::{router, LedgerState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port: u16 = std::env::var("WITNESS_LEDGER_STUB_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8090);
    let block_ms: u64 = std::env::var("WITNESS_LEDGER_BLOCK_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(500);

    let app = router(LedgerState::new(Duration::from_millis(block_ms)));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(block_ms, "witness-ledger-stub listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
