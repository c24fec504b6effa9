//! # Application State
//!
//! Shared handles passed to every handler through the `State` extractor.
//! Built once at startup; cloning is cheap (everything is behind `Arc`).

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use witness_intake::{IntakePipeline, StagingArea};
use witness_registry::{HttpRegistryClient, MemoryLedger, RegistryClient, RegistryError};
use witness_store::{ContentStore, FsContentStore};

use crate::config::{AppConfig, DEFAULT_MAX_UPLOAD_BYTES};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: IntakePipeline,
    pub staging: StagingArea,
    pub max_upload_bytes: usize,
    /// Prometheus render handle. `None` disables `/metrics`.
    pub metrics: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("pipeline", &self.pipeline)
            .field("staging", &self.staging)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl AppState {
    /// Assemble state from an already-built pipeline.
    pub fn new(pipeline: IntakePipeline, staging: StagingArea) -> Self {
        Self {
            pipeline,
            staging,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            metrics: None,
        }
    }

    /// Build the content store, registry client, and pipeline described by
    /// `config`.
    ///
    /// Without a registry URL the in-memory ledger is used, which loses
    /// every record on restart.
    pub async fn from_config(
        config: &AppConfig,
        metrics: Option<PrometheusHandle>,
    ) -> Result<Self, StateError> {
        let store: Arc<dyn ContentStore> = Arc::new(FsContentStore::new(&config.cas_dir));
        let registry: Arc<dyn RegistryClient> = match &config.registry {
            Some(registry_config) => {
                tracing::info!(url = %registry_config.base_url, "using ledger gateway");
                Arc::new(HttpRegistryClient::new(registry_config.clone())?)
            }
            None => {
                tracing::warn!(
                    "WITNESS_REGISTRY_URL not set: using in-memory ledger, records will not survive restart"
                );
                Arc::new(MemoryLedger::new())
            }
        };

        let staging = StagingArea::new(&config.staging_dir);
        staging
            .ensure()
            .await
            .map_err(|e| StateError::Staging(format!("{}: {e}", config.staging_dir.display())))?;

        let pipeline = IntakePipeline::new(store, registry, config.pipeline.clone());
        Ok(Self {
            pipeline,
            staging,
            max_upload_bytes: config.max_upload_bytes,
            metrics,
        })
    }
}

/// Startup failures.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("registry client: {0}")]
    Registry(#[from] RegistryError),
    #[error("staging directory: {0}")]
    Staging(String),
}
