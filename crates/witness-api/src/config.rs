//! Server configuration, read from `WITNESS_*` environment variables.

use std::path::PathBuf;

use witness_intake::PipelineConfig;
use witness_registry::RegistryHttpConfig;

/// Default request body ceiling: 25 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Everything the server needs at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Root of the filesystem content store.
    pub cas_dir: PathBuf,
    /// Directory for per-request upload files.
    pub staging_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub metrics_enabled: bool,
    pub log_format: LogFormat,
    pub pipeline: PipelineConfig,
    /// Ledger gateway. `None` selects the in-memory ledger.
    pub registry: Option<RegistryHttpConfig>,
}

impl AppConfig {
    /// Load configuration from the environment.
    ///
    /// - `WITNESS_PORT` (default: 8080)
    /// - `WITNESS_CAS_DIR` (default: `./data/cas`)
    /// - `WITNESS_STAGING_DIR` (default: `./data/staging`)
    /// - `WITNESS_MAX_UPLOAD_BYTES` (default: 25 MiB)
    /// - `WITNESS_METRICS_ENABLED` (default: true; `false` disables)
    /// - `WITNESS_LOG_FORMAT` (`json` or text)
    /// - pipeline and registry variables, see [`PipelineConfig::from_env`]
    ///   and [`RegistryHttpConfig::from_env`]
    pub fn from_env() -> Result<Self, ConfigError> {
        let registry = match RegistryHttpConfig::from_env() {
            Ok(cfg) => Some(cfg),
            Err(witness_registry::ConfigError::MissingUrl) => None,
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            port: env_parse("WITNESS_PORT", 8080)?,
            cas_dir: env_path("WITNESS_CAS_DIR", "./data/cas"),
            staging_dir: env_path("WITNESS_STAGING_DIR", "./data/staging"),
            max_upload_bytes: env_parse("WITNESS_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            metrics_enabled: std::env::var("WITNESS_METRICS_ENABLED")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(true),
            log_format: log_format(),
            pipeline: PipelineConfig::from_env()?,
            registry,
        })
    }
}

/// Log format selected by `WITNESS_LOG_FORMAT`.
pub fn log_format() -> LogFormat {
    match std::env::var("WITNESS_LOG_FORMAT") {
        Ok(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
        _ => LogFormat::Text,
    }
}

fn env_path(var: &str, default: &str) -> PathBuf {
    std::env::var_os(var)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(var.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(String, String),
    #[error(transparent)]
    Registry(#[from] witness_registry::ConfigError),
    #[error(transparent)]
    Pipeline(#[from] witness_intake::ConfigError),
}
