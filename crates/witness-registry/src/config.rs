//! Ledger gateway client configuration.
//!
//! Loaded from `WITNESS_REGISTRY_*` environment variables, or built
//! explicitly with [`RegistryHttpConfig::local`] for tests and the stub.

use std::time::Duration;

use url::Url;
use zeroize::Zeroizing;

/// Settings for [`crate::HttpRegistryClient`].
///
/// `Debug` redacts `api_token`.
#[derive(Clone)]
pub struct RegistryHttpConfig {
    /// Gateway base URL.
    pub base_url: Url,
    /// Bearer token sent on every request, if the gateway requires one.
    pub api_token: Option<Zeroizing<String>>,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Confirmation depth a submission must reach before `commit` resolves.
    pub confirmations: u32,
    /// Upper bound on the whole submit-and-confirm cycle.
    pub commit_timeout: Duration,
    /// Delay between confirmation polls.
    pub poll_interval: Duration,
}

impl std::fmt::Debug for RegistryHttpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryHttpConfig")
            .field("base_url", &self.base_url)
            .field(
                "api_token",
                &self.api_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("request_timeout", &self.request_timeout)
            .field("confirmations", &self.confirmations)
            .field("commit_timeout", &self.commit_timeout)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl RegistryHttpConfig {
    /// Load configuration from environment variables.
    ///
    /// - `WITNESS_REGISTRY_URL` (required)
    /// - `WITNESS_REGISTRY_TOKEN` (optional)
    /// - `WITNESS_REGISTRY_TIMEOUT_SECS` (default: 30)
    /// - `WITNESS_CONFIRMATIONS` (default: 1)
    /// - `WITNESS_COMMIT_TIMEOUT_SECS` (default: 120)
    /// - `WITNESS_REGISTRY_POLL_MS` (default: 1000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var("WITNESS_REGISTRY_URL").map_err(|_| ConfigError::MissingUrl)?;
        let base_url = Url::parse(&raw)
            .map_err(|e| ConfigError::InvalidUrl("WITNESS_REGISTRY_URL".into(), e.to_string()))?;
        Self::from_env_with_url(base_url)
    }

    /// Like [`Self::from_env`], with the gateway URL given explicitly.
    /// `WITNESS_REGISTRY_URL` is ignored.
    pub fn from_env_with_url(base_url: Url) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url,
            api_token: std::env::var("WITNESS_REGISTRY_TOKEN")
                .ok()
                .filter(|t| !t.is_empty())
                .map(Zeroizing::new),
            request_timeout: Duration::from_secs(env_parse("WITNESS_REGISTRY_TIMEOUT_SECS", 30)?),
            confirmations: env_parse("WITNESS_CONFIRMATIONS", 1)?,
            commit_timeout: Duration::from_secs(env_parse("WITNESS_COMMIT_TIMEOUT_SECS", 120)?),
            poll_interval: Duration::from_millis(env_parse("WITNESS_REGISTRY_POLL_MS", 1000)?),
        })
    }

    /// Configuration pointing at a local gateway, with short timeouts.
    pub fn local(base_url: &str) -> Result<Self, ConfigError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidUrl(base_url.to_string(), e.to_string()))?;
        Ok(Self {
            base_url,
            api_token: None,
            request_timeout: Duration::from_secs(5),
            confirmations: 1,
            commit_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(50),
        })
    }
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
    #[error("WITNESS_REGISTRY_URL environment variable is not set")]
    MissingUrl,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(String, String),
}
