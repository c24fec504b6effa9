//! Pipeline timing and retry configuration.

use std::time::Duration;

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each later one.
    pub base_delay: Duration,
    /// Ceiling on any single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (zero-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Total attempts including the first.
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Settings for [`crate::IntakePipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Bound on a single `ContentStore::put`.
    pub store_timeout: Duration,
    /// Retry policy for transient store failures.
    pub store_retry: RetryPolicy,
    /// Bound on a single `RegistryClient::commit`.
    pub commit_timeout: Duration,
    /// Bound on each registry lookup made while disambiguating.
    pub lookup_timeout: Duration,
    /// Polling schedule for token lookups after an ambiguous commit.
    pub lookup_retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(30),
            store_retry: RetryPolicy {
                max_retries: 3,
                base_delay: Duration::from_millis(200),
                max_delay: Duration::from_secs(5),
            },
            commit_timeout: Duration::from_secs(120),
            lookup_timeout: Duration::from_secs(10),
            lookup_retry: RetryPolicy {
                max_retries: 5,
                base_delay: Duration::from_millis(500),
                max_delay: Duration::from_secs(10),
            },
        }
    }
}

impl PipelineConfig {
    /// Load from environment variables, falling back to [`Default`].
    ///
    /// - `WITNESS_STORE_TIMEOUT_SECS` (default: 30)
    /// - `WITNESS_STORE_MAX_RETRIES` (default: 3)
    /// - `WITNESS_COMMIT_TIMEOUT_SECS` (default: 120)
    /// - `WITNESS_LOOKUP_MAX_RETRIES` (default: 5)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let mut config = defaults.clone();
        config.store_timeout = Duration::from_secs(env_parse(
            "WITNESS_STORE_TIMEOUT_SECS",
            defaults.store_timeout.as_secs(),
        )?);
        config.store_retry.max_retries =
            env_parse("WITNESS_STORE_MAX_RETRIES", defaults.store_retry.max_retries)?;
        config.commit_timeout = Duration::from_secs(env_parse(
            "WITNESS_COMMIT_TIMEOUT_SECS",
            defaults.commit_timeout.as_secs(),
        )?);
        config.lookup_retry.max_retries =
            env_parse("WITNESS_LOOKUP_MAX_RETRIES", defaults.lookup_retry.max_retries)?;
        Ok(config)
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
    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(String, String),
}
