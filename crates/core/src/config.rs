//! Run configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{Error, Result};
use crate::inventory::ManagedNamespace;

pub const DEFAULT_MANAGED_PREFIX: &str = "adsync";
pub const DEFAULT_TOKEN_REFRESH_ATTEMPTS: u32 = 3;
pub const DEFAULT_TOKEN_REFRESH_BACKOFF_MS: u64 = 2_000;
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;
pub const DEFAULT_MAX_SOURCE_PAGES: u32 = 1_000;
pub const DEFAULT_CURRENCY_CODE: &str = "USD";

/// Tunables for one reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    /// Leading name segment marking engine-owned entities.
    pub managed_prefix: String,
    pub token_refresh_attempts: u32,
    /// Fixed delay between token refresh attempts.
    pub token_refresh_backoff_ms: u64,
    pub event_buffer_size: usize,
    /// Upper bound on source pages drained per run.
    pub max_source_pages: u32,
    pub currency_code: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            managed_prefix: DEFAULT_MANAGED_PREFIX.to_string(),
            token_refresh_attempts: DEFAULT_TOKEN_REFRESH_ATTEMPTS,
            token_refresh_backoff_ms: DEFAULT_TOKEN_REFRESH_BACKOFF_MS,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            max_source_pages: DEFAULT_MAX_SOURCE_PAGES,
            currency_code: DEFAULT_CURRENCY_CODE.to_string(),
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env_value(name) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::config(format!("{} has an invalid value '{}'", name, raw))),
        None => Ok(None),
    }
}

impl SyncConfig {
    /// Defaults overlaid with `ADSYNC_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(prefix) = env_value("ADSYNC_MANAGED_PREFIX") {
            config.managed_prefix = prefix;
        }
        if let Some(attempts) = env_parsed("ADSYNC_TOKEN_REFRESH_ATTEMPTS")? {
            config.token_refresh_attempts = attempts;
        }
        if let Some(backoff) = env_parsed("ADSYNC_TOKEN_REFRESH_BACKOFF_MS")? {
            config.token_refresh_backoff_ms = backoff;
        }
        if let Some(size) = env_parsed("ADSYNC_EVENT_BUFFER_SIZE")? {
            config.event_buffer_size = size;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.managed_prefix.trim().is_empty() {
            return Err(Error::config("managedPrefix must not be empty"));
        }
        if self.managed_prefix.contains('/') {
            return Err(Error::config("managedPrefix must not contain '/'"));
        }
        if self.token_refresh_attempts == 0 {
            return Err(Error::config("tokenRefreshAttempts must be at least 1"));
        }
        if self.event_buffer_size == 0 {
            return Err(Error::config("eventBufferSize must be at least 1"));
        }
        if self.max_source_pages == 0 {
            return Err(Error::config("maxSourcePages must be at least 1"));
        }
        Ok(())
    }

    pub fn namespace(&self) -> ManagedNamespace {
        ManagedNamespace::new(self.managed_prefix.clone())
    }

    pub fn token_refresh_backoff(&self) -> Duration {
        Duration::from_millis(self.token_refresh_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_are_valid() {
        let config = SyncConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.namespace().prefix(), "adsync");
        assert_eq!(config.token_refresh_backoff(), Duration::from_secs(2));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: SyncConfig =
            serde_json::from_value(json!({"managedPrefix": "mine", "tokenRefreshAttempts": 5}))
                .unwrap();
        assert_eq!(config.managed_prefix, "mine");
        assert_eq!(config.token_refresh_attempts, 5);
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = SyncConfig {
            managed_prefix: "a/b".to_string(),
            ..SyncConfig::default()
        };
        assert!(config.validate().is_err());

        config.managed_prefix = "ok".to_string();
        config.token_refresh_attempts = 0;
        assert!(config.validate().is_err());

        config.token_refresh_attempts = 1;
        config.event_buffer_size = 0;
        assert!(config.validate().is_err());
    }
}
