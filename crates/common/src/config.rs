use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default upstream bazaar API
pub const DEFAULT_API_ENDPOINT: &str = "https://api.hypixel.net/skyblock/bazaar";
/// Hard upstream limit on calls per minute
pub const DEFAULT_MAX_CALLS_PER_MINUTE: u32 = 120;
/// Calls per minute kept in reserve below the hard limit
pub const DEFAULT_SAFETY_MARGIN: u32 = 5;
pub const DEFAULT_COOLDOWN_SECS: u64 = 120;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RELIST_EVERY_PASSES: u64 = 1000;
pub const DEFAULT_MAX_PAYLOAD_FAILURES: u32 = 10;

/// Top level layout of the TOML config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub refresh: RefreshConfig,
}

impl FileConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: FileConfig = toml::from_str(raw)?;
        config.refresh.validate()?;
        Ok(config)
    }
}

/// Settings of the background refresher and its upstream client
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub api_endpoint: String,
    pub max_calls_per_minute: u32,
    pub safety_margin: u32,
    pub cooldown_secs: u64,
    pub request_timeout_secs: u64,
    /// Re-fetch the product list after this many completed passes
    pub relist_every_passes: u64,
    /// Consecutive malformed/rejected responses tolerated per product.
    /// `0` retries forever.
    pub max_consecutive_payload_failures: u32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            max_calls_per_minute: DEFAULT_MAX_CALLS_PER_MINUTE,
            safety_margin: DEFAULT_SAFETY_MARGIN,
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            relist_every_passes: DEFAULT_RELIST_EVERY_PASSES,
            max_consecutive_payload_failures: DEFAULT_MAX_PAYLOAD_FAILURES,
        }
    }
}

impl RefreshConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.safety_margin >= self.max_calls_per_minute {
            return Err(ConfigError::Invalid(format!(
                "safety_margin ({}) must be below max_calls_per_minute ({})",
                self.safety_margin, self.max_calls_per_minute
            )));
        }
        if self.relist_every_passes == 0 {
            return Err(ConfigError::Invalid(
                "relist_every_passes must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.api_endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("api_endpoint must not be empty".to_string()));
        }
        Ok(())
    }

    /// Sleep between two per-product calls: `60s / (limit - margin)`
    pub fn pacing_interval(&self) -> Duration {
        let budget = self.max_calls_per_minute.saturating_sub(self.safety_margin).max(1);
        Duration::from_secs(60) / budget
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn payload_failure_budget(&self) -> Option<u32> {
        match self.max_consecutive_payload_failures {
            0 => None,
            n => Some(n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pacing_leaves_headroom() {
        let config = RefreshConfig::default();
        // 115 calls per minute
        assert_eq!(config.pacing_interval(), Duration::from_secs(60) / 115);
        assert!(config.pacing_interval() > Duration::from_millis(500));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = FileConfig::from_toml(
            r#"
            [refresh]
            cooldown_secs = 30
            max_consecutive_payload_failures = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.refresh.cooldown(), Duration::from_secs(30));
        assert_eq!(config.refresh.max_calls_per_minute, DEFAULT_MAX_CALLS_PER_MINUTE);
        assert_eq!(config.refresh.api_endpoint, DEFAULT_API_ENDPOINT);
        assert_eq!(config.refresh.payload_failure_budget(), None);
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = FileConfig::from_toml("").unwrap();
        assert_eq!(config.refresh.payload_failure_budget(), Some(DEFAULT_MAX_PAYLOAD_FAILURES));
    }

    #[test]
    fn test_margin_must_stay_below_limit() {
        let err = FileConfig::from_toml(
            r#"
            [refresh]
            max_calls_per_minute = 5
            safety_margin = 5
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_unparseable_file() {
        let err = FileConfig::from_toml("refresh = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = FileConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
