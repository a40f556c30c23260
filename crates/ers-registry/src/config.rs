//! Protocol configuration.
//!
//! Loaded from YAML, then overridden by `ERS_*` environment variables, then
//! validated. Every field has a default so an empty document is a valid
//! (local) configuration.
//!
//! Variables:
//! - `ERS_CHAIN_ID`
//! - `ERS_GENESIS_TIMESTAMP`
//! - `ERS_MAX_LOCKIN_PERIOD` (seconds)
//! - `ERS_MAX_BLOCK_WINDOW` (blocks)
//! - `ERS_PROJECT_UPDATE_WINDOW` (seconds)
//! - `ERS_GATEWAY_URLS` (comma-separated)
//! - `ERS_ROOT_LABEL`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default ceiling on a project's lock-in, five years.
pub const DEFAULT_MAX_LOCKIN_PERIOD: u64 = 5 * 365 * 24 * 60 * 60;

/// Default service-change signature window.
pub const DEFAULT_MAX_BLOCK_WINDOW: u64 = 100;

/// Default merkle-root update window, thirty days.
pub const DEFAULT_PROJECT_UPDATE_WINDOW: u64 = 30 * 24 * 60 * 60;

/// Static configuration of one protocol deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtocolConfig {
    /// Chain id bound into ownership and custody proofs.
    pub chain_id: u64,
    /// Timestamp of block 1.
    pub genesis_timestamp: u64,
    /// Ceiling on `lockinPeriod - creationTimestamp` for new chips.
    pub max_lockin_period: u64,
    /// How many blocks a service-change signature stays valid.
    pub max_block_window: u64,
    /// Seconds after project creation during which its claim root may change.
    pub project_update_window: u64,
    /// Gateway URL templates returned with off-chain lookups.
    pub gateway_urls: Vec<String>,
    /// Label of the namespace root node.
    pub root_label: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            genesis_timestamp: 1_700_000_000,
            max_lockin_period: DEFAULT_MAX_LOCKIN_PERIOD,
            max_block_window: DEFAULT_MAX_BLOCK_WINDOW,
            project_update_window: DEFAULT_PROJECT_UPDATE_WINDOW,
            gateway_urls: Vec::new(),
            root_label: "ers".to_string(),
        }
    }
}

impl ProtocolConfig {
    /// Parse a YAML document and validate it. No environment overrides.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file, apply `ERS_*` environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = serde_yaml::from_str(&text)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        tracing::debug!(path = %path.display(), chain_id = config.chain_id, "protocol config loaded");
        Ok(config)
    }

    /// Defaults plus `ERS_*` environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides read through `lookup` (normally the process
    /// environment).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ERS_CHAIN_ID") {
            self.chain_id = parse_u64("ERS_CHAIN_ID", &v)?;
        }
        if let Some(v) = lookup("ERS_GENESIS_TIMESTAMP") {
            self.genesis_timestamp = parse_u64("ERS_GENESIS_TIMESTAMP", &v)?;
        }
        if let Some(v) = lookup("ERS_MAX_LOCKIN_PERIOD") {
            self.max_lockin_period = parse_u64("ERS_MAX_LOCKIN_PERIOD", &v)?;
        }
        if let Some(v) = lookup("ERS_MAX_BLOCK_WINDOW") {
            self.max_block_window = parse_u64("ERS_MAX_BLOCK_WINDOW", &v)?;
        }
        if let Some(v) = lookup("ERS_PROJECT_UPDATE_WINDOW") {
            self.project_update_window = parse_u64("ERS_PROJECT_UPDATE_WINDOW", &v)?;
        }
        if let Some(v) = lookup("ERS_GATEWAY_URLS") {
            self.gateway_urls = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = lookup("ERS_ROOT_LABEL") {
            self.root_label = v;
        }
        Ok(())
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain_id == 0 {
            return Err(ConfigError::invalid("chain_id", "must be non-zero"));
        }
        if self.max_block_window == 0 {
            return Err(ConfigError::invalid("max_block_window", "must be non-zero"));
        }
        if self.max_lockin_period == 0 {
            return Err(ConfigError::invalid("max_lockin_period", "must be non-zero"));
        }
        if self.root_label.is_empty() || self.root_label.contains('.') {
            return Err(ConfigError::invalid(
                "root_label",
                "must be a single non-empty label",
            ));
        }
        for url in &self.gateway_urls {
            validate_gateway_url(url)?;
        }
        Ok(())
    }
}

/// Gateway URLs must be absolute http(s) URLs.
pub fn validate_gateway_url(url: &str) -> Result<(), ConfigError> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !host.starts_with('/') => Ok(()),
        _ => Err(ConfigError::InvalidUrl(url.to_string())),
    }
}

fn parse_u64(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var,
        value: value.to_string(),
    })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The YAML document is malformed.
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// An environment override is not a valid value.
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Rejected value.
        value: String,
    },
    /// A gateway URL is not an absolute http(s) URL.
    #[error("invalid gateway URL: {0}")]
    InvalidUrl(String),
    /// A field failed validation.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Field name.
        field: &'static str,
        /// Why it was rejected.
        reason: &'static str,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: &'static str) -> Self {
        Self::Invalid { field, reason }
    }
}
