//! Configuration management for Gatehouse
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (GATEHOUSE_* prefix, highest precedence)
//! 2. gatehouse.local.toml (gitignored, local overrides)
//! 3. gatehouse.toml (git-tracked, project config)
//! 4. ~/.config/gatehouse/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)
//!
//! Nested keys are separated by a double underscore in environment
//! variables, e.g. `GATEHOUSE_CACHE__SWEEP_INTERVAL_MS=60000`.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use gatehouse_types::ParseMode;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Default policy-store cache sweep interval: six hours.
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 21_600_000;

/// Main Gatehouse configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatehouseConfig {
    pub cache: CacheConfig,
    pub permissions: PermissionConfig,
}

/// Policy-store cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Milliseconds between full cache flushes. Read once at startup.
    pub sweep_interval_ms: u64,
    /// Whether to run the background sweeper at all.
    pub sweeper_enabled: bool,
}

impl CacheConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
            sweeper_enabled: true,
        }
    }
}

/// Permission-string handling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionConfig {
    pub parse_mode: ParseMode,
}

impl GatehouseConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Read a single TOML file, without layering.
    pub fn from_file(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|source| ConfigError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the runtime cannot honour.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.cache.sweep_interval_ms == 0 {
            return Err(ConfigError::Rejected {
                key: "cache.sweep_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
