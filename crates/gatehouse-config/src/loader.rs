//! Configuration loader with multi-source merging

use crate::{GatehouseConfig, Paths};
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    include_user_config: bool,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "GATEHOUSE".to_string(),
            include_user_config: true,
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "GATEHOUSE")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Skip ~/.config/gatehouse/config.toml
    pub fn without_user_config(mut self) -> Self {
        self.include_user_config = false;
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<GatehouseConfig> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = GatehouseConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2-4. User, project, then local (gitignored) files; later ones win
        for file in self.settings_files() {
            builder = builder.add_source(
                config::File::from(file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 5. Environment variables (GATEHOUSE_*), "__" between nesting levels
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("cannot layer authorizer settings")?;

        let gatehouse_config: GatehouseConfig = config
            .try_deserialize()
            .context("authorizer settings do not match the expected shape")?;

        gatehouse_config
            .validate()
            .context("authorizer settings rejected")?;

        Ok(gatehouse_config)
    }

    /// Existing settings files, lowest precedence first.
    fn settings_files(&self) -> Vec<PathBuf> {
        let user = self
            .include_user_config
            .then(|| Paths::new().user_config_file().ok())
            .flatten();

        user.into_iter()
            .chain([
                Paths::project_config_file(&self.project_dir),
                Paths::local_config_file(&self.project_dir),
            ])
            .filter(|file| file.exists())
            .collect()
    }

    /// Load configuration, falling back to defaults when any source is
    /// missing, malformed or rejected. The fallback is logged at `warn`.
    pub fn load_or_default(self) -> GatehouseConfig {
        self.load().unwrap_or_else(|e| {
            warn!(error = ?e, "using default authorizer settings");
            GatehouseConfig::default()
        })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
