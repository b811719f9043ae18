//! Where authorizer settings files live.

use crate::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// XDG-compliant paths for Gatehouse
pub struct Paths {
    project_dirs: Option<ProjectDirs>,
}

impl Paths {
    /// Resolves the per-user directory once; it may be absent in sandboxes.
    pub fn new() -> Self {
        Self {
            project_dirs: ProjectDirs::from("org", "Gatehouse", "gatehouse"),
        }
    }

    /// Get user config directory (~/.config/gatehouse/)
    pub fn user_config_dir(&self) -> Result<PathBuf, ConfigError> {
        self.project_dirs
            .as_ref()
            .map(|p| p.config_dir().to_path_buf())
            .ok_or(ConfigError::NoUserDir)
    }

    /// Get user config file path (~/.config/gatehouse/config.toml)
    pub fn user_config_file(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.user_config_dir()?.join("config.toml"))
    }

    /// Get project config file path (gatehouse.toml)
    pub fn project_config_file(project_dir: impl AsRef<Path>) -> PathBuf {
        project_dir.as_ref().join("gatehouse.toml")
    }

    /// Get local config file path (gatehouse.local.toml, gitignored)
    pub fn local_config_file(project_dir: impl AsRef<Path>) -> PathBuf {
        project_dir.as_ref().join("gatehouse.local.toml")
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}
