//! Errors raised while locating, reading, or checking authorizer settings.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file exists in the layering order but could not be read.
    #[error("cannot read authorizer settings from {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("authorizer settings in {} are not valid TOML: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A value parsed but cannot be honoured at runtime.
    #[error("setting `{key}` rejected: {reason}")]
    Rejected { key: &'static str, reason: String },

    /// No home directory, so the per-user settings file has no location.
    #[error("no per-user settings directory on this platform")]
    NoUserDir,
}
