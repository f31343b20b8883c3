//! Error types for configuration loading and resolution.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading the external configuration document.
///
/// Every variant is fatal for the hosting unit: the resolver never retries.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML.
    #[error("Failed to parse configuration {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A custom loader failed for its own reasons.
    #[error("Configuration loader failed: {0}")]
    Loader(String),
}
