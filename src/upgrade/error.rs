//! Error types for protocol upgrades.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum UpgradeError {
    /// No extension is registered under this name.
    #[error("Upgrade extension not installed: {0}")]
    ExtensionUnavailable(String),

    /// The extension is registered but could not be constructed.
    #[error("Upgrade extension {name} failed to load: {reason}")]
    ExtensionFailed { name: String, reason: String },

    #[error("Upgrade rejected: {0}")]
    Rejected(String),
}
