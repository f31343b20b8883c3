//! Error types for environment bootstrap and startup.

use thiserror::Error;

use super::monitor::MonitorError;
use crate::attributes::AttributeError;
use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum EnvironmentError {
    /// The external configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Shared attribute error: {0}")]
    Attribute(#[from] AttributeError),

    /// A configured application module is not registered in the module context.
    #[error("Application module not found: {0}")]
    ModuleNotFound(String),

    /// A configured application module panicked while being installed.
    #[error("Application module {name} failed: {reason}")]
    ModuleFailed { name: String, reason: String },

    #[error("Application already started")]
    AlreadyStarted,

    #[error("Application not started")]
    NotStarted,

    /// A subscriber failed while the application was starting.
    #[error("Lifecycle event failed: {0}")]
    Monitor(#[from] MonitorError),
}
