//! Error types for the hosting unit lifecycle.

use thiserror::Error;

use super::state::LifecycleState;
use crate::environment::EnvironmentError;

/// Errors surfaced to the host from load, unload and task scheduling.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The operation is not valid in the current state, e.g. a second load.
    #[error("Cannot {operation} a hosting unit that is {state}")]
    InvalidTransition {
        operation: &'static str,
        state: LifecycleState,
    },

    /// Bootstrap or startup failed.
    #[error(transparent)]
    Environment(#[from] EnvironmentError),
}
