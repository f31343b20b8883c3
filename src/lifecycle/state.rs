//! Lifecycle states and status reporting.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::upgrade::UpgradeKind;

/// `Unloaded -> Loading -> Running -> StopPreparing -> Stopped`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    Unloaded,
    Loading,
    Running,
    StopPreparing,
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Unloaded => "unloaded",
            LifecycleState::Loading => "loading",
            LifecycleState::Running => "running",
            LifecycleState::StopPreparing => "stop-preparing",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// A point-in-time view of a hosting unit. Fields are `None` until the
/// corresponding value has been resolved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStatus {
    pub state: LifecycleState,
    pub application_id: Option<String>,
    pub root_path: Option<String>,
    pub upgrade: Option<UpgradeKind>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names() {
        assert_eq!(LifecycleState::Unloaded.to_string(), "unloaded");
        assert_eq!(LifecycleState::StopPreparing.to_string(), "stop-preparing");
    }
}
