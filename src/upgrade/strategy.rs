//! Protocol-upgrade strategies.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::UpgradeError;

/// Which implementation handles upgrades.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpgradeKind {
    Default,
    ContainerSpecific(String),
}

/// A request to switch the connection to another protocol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpgradeRequest {
    pub protocol: String,
    pub headers: Vec<(String, String)>,
}

impl UpgradeRequest {
    pub fn new(protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// The connection now speaks `protocol`.
    Switched { protocol: String, via: UpgradeKind },
}

/// Hands a connection off to another protocol after the initial handshake.
#[async_trait]
pub trait UpgradeStrategy: Send + Sync {
    fn kind(&self) -> UpgradeKind;

    async fn handle(&self, request: UpgradeRequest) -> Result<UpgradeOutcome, UpgradeError>;
}

/// The container-agnostic strategy, used whenever no extension applies.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultUpgrade;

#[async_trait]
impl UpgradeStrategy for DefaultUpgrade {
    fn kind(&self) -> UpgradeKind {
        UpgradeKind::Default
    }

    async fn handle(&self, request: UpgradeRequest) -> Result<UpgradeOutcome, UpgradeError> {
        let protocol = request.protocol.trim();
        if protocol.is_empty() {
            return Err(UpgradeError::Rejected("missing upgrade protocol".into()));
        }
        debug!(protocol, headers = request.headers.len(), "Default upgrade");
        Ok(UpgradeOutcome::Switched {
            protocol: protocol.to_owned(),
            via: UpgradeKind::Default,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_upgrade_switches() {
        let outcome = DefaultUpgrade
            .handle(UpgradeRequest::new("websocket").with_header("Sec-WebSocket-Version", "13"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            UpgradeOutcome::Switched {
                protocol: "websocket".into(),
                via: UpgradeKind::Default
            }
        );
    }

    #[tokio::test]
    async fn test_default_upgrade_rejects_blank_protocol() {
        let result = DefaultUpgrade.handle(UpgradeRequest::new("  ")).await;
        assert!(matches!(result, Err(UpgradeError::Rejected(_))));
    }
}
