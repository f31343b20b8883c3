//! # Upgrade Strategy Selection
//!
//! The container identity is probed case-insensitively for a known marker. A
//! match names an extension to resolve from the [`ModuleContext`]. Every
//! resolution failure (not registered, constructor error, constructor panic)
//! means the extension is not installed, and the [`DefaultUpgrade`] is used.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, info};

use super::error::UpgradeError;
use super::strategy::{DefaultUpgrade, UpgradeStrategy};
use crate::framework::ModuleContext;

pub const JETTY_UPGRADE_EXTENSION: &str = "jetty-upgrade";

/// Identity markers and the extension each one selects.
pub const KNOWN_CONTAINERS: &[(&str, &str)] = &[("jetty", JETTY_UPGRADE_EXTENSION)];

pub fn select_upgrade(identity: Option<&str>, modules: &ModuleContext) -> Arc<dyn UpgradeStrategy> {
    let identity = identity.unwrap_or_default().to_ascii_lowercase();
    let Some((marker, extension)) = KNOWN_CONTAINERS
        .iter()
        .find(|(marker, _)| identity.contains(marker))
    else {
        debug!(%identity, "No container-specific upgrade; using default");
        return Arc::new(DefaultUpgrade);
    };

    match resolve(modules, extension) {
        Ok(strategy) => {
            info!(marker, extension, kind = ?strategy.kind(), "Using container-specific upgrade");
            strategy
        }
        Err(reason) => {
            debug!(marker, extension, %reason, "Upgrade extension not installed; using default");
            Arc::new(DefaultUpgrade)
        }
    }
}

fn resolve(modules: &ModuleContext, extension: &str) -> Result<Arc<dyn UpgradeStrategy>, UpgradeError> {
    panic::catch_unwind(AssertUnwindSafe(|| modules.resolve_upgrade(extension))).unwrap_or_else(|_| {
        Err(UpgradeError::ExtensionFailed {
            name: extension.to_owned(),
            reason: "constructor panicked".into(),
        })
    })
}
