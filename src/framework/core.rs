//! # Container Surface
//!
//! This module defines what the adapter consumes from its host.
//!
//! ## Key Types
//!
//! - [`Container`]: the callback surface a host container exposes to a hosting unit.
//! - [`ModuleContext`]: the registry used to resolve named extensions
//!   (application modules and container-specific upgrade strategies).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::attributes::AttributeStore;
use crate::config::ParameterScope;
use crate::environment::Application;
use crate::upgrade::{UpgradeError, UpgradeStrategy};

/// The host container as seen by one hosting unit.
///
/// Parameters come in two scopes: the context scope, shared by every unit in
/// the container, and the instance scope, specific to this unit. Units that
/// share a context must return the same [`AttributeStore`] from
/// [`attributes`](Container::attributes).
pub trait Container: Send + Sync {
    fn context_parameters(&self) -> &dyn ParameterScope;

    fn instance_parameters(&self) -> &dyn ParameterScope;

    fn context_path(&self) -> Option<String>;

    /// Free-form identity string, e.g. `"jetty/11.0.15"`.
    fn server_identity(&self) -> Option<String>;

    fn module_context(&self) -> Arc<ModuleContext>;

    fn attributes(&self) -> Arc<AttributeStore>;

    /// Host-owned lifetime. Cancelling it cancels every context derived from it.
    fn lifetime(&self) -> CancellationToken;

    /// Container-specific teardown, run during unload after in-flight work has
    /// finished and before the environment stops.
    fn teardown(&self) {}
}

/// Installs stages or other behavior into a starting application.
pub type ApplicationModule = Arc<dyn Fn(&Application) + Send + Sync>;

/// Constructs a container-specific upgrade strategy.
pub type UpgradeFactory =
    Arc<dyn Fn() -> Result<Arc<dyn UpgradeStrategy>, UpgradeError> + Send + Sync>;

/// Registry of named extensions available to the host.
///
/// Hosts populate it with whatever optional extensions were compiled in.
/// Looking up a name that was never registered is how an extension is found
/// to be "not installed".
#[derive(Clone, Default)]
pub struct ModuleContext {
    name: String,
    modules: HashMap<String, ApplicationModule>,
    upgrades: HashMap<String, UpgradeFactory>,
}

impl ModuleContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_module<F>(mut self, name: impl Into<String>, module: F) -> Self
    where
        F: Fn(&Application) + Send + Sync + 'static,
    {
        self.modules.insert(name.into(), Arc::new(module));
        self
    }

    pub fn with_upgrade<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn UpgradeStrategy>, UpgradeError> + Send + Sync + 'static,
    {
        self.upgrades.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn module(&self, name: &str) -> Option<ApplicationModule> {
        self.modules.get(name).cloned()
    }

    /// Constructs the upgrade extension registered under `name`.
    pub fn resolve_upgrade(&self, name: &str) -> Result<Arc<dyn UpgradeStrategy>, UpgradeError> {
        let factory = self
            .upgrades
            .get(name)
            .ok_or_else(|| UpgradeError::ExtensionUnavailable(name.to_owned()))?;
        factory()
    }
}

impl fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut modules: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        let mut upgrades: Vec<&str> = self.upgrades.keys().map(String::as_str).collect();
        modules.sort_unstable();
        upgrades.sort_unstable();
        f.debug_struct("ModuleContext")
            .field("name", &self.name)
            .field("modules", &modules)
            .field("upgrades", &upgrades)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upgrade::{DefaultUpgrade, UpgradeKind};

    #[test]
    fn test_resolve_upgrade() {
        let context = ModuleContext::new("host").with_upgrade("present", || {
            Ok(Arc::new(DefaultUpgrade) as Arc<dyn UpgradeStrategy>)
        });

        let strategy = context.resolve_upgrade("present").unwrap();
        assert_eq!(strategy.kind(), UpgradeKind::Default);

        let missing = context.resolve_upgrade("absent");
        assert!(matches!(missing, Err(UpgradeError::ExtensionUnavailable(name)) if name == "absent"));
    }

    #[test]
    fn test_module_lookup() {
        let context = ModuleContext::new("host").with_module("routes", |_: &Application| {});
        assert!(context.module("routes").is_some());
        assert!(context.module("other").is_none());
        assert_eq!(context.name(), "host");
    }
}
