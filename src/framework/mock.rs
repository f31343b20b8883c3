//! # Mock Container & Testing Guide
//!
//! [`MockContainer`] implements [`Container`] entirely in memory. It lets you
//! drive a [`HostingUnit`](crate::lifecycle::HostingUnit) through load and
//! unload without a real host, with a fluent builder for every input the
//! adapter reads.
//!
//! ## Testing Strategies
//!
//! <details>
//! <summary><b>Pattern 1: Single Unit</b></summary>
//!
//! ```rust
//! use engine_host::framework::mock::MockContainer;
//! use engine_host::lifecycle::{HostingUnit, LifecycleState};
//! use engine_host::config::EmptyConfigLoader;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let container = MockContainer::new()
//!         .context_param("io.engine.engine.application.id", "shop")
//!         .context_path("/shop");
//!     let unit = HostingUnit::with_loader(Arc::new(container), Arc::new(EmptyConfigLoader));
//!
//!     unit.on_load().unwrap();
//!     assert_eq!(unit.environment().unwrap().identity(), "shop");
//!
//!     unit.on_unload().await.unwrap();
//!     assert_eq!(unit.state(), LifecycleState::Stopped);
//! }
//! ```
//! </details>
//!
//! <details>
//! <summary><b>Pattern 2: Several Units In One Context</b></summary>
//!
//! [`MockContainer::sharing_context`] builds a second container that shares
//! the context scope, attribute store, module context and lifetime of the
//! first, like two adapters deployed in the same host context.
//!
//! ```rust
//! use engine_host::framework::mock::MockContainer;
//! use engine_host::lifecycle::HostingUnit;
//! use engine_host::config::EmptyConfigLoader;
//! use std::sync::Arc;
//!
//! let first = MockContainer::new();
//! let second = first.sharing_context();
//! let a = HostingUnit::with_loader(Arc::new(first), Arc::new(EmptyConfigLoader));
//! let b = HostingUnit::with_loader(Arc::new(second), Arc::new(EmptyConfigLoader));
//!
//! assert!(Arc::ptr_eq(&a.environment().unwrap(), &b.environment().unwrap()));
//! ```
//! </details>

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::core::{Container, ModuleContext};
use crate::attributes::AttributeStore;
use crate::config::{ParameterScope, Parameters};

/// An in-memory [`Container`] with a fluent builder.
#[derive(Debug)]
pub struct MockContainer {
    context: Arc<Parameters>,
    instance: Parameters,
    context_path: Option<String>,
    server_identity: Option<String>,
    modules: Arc<ModuleContext>,
    attributes: Arc<AttributeStore>,
    lifetime: CancellationToken,
    teardowns: Arc<AtomicUsize>,
}

impl MockContainer {
    pub fn new() -> Self {
        Self {
            context: Arc::new(Parameters::new()),
            instance: Parameters::new(),
            context_path: None,
            server_identity: None,
            modules: Arc::new(ModuleContext::new("mock")),
            attributes: Arc::new(AttributeStore::new()),
            lifetime: CancellationToken::new(),
            teardowns: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn context_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.context).insert(name, value);
        self
    }

    pub fn instance_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.instance.insert(name, value);
        self
    }

    pub fn context_path(mut self, path: impl Into<String>) -> Self {
        self.context_path = Some(path.into());
        self
    }

    pub fn server_identity(mut self, identity: impl Into<String>) -> Self {
        self.server_identity = Some(identity.into());
        self
    }

    pub fn modules(mut self, modules: ModuleContext) -> Self {
        self.modules = Arc::new(modules);
        self
    }

    /// A container for another unit in the same host context.
    ///
    /// Context parameters, context path, server identity, modules, attributes,
    /// lifetime and the teardown counter are shared; instance parameters start
    /// empty.
    pub fn sharing_context(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            instance: Parameters::new(),
            context_path: self.context_path.clone(),
            server_identity: self.server_identity.clone(),
            modules: Arc::clone(&self.modules),
            attributes: Arc::clone(&self.attributes),
            lifetime: self.lifetime.clone(),
            teardowns: Arc::clone(&self.teardowns),
        }
    }

    /// How many times [`Container::teardown`] ran across shared containers.
    pub fn teardown_count(&self) -> usize {
        self.teardowns.load(Ordering::SeqCst)
    }

    /// Handle to the teardown counter, usable after the container is moved.
    pub fn teardown_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.teardowns)
    }
}

impl Default for MockContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl Container for MockContainer {
    fn context_parameters(&self) -> &dyn ParameterScope {
        self.context.as_ref()
    }

    fn instance_parameters(&self) -> &dyn ParameterScope {
        &self.instance
    }

    fn context_path(&self) -> Option<String> {
        self.context_path.clone()
    }

    fn server_identity(&self) -> Option<String> {
        self.server_identity.clone()
    }

    fn module_context(&self) -> Arc<ModuleContext> {
        Arc::clone(&self.modules)
    }

    fn attributes(&self) -> Arc<AttributeStore> {
        Arc::clone(&self.attributes)
    }

    fn lifetime(&self) -> CancellationToken {
        self.lifetime.clone()
    }

    fn teardown(&self) {
        let count = self.teardowns.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(count, "Mock container teardown");
    }
}
