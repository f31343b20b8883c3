//! # Environment Bootstrapper
//!
//! Builds a [`RunningEnvironment`] from a [`Container`]:
//!
//! 1. Resolve the effective configuration from container parameters and the
//!    external document.
//! 2. Name the log sink after the resolved application id.
//! 3. Inherit the module context and derive the parent execution context from
//!    the container lifetime.
//! 4. Derive the root path from the context path (absent or empty means `/`).
//! 5. Subscribe the pipeline composer to [`APPLICATION_STARTING`].
//!
//! Memoization and sharing across hosting units live in
//! [`HostingUnit::environment`](crate::lifecycle::HostingUnit::environment).

use std::sync::{Arc, Weak};

use tracing::info;

use super::application::Application;
use super::entity::RunningEnvironment;
use super::error::EnvironmentError;
use super::events::APPLICATION_STARTING;
use super::monitor::{Monitor, SubscriberError};
use crate::attributes::AttributeStore;
use crate::config::{self, ConfigLoader};
use crate::framework::Container;
use crate::pipeline::engine_pipeline;

pub const DEFAULT_ROOT_PATH: &str = "/";

/// Builds the environment and registers the pipeline composer.
pub fn bootstrap(
    container: &dyn Container,
    loader: &dyn ConfigLoader,
) -> Result<Arc<RunningEnvironment>, EnvironmentError> {
    let resolved = config::resolve(
        container.context_parameters(),
        container.instance_parameters(),
        loader,
    )?;
    let root_path = container
        .context_path()
        .filter(|path| !path.is_empty())
        .unwrap_or_else(|| DEFAULT_ROOT_PATH.to_owned());
    let store = container.attributes();
    let parent_context = container.lifetime().child_token();

    let environment = Arc::new_cyclic(|weak: &Weak<RunningEnvironment>| {
        let monitor = Monitor::new();
        let weak = weak.clone();
        monitor.subscribe(APPLICATION_STARTING, move |application: &Application| {
            compose_on_start(&store, &weak, application)
        });

        RunningEnvironment::new(
            resolved.configuration,
            resolved.application_id,
            container.module_context(),
            root_path,
            parent_context,
            monitor,
        )
    });

    info!(
        application_id = %environment.identity(),
        root_path = %environment.root_path(),
        "Environment bootstrapped"
    );
    Ok(environment)
}

fn compose_on_start(
    store: &AttributeStore,
    environment: &Weak<RunningEnvironment>,
    application: &Application,
) -> Result<(), SubscriberError> {
    let Some(environment) = environment.upgrade() else {
        return Ok(());
    };
    let engine = engine_pipeline(store, &environment)?;
    application.compose(&engine);
    Ok(())
}
