use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use once_cell::sync::OnceCell;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::LifecycleError;
use super::state::{LifecycleState, UnitStatus};
use crate::attributes::ENVIRONMENT_ATTRIBUTE_KEY;
use crate::config::{ConfigLoader, TomlConfigLoader};
use crate::environment::{bootstrap, EnvironmentError, RunningEnvironment, APPLICATION_STOP_PREPARING};
use crate::framework::Container;
use crate::pipeline::{self, ProcessingPipeline};
use crate::upgrade::{select_upgrade, UpgradeStrategy};

/// One adapter instance running inside a host container.
///
/// `HostingUnit` is responsible for:
/// - **Bootstrap**: Resolving the [`RunningEnvironment`] once, lazily, or reusing
///   one already published in the container's attribute store
/// - **Pipeline Wiring**: Resolving the engine pipeline merged into the
///   application when it starts
/// - **Upgrade Selection**: Probing the container once for a protocol-upgrade strategy
/// - **Lifecycle Management**: Driving load and unload callbacks from the host
///
/// # Concurrency
///
/// The environment, engine pipeline and upgrade strategy accessors are
/// single-flight: concurrent first callers block until the first construction
/// finishes, and construction never runs twice. Share a unit across threads
/// with `Arc<HostingUnit>`.
///
/// # Example
///
/// ```ignore
/// let unit = HostingUnit::new(Arc::new(container));
///
/// // Called by the host when the unit is loaded
/// unit.on_load()?;
///
/// let application = unit.environment()?.application()?;
/// let response = application.send(Payload::Text("hello".into()));
///
/// // Called by the host when the unit is unloaded
/// unit.on_unload().await?;
/// ```
pub struct HostingUnit {
    container: Arc<dyn Container>,
    loader: Arc<dyn ConfigLoader>,
    environment: OnceCell<Arc<RunningEnvironment>>,
    pipeline: OnceCell<Arc<ProcessingPipeline>>,
    upgrade: OnceCell<Arc<dyn UpgradeStrategy>>,
    state: Mutex<LifecycleState>,
    /// Whether this unit started the environment (and so must stop it).
    owns_start: AtomicBool,
    context: OnceCell<CancellationToken>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl HostingUnit {
    /// Creates a unit that reads the external configuration as TOML.
    pub fn new(container: Arc<dyn Container>) -> Self {
        Self::with_loader(container, Arc::new(TomlConfigLoader::new()))
    }

    pub fn with_loader(container: Arc<dyn Container>, loader: Arc<dyn ConfigLoader>) -> Self {
        Self {
            container,
            loader,
            environment: OnceCell::new(),
            pipeline: OnceCell::new(),
            upgrade: OnceCell::new(),
            state: Mutex::new(LifecycleState::Unloaded),
            owns_start: AtomicBool::new(false),
            context: OnceCell::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn container(&self) -> &Arc<dyn Container> {
        &self.container
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The running environment, bootstrapped on first access.
    ///
    /// If another unit in the same container already published an environment
    /// under [`ENVIRONMENT_ATTRIBUTE_KEY`], that instance is returned and
    /// configuration is not resolved again.
    pub fn environment(&self) -> Result<Arc<RunningEnvironment>, EnvironmentError> {
        self.environment
            .get_or_try_init(|| {
                self.container
                    .attributes()
                    .get_or_try_create(ENVIRONMENT_ATTRIBUTE_KEY, || {
                        debug!("Bootstrapping environment");
                        bootstrap(self.container.as_ref(), self.loader.as_ref())
                    })
            })
            .cloned()
    }

    /// The adapter's engine pipeline, shared through the attribute store.
    pub fn engine_pipeline(&self) -> Result<Arc<ProcessingPipeline>, EnvironmentError> {
        self.pipeline
            .get_or_try_init(|| {
                let environment = self.environment()?;
                Ok(pipeline::engine_pipeline(
                    &self.container.attributes(),
                    &environment,
                )?)
            })
            .cloned()
    }

    /// The protocol-upgrade strategy for this container, chosen once.
    pub fn upgrade_strategy(&self) -> Arc<dyn UpgradeStrategy> {
        let strategy = self.upgrade.get_or_init(|| {
            select_upgrade(
                self.container.server_identity().as_deref(),
                &self.container.module_context(),
            )
        });
        Arc::clone(strategy)
    }

    /// The unit's execution context, available once loaded.
    ///
    /// Derived from the environment's parent context, so cancelling the host
    /// lifetime cancels it too.
    pub fn context(&self) -> Option<CancellationToken> {
        self.context.get().cloned()
    }

    /// Called by the host when loading the unit.
    ///
    /// Bootstraps and starts the environment. Calling it twice is an error. If
    /// bootstrap or startup fails the unit stays in [`LifecycleState::Loading`].
    ///
    /// When a sibling unit is starting the shared environment, this call waits
    /// for that start to finish and reports `Running` only if it succeeded.
    pub fn on_load(&self) -> Result<(), LifecycleError> {
        self.transition("load", LifecycleState::Unloaded, LifecycleState::Loading)?;

        let environment = self.environment()?;
        self.engine_pipeline()?;
        match environment.start() {
            Ok(_) => self.owns_start.store(true, Ordering::Release),
            // Only returned once a sibling's start has published the application
            Err(EnvironmentError::AlreadyStarted) => {
                debug!("Environment already started by another unit");
            }
            Err(err) => return Err(err.into()),
        }

        let _ = self.context.set(environment.parent_context().child_token());
        self.set_state(LifecycleState::Running);
        info!(
            application_id = %environment.identity(),
            root_path = %environment.root_path(),
            "Hosting unit running"
        );
        Ok(())
    }

    /// Called by the host when unloading the unit.
    ///
    /// Announces [`APPLICATION_STOP_PREPARING`], tears down this unit's work and
    /// the container side, then stops the environment. Subscriber failures
    /// are logged and never prevent teardown.
    pub async fn on_unload(&self) -> Result<(), LifecycleError> {
        self.transition("unload", LifecycleState::Running, LifecycleState::StopPreparing)?;

        let environment = self.environment()?;
        let owner = self.owns_start.load(Ordering::Acquire);
        if owner {
            if let Err(err) = environment
                .monitor()
                .raise(APPLICATION_STOP_PREPARING, &*environment)
            {
                warn!(error = %err, "Stop-preparing subscribers failed; continuing teardown");
            }
        }

        self.teardown().await;

        if owner {
            environment.stop();
        }
        self.set_state(LifecycleState::Stopped);
        info!(application_id = %environment.identity(), "Hosting unit stopped");
        Ok(())
    }

    /// Runs `task` until it completes or the unit's context is cancelled.
    ///
    /// Must be called from within a Tokio runtime while the unit is running.
    pub fn spawn<F>(&self, task: F) -> Result<(), LifecycleError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let state = self.state();
        let Some(context) = self.context().filter(|_| state == LifecycleState::Running) else {
            return Err(LifecycleError::InvalidTransition {
                operation: "spawn work on",
                state,
            });
        };

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = context.cancelled() => debug!("Hosting task cancelled"),
                _ = task => {}
            }
        });

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
        Ok(())
    }

    pub fn status(&self) -> UnitStatus {
        let environment = self.environment.get();
        UnitStatus {
            state: self.state(),
            application_id: environment.map(|env| env.identity().to_owned()),
            root_path: environment.map(|env| env.root_path().to_owned()),
            upgrade: self.upgrade.get().map(|strategy| strategy.kind()),
        }
    }

    /// Cancels in-flight work, waits for it, then runs the container teardown.
    async fn teardown(&self) {
        if let Some(context) = self.context.get() {
            context.cancel();
        }

        let handles = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        for handle in handles {
            // If the task panicked, this will return an Err
            if let Err(e) = handle.await {
                warn!(error = %e, "Hosting task failed");
            }
        }

        self.container.teardown();
    }

    fn transition(
        &self,
        operation: &'static str,
        from: LifecycleState,
        to: LifecycleState,
    ) -> Result<(), LifecycleError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != from {
            warn!(operation, state = %*state, "Invalid lifecycle transition");
            return Err(LifecycleError::InvalidTransition {
                operation,
                state: *state,
            });
        }
        debug!(%from, %to, "Lifecycle transition");
        *state = to;
        Ok(())
    }

    fn set_state(&self, to: LifecycleState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(from = %*state, %to, "Lifecycle transition");
        *state = to;
    }
}
