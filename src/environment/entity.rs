//! # Running Environment
//!
//! The [`RunningEnvironment`] is everything the application needs from its
//! host: effective configuration, identity, log sink, module context, root
//! path, parent execution context and the lifecycle [`Monitor`].
//!
//! One environment exists per hosting unit (or per container, when units share
//! it through the attribute store). It owns the running [`Application`] between
//! [`start`](RunningEnvironment::start) and [`stop`](RunningEnvironment::stop).

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Span};

use super::application::Application;
use super::error::EnvironmentError;
use super::events::{APPLICATION_STARTED, APPLICATION_STARTING, APPLICATION_STOPPED, APPLICATION_STOPPING};
use super::monitor::{panic_message, Monitor};
use crate::config::{Configuration, APPLICATION_MODULES_KEY};
use crate::framework::ModuleContext;

/// A logging sink named after the application.
#[derive(Clone, Debug)]
pub struct LogSink {
    name: String,
    span: Span,
}

impl LogSink {
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        let span = info_span!("application", id = %name);
        Self { name, span }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Span to enter for work attributed to this application.
    pub fn span(&self) -> &Span {
        &self.span
    }
}

#[derive(Debug)]
pub struct RunningEnvironment {
    configuration: Configuration,
    log: LogSink,
    module_context: Arc<ModuleContext>,
    root_path: String,
    parent_context: CancellationToken,
    monitor: Monitor,
    /// Held for the whole of `start` and `stop`.
    transitions: Mutex<()>,
    application: RwLock<Option<Arc<Application>>>,
}

impl RunningEnvironment {
    /// Assembles an environment. The log sink is named after `identity`.
    pub fn new(
        configuration: Configuration,
        identity: impl Into<String>,
        module_context: Arc<ModuleContext>,
        root_path: impl Into<String>,
        parent_context: CancellationToken,
        monitor: Monitor,
    ) -> Self {
        Self {
            configuration,
            log: LogSink::named(identity),
            module_context,
            root_path: root_path.into(),
            parent_context,
            monitor,
            transitions: Mutex::new(()),
            application: RwLock::new(None),
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// The application id, also the name of the log sink.
    pub fn identity(&self) -> &str {
        self.log.name()
    }

    pub fn log(&self) -> &LogSink {
        &self.log
    }

    pub fn module_context(&self) -> &Arc<ModuleContext> {
        &self.module_context
    }

    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    /// Execution context inherited from the host.
    pub fn parent_context(&self) -> &CancellationToken {
        &self.parent_context
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    /// Whether an application is published. A start still in progress reads as `false`.
    pub fn is_started(&self) -> bool {
        self.application
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn application(&self) -> Result<Arc<Application>, EnvironmentError> {
        self.application
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(EnvironmentError::NotStarted)
    }

    /// Builds the application, installs its modules and announces it.
    ///
    /// Raises [`APPLICATION_STARTING`] then [`APPLICATION_STARTED`]. A caller
    /// that arrives while another start is in progress waits for it to finish.
    /// It gets [`EnvironmentError::AlreadyStarted`] if that start published an
    /// application, and otherwise attempts the start itself. If a module is
    /// missing or fails, or a starting subscriber fails, nothing is published.
    ///
    /// Event subscribers must not call `start` or `stop` on the same environment.
    pub fn start(&self) -> Result<Arc<Application>, EnvironmentError> {
        let _transition = self.transitions.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_started() {
            return Err(EnvironmentError::AlreadyStarted);
        }

        let _entered = self.log.span().enter();
        let application = self.launch()?;
        *self.application.write().unwrap_or_else(PoisonError::into_inner) =
            Some(Arc::clone(&application));
        if let Err(err) = self.monitor.raise(APPLICATION_STARTED, &*application) {
            warn!(error = %err, "Started subscribers failed");
        }
        info!(root_path = %self.root_path, "Application started");
        Ok(application)
    }

    fn launch(&self) -> Result<Arc<Application>, EnvironmentError> {
        let application = Arc::new(Application::new(
            self.identity(),
            self.parent_context.child_token(),
        ));

        for name in self.configuration.get_list(APPLICATION_MODULES_KEY) {
            let module = self
                .module_context
                .module(&name)
                .ok_or_else(|| EnvironmentError::ModuleNotFound(name.clone()))?;
            panic::catch_unwind(AssertUnwindSafe(|| module(application.as_ref()))).map_err(
                |panic| EnvironmentError::ModuleFailed {
                    name: name.clone(),
                    reason: panic_message(panic.as_ref()),
                },
            )?;
            debug!(module = %name, "Application module installed");
        }

        self.monitor.raise(APPLICATION_STARTING, &*application)?;
        Ok(application)
    }

    /// Stops the application. A no-op if it is not running.
    pub fn stop(&self) {
        let _transition = self.transitions.lock().unwrap_or_else(PoisonError::into_inner);
        let application = self
            .application
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(application) = application else {
            debug!("Stop requested but application is not running");
            return;
        };

        let _entered = self.log.span().enter();
        if let Err(err) = self.monitor.raise(APPLICATION_STOPPING, &*application) {
            warn!(error = %err, "Stopping subscribers failed");
        }
        application.context().cancel();
        drop(application);

        if let Err(err) = self.monitor.raise(APPLICATION_STOPPED, self) {
            warn!(error = %err, "Stopped subscribers failed");
        }
        info!("Application stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Stage;
    use std::sync::Mutex;

    fn environment(configuration: Configuration, modules: ModuleContext) -> RunningEnvironment {
        RunningEnvironment::new(
            configuration,
            "Test",
            Arc::new(modules),
            "/",
            CancellationToken::new(),
            Monitor::new(),
        )
    }

    #[test]
    fn test_start_installs_modules_before_starting_event() {
        let modules = ModuleContext::new("test").with_module("routes", |app: &Application| {
            app.intercept_receive(Stage::named("routes"));
        });
        let config = Configuration::from_pairs([(APPLICATION_MODULES_KEY, "routes")]);
        let env = environment(config, modules);

        let observed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&observed);
        env.monitor().subscribe(APPLICATION_STARTING, move |app: &Application| {
            let names = app.pipeline().receive().names().join(",");
            sink.lock().unwrap().push(names);
            Ok(())
        });

        let application = env.start().unwrap();

        assert_eq!(*observed.lock().unwrap(), vec!["routes"]);
        assert_eq!(application.id(), "Test");
        assert!(Arc::ptr_eq(&application, &env.application().unwrap()));
    }

    #[test]
    fn test_start_twice_fails() {
        let env = environment(Configuration::empty(), ModuleContext::default());
        env.start().unwrap();
        assert!(matches!(env.start(), Err(EnvironmentError::AlreadyStarted)));
    }

    #[test]
    fn test_missing_module_fails_start() {
        let config = Configuration::from_pairs([(APPLICATION_MODULES_KEY, "ghost")]);
        let env = environment(config, ModuleContext::default());

        let result = env.start();
        assert!(matches!(result, Err(EnvironmentError::ModuleNotFound(name)) if name == "ghost"));
        assert!(!env.is_started());
        assert!(matches!(env.application(), Err(EnvironmentError::NotStarted)));
    }

    #[test]
    fn test_panicking_module_fails_start() {
        let modules = ModuleContext::new("test").with_module("boom", |_: &Application| {
            panic!("module boom")
        });
        let config = Configuration::from_pairs([(APPLICATION_MODULES_KEY, "boom")]);
        let env = environment(config, modules);

        let result = env.start();
        assert!(matches!(
            result,
            Err(EnvironmentError::ModuleFailed { ref name, ref reason })
                if name == "boom" && reason == "module boom"
        ));
        assert!(!env.is_started());

        // The environment is not stuck; a later start runs the module again.
        assert!(matches!(env.start(), Err(EnvironmentError::ModuleFailed { .. })));
    }

    #[test]
    fn test_stop_cancels_application_context() {
        let parent = CancellationToken::new();
        let env = RunningEnvironment::new(
            Configuration::empty(),
            "Test",
            Arc::new(ModuleContext::default()),
            "/",
            parent.clone(),
            Monitor::new(),
        );
        let application = env.start().unwrap();

        env.stop();

        assert!(application.context().is_cancelled());
        assert!(!parent.is_cancelled());
        assert!(!env.is_started());
        // Second stop is a no-op.
        env.stop();
    }
}
