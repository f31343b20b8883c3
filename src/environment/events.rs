//! Lifecycle events published on the environment's [`Monitor`](super::Monitor).

use super::application::Application;
use super::entity::RunningEnvironment;
use super::monitor::EventDefinition;

/// The application has been built and its modules installed. The adapter
/// merges its engine pipeline in response to this event.
pub const APPLICATION_STARTING: EventDefinition<Application> =
    EventDefinition::new("ApplicationStarting");

pub const APPLICATION_STARTED: EventDefinition<Application> =
    EventDefinition::new("ApplicationStarted");

/// The host is about to unload the unit. Raised before any teardown.
pub const APPLICATION_STOP_PREPARING: EventDefinition<RunningEnvironment> =
    EventDefinition::new("ApplicationStopPreparing");

pub const APPLICATION_STOPPING: EventDefinition<Application> =
    EventDefinition::new("ApplicationStopping");

pub const APPLICATION_STOPPED: EventDefinition<RunningEnvironment> =
    EventDefinition::new("ApplicationStopped");
