//! The running environment: bootstrap, lifecycle events and the application.

pub mod application;
pub mod bootstrap;
pub mod entity;
pub mod error;
pub mod events;
pub mod monitor;

pub use application::Application;
pub use bootstrap::*;
pub use entity::{LogSink, RunningEnvironment};
pub use error::*;
pub use events::*;
pub use monitor::{EventDefinition, Monitor, MonitorError, SubscriberError, SubscriptionId};
