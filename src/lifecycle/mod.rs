//! # Hosting Unit Lifecycle
//!
//! A host container loads and unloads adapter instances. Each instance is a
//! [`HostingUnit`], and this module drives it through its states:
//!
//! ```text
//! Unloaded --on_load--> Loading --> Running --on_unload--> StopPreparing --> Stopped
//! ```
//!
//! ## Loading
//!
//! [`HostingUnit::on_load`] resolves the environment (or reuses the one a
//! sibling unit already published in the container's attribute store), resolves
//! the engine pipeline and starts the application. During startup the engine
//! pipeline is merged into the application's own pipeline.
//!
//! A failure during load leaves the unit in `Loading`. The host should treat the
//! unit as unusable and discard it.
//!
//! ## Unloading
//!
//! [`HostingUnit::on_unload`] runs in a fixed order:
//!
//! 1. **Announce** - [`APPLICATION_STOP_PREPARING`](crate::environment::APPLICATION_STOP_PREPARING)
//!    is raised while the application still serves.
//! 2. **Teardown** - the unit's execution context is cancelled, spawned work is
//!    awaited and the container's own teardown runs.
//! 3. **Stop** - the environment stops the application.
//!
//! Subscribers that fail or panic in step 1 are logged; teardown always runs.
//!
//! ## Background Work
//!
//! Work started with [`HostingUnit::spawn`] is tied to the unit's context. The
//! context is a child of the host lifetime, so either an unload or the host
//! shutting down ends it.
//!
//! ## Observability
//!
//! See the [`tracing`] module for the logging setup used by the demo binary.

pub mod error;
pub mod hosting_unit;
pub mod state;
pub mod tracing;

pub use error::*;
pub use hosting_unit::*;
pub use state::*;
pub use tracing::*;
