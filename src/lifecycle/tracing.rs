//! # Observability & Tracing
//!
//! The [`setup_tracing`] function initializes structured logging with the `tracing` crate.
//! Call it once from the host process; library code only emits events.
//!
//! ## Configuration
//!
//! Output uses a compact format that hides the crate/module prefix (`with_target(false)`).
//! Levels come from the `RUST_LOG` environment variable.
//!
//! ## What Gets Traced
//!
//! - **Bootstrap**: Resolved application id, root path, installed modules
//! - **Lifecycle**: Every state transition of a hosting unit, including rejected ones
//! - **Events**: Failed or panicking monitor subscribers, with the event name
//! - **Upgrades**: Which strategy was selected and why the default was used
//!
//! ## Usage Examples
//!
//! ```bash
//! # Lifecycle milestones only
//! RUST_LOG=info cargo run
//!
//! # State transitions, stage merges, event delivery
//! RUST_LOG=debug cargo run
//!
//! # Payloads passing the engine stages
//! RUST_LOG=trace cargo run
//!
//! # Filter to one module
//! RUST_LOG=engine_host::environment=debug cargo run
//! ```
//!
//! ## Example Output
//!
//! **With `RUST_LOG=info`**:
//!
//! ```text
//! INFO Environment bootstrapped application_id="Application" root_path="/shop"
//! INFO application: Application started root_path="/shop"
//! INFO Hosting unit running application_id="Application" root_path="/shop"
//! INFO application: Application stopped
//! INFO Hosting unit stopped application_id="Application"
//! ```
//!
//! **With `RUST_LOG=debug`** each transition is visible:
//!
//! ```text
//! DEBUG Lifecycle transition from=unloaded to=loading
//! DEBUG Bootstrapping environment
//! DEBUG application: Application module installed module="greeting"
//! DEBUG Lifecycle transition from=loading to=running
//! DEBUG Lifecycle transition from=running to=stop-preparing
//! ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // Event messages carry the context; module paths are noise
        .compact()
        .init();
}
