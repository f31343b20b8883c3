#![doc(html_logo_url = "https://www.rust-lang.org/logos/rust-logo-128x128.png")]
#![doc(html_favicon_url = "https://www.rust-lang.org/favicon.ico")]
//! # Engine Host
//!
//! > **Run an engine application inside a host container.**
//!
//! This crate is the adapter between a host container (anything that loads and
//! unloads request-handling units) and an engine application. It resolves the
//! application's configuration, builds its running environment, merges the
//! adapter's processing stages into the application's pipeline and drives the
//! whole thing through the host's load and unload callbacks.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Bootstrap once, share everywhere
//!
//! A container may load several adapter instances for the same context. They
//! must all see one environment and one engine pipeline. Both are published in
//! a container-wide [`AttributeStore`](attributes::AttributeStore) and every
//! accessor is single-flight, so concurrent first calls construct exactly once.
//!
//! ### Lifecycle through events
//!
//! The environment owns a [`Monitor`](environment::Monitor). Startup, stop
//! preparation and shutdown are announced as typed events. The pipeline
//! composer is itself just a subscriber to
//! [`APPLICATION_STARTING`](environment::APPLICATION_STARTING).
//!
//! ## 🚀 Core Concepts
//!
//! ### Configuration Precedence
//! Container parameters prefixed with `io.engine.` win over the external
//! document. Instance-scoped values win over context-scoped ones. The
//! document is located by the `engine.config` key.
//!
//! ### Mocking: Testing without a Host
//! [`MockContainer`](framework::mock::MockContainer) implements the whole
//! container surface in memory. See the [`framework::mock`] module for a guide.
//!
//! ## 👩‍💻 Architecture Notes
//!
//! ### 1. Type-Safe Error Handling
//! Each layer defines its own error type (`ConfigError`, `EnvironmentError`,
//! `LifecycleError`, ...). `#[from]` conversions carry failures upward without
//! losing the source.
//!
//! ### 2. Cancellation
//! Every execution context is a [`CancellationToken`](tokio_util::sync::CancellationToken)
//! derived from the host lifetime. Cancelling the host cancels the environment,
//! the application and every task a hosting unit spawned.
//!
//! ### 3. Observability
//! We use `tracing` everywhere with structured fields. See the
//! [`lifecycle::tracing`] module for details.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Host Surface ([`framework`])
//! - **Role**: What the adapter needs from its container.
//! - **Key items**: [`Container`](framework::Container), [`ModuleContext`](framework::ModuleContext).
//!
//! ### 2. The Controller ([`lifecycle`])
//! - **Role**: One adapter instance and its load/unload lifecycle.
//! - **Key items**: [`HostingUnit`](lifecycle::HostingUnit), [`LifecycleState`](lifecycle::LifecycleState).
//!
//! ### 3. The Environment ([`environment`], [`config`])
//! - **Role**: Configuration resolution, bootstrap, events and the application.
//! - **Key items**: [`bootstrap`](environment::bootstrap), [`resolve`](config::resolve),
//!   [`RunningEnvironment`](environment::RunningEnvironment).
//!
//! ### 4. The Plumbing ([`pipeline`], [`attributes`], [`upgrade`])
//! - **Role**: Stage composition, container-wide sharing and protocol upgrades.
//! - **Key items**: [`ProcessingPipeline`](pipeline::ProcessingPipeline),
//!   [`select_upgrade`](upgrade::select_upgrade).
//!
//! ## 🚀 Quick Start
//!
//! ### Running the Demo
//!
//! ```bash
//! RUST_LOG=info cargo run
//! ```
//!
//! ### Running Tests
//!
//! ```bash
//! cargo test
//! ```

pub mod attributes;
pub mod config;
pub mod environment;
pub mod framework;
pub mod lifecycle;
pub mod pipeline;
pub mod upgrade;
