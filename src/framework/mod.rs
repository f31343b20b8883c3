//! Host container abstractions.
//!
//! This module defines what a hosting unit consumes from the container it runs in.
//!
//! # Main Components
//!
//! - [`Container`] - The callback surface a host implements
//! - [`ModuleContext`] - Named extensions (application modules, upgrade strategies)
//!
//! # Testing
//!
//! See [`mock`] module for an in-memory container to drive hosting units in tests.

pub mod core;
pub mod mock;

// Re-export core types for convenience
pub use self::core::*;
