//! Processing pipelines and their composition.
//!
//! - [`processing`]: the [`ProcessingPipeline`] data model and merge rule.
//! - [`composer`]: the adapter's default engine pipeline and how it is merged
//!   into the application's pipeline on startup.

pub mod composer;
pub mod processing;

pub use composer::*;
pub use processing::*;
