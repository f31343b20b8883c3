//! Container-wide shared attributes.

pub mod error;
pub mod store;

pub use error::*;
pub use store::*;
