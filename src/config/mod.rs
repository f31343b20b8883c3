//! Configuration resolution: container parameters layered over an external document.

pub mod entity;
pub mod error;
pub mod loader;
pub mod resolver;

pub use entity::Configuration;
pub use error::*;
pub use loader::{ConfigLoader, EmptyConfigLoader, TomlConfigLoader};
pub use resolver::*;
