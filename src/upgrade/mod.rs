//! Protocol-upgrade strategy selection.

pub mod error;
pub mod selector;
pub mod strategy;

pub use error::*;
pub use selector::*;
pub use strategy::*;
