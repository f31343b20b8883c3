//! Error types for the shared attribute store.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AttributeError {
    /// The slot is populated with a value of another type.
    #[error("Attribute {key} does not hold a {expected}")]
    TypeMismatch { key: String, expected: &'static str },
}
