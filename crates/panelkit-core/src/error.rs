//! Error types for controller construction.
//!
//! Only construction can fail. Once a controller exists, every gesture,
//! toggle and dispatch path is total over its state enums.

use crate::surface::ElementId;
use thiserror::Error;

/// Errors raised while building controllers or reading their configuration.
#[derive(Debug, Error)]
pub enum InteractionError {
    #[error("Required {0} element not found")]
    MissingElement(&'static str),
    #[error("Element {0} already has a bound controller")]
    AlreadyBound(ElementId),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Selector matched nothing: {0}")]
    UnknownSelector(String),
    #[error("Surface rejected operation: {0}")]
    Surface(String),
}

impl From<serde_json::Error> for InteractionError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

/// Result type for controller construction.
pub type InteractionResult<T> = Result<T, InteractionError>;
