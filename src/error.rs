//! Error types for the event router.

use serde_json::error::Category;
use thiserror::Error;

/// Errors produced while handling or encoding events.
///
/// The router itself never returns these to a publisher. They flow from
/// listeners to an event's failure handler, and from the payload helpers to
/// their callers.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("Handler failed: {0}")]
    Handler(String),

    #[error("Handler panicked: {0}")]
    Panicked(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl RouterError {
    /// Shorthand for a listener failure with a message.
    pub fn handler(message: impl Into<String>) -> Self {
        RouterError::Handler(message.into())
    }
}

impl From<serde_json::Error> for RouterError {
    fn from(e: serde_json::Error) -> Self {
        match e.classify() {
            Category::Syntax | Category::Data | Category::Eof => {
                RouterError::Deserialization(e.to_string())
            }
            Category::Io => RouterError::Serialization(e.to_string()),
        }
    }
}

impl From<rmp_serde::encode::Error> for RouterError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        RouterError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for RouterError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        RouterError::Deserialization(e.to_string())
    }
}

/// Result type for listeners and payload helpers.
pub type Result<T> = std::result::Result<T, RouterError>;
