use std::path::PathBuf;

use crate::text::Field;

/// A user-supplied value was rejected before any state was touched.
///
/// The `Display` text is what the relay sends back in a `validation-error`
/// message, so it is written for end users.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: Field },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: Field, max: usize },

    #[error("you are not a member of room '{room}'")]
    NotInRoom { room: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TavernError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] serde_json::Error),

    #[error("network error: {0}")]
    Network(String),

    #[error("negotiation failed: {0}")]
    Negotiation(String),

    #[error("media unavailable: {0}")]
    Media(String),

    #[error("{0}")]
    Other(String),
}
