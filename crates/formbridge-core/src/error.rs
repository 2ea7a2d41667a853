//! Error types for FormBridge.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A required credential or setting is missing.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Settings or field-mapping shape is invalid.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Network, timeout or TLS failure talking to an external API.
    #[error("Transport error: {0}")]
    Transport(String),

    /// External API answered with a non-success status.
    #[error("Remote API error ({status}): {message}")]
    RemoteApi { status: u16, message: String },

    #[error("Integration not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(vec![message.into()])
    }

    /// Failures that may succeed if the caller retries later.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::RemoteApi { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Message suitable for returning to the settings/test-connection caller.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(errors) => errors.join("; "),
            Error::Configuration(msg) | Error::Transport(msg) => msg.clone(),
            Error::RemoteApi { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
