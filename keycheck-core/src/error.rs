//! Error types for the key-check diagnostics

use thiserror::Error;

/// Workspace-wide error type
#[derive(Error, Debug)]
pub enum KeycheckError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl KeycheckError {
    pub fn network(msg: impl Into<String>) -> Self {
        KeycheckError::Network(msg.into())
    }

    pub fn websocket(msg: impl Into<String>) -> Self {
        KeycheckError::WebSocket(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        KeycheckError::Parse(msg.into())
    }

    pub fn credential(msg: impl Into<String>) -> Self {
        KeycheckError::Credential(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        KeycheckError::Config(msg.into())
    }
}

/// Result type alias for key-check operations
pub type KeycheckResult<T> = Result<T, KeycheckError>;
