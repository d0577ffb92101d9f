//! Error types for the resource pipe client
//!
//! Every failure is surfaced to the caller as-is. Nothing in the core
//! retries or reconnects; the caller decides what to do next.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the resource pipe client
#[derive(Error, Debug)]
pub enum Error {
    // === Connection Errors ===
    #[error("Timed out after {0} ms waiting for the channel. Is the host running?")]
    ConnectTimeout(u64),

    #[error("Failed to connect to channel: {0}")]
    ConnectError(#[source] io::Error),

    #[error("Session is already connected")]
    AlreadyConnected,

    #[error("Session is not connected. Call connect first")]
    NotConnected,

    #[error("Session is closed. Create a new session to reconnect")]
    SessionClosed,

    // === Request Errors ===
    #[error("Request timed out after {0} ms")]
    RequestTimeout(u64),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}
