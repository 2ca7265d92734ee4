//! Error types for chatvault
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for chatvault operations
///
/// This enum encompasses all possible errors that can occur during
/// configuration loading, remote completion requests, and state
/// persistence.
#[derive(Error, Debug)]
pub enum ChatVaultError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-related errors (network unreachable, request construction,
    /// non-success HTTP status)
    #[error("Transport error: {0}")]
    Transport(String),

    /// A non-streamed completion response that is not the expected JSON
    /// envelope
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// State persistence errors (database operations, serialization of
    /// stored documents)
    #[error("Storage error: {0}")]
    Storage(String),

    /// A send was issued while the same session already had a response in
    /// flight
    #[error("Session {0} is busy with a response in flight")]
    SessionBusy(Uuid),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for chatvault operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
