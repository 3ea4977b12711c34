//! Error types for the streams client.

use crate::transport::TransportError;
use thiserror::Error;

/// Main error type for client operations.
///
/// Only local preconditions and failures to open a stream surface here.
/// Write outcomes are always a [`WriteResult`](crate::WriteResult) and
/// subscription outcomes are always delivered to the handler.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("No events to send")]
    EmptyBatch,

    #[error("Stream name must not be empty")]
    EmptyStreamName,

    #[error("Invalid event at index {index}: {reason}")]
    InvalidEvent { index: usize, reason: String },

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Subscription driver panicked")]
    DriverPanicked,
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Serialization(e.to_string())
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
