//! Error types for livecast core operations

use thiserror::Error;

/// Main error type for transport and session-level operations
#[derive(Error, Debug)]
pub enum LivecastError {
    /// The transport connection was torn down
    #[error("Transport disconnected: {reason}")]
    Disconnected {
        /// Reason reported by the transport
        reason: String,
    },

    /// The transport refused a capture attachment
    #[error("Attachment rejected by transport: {reason}")]
    AttachRejected {
        /// Reason reported by the transport
        reason: String,
    },

    /// Invalid configuration provided
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Error message
        message: String,
    },

    /// Missing configuration error
    #[error("Missing required configuration: {field}")]
    MissingConfiguration {
        /// Missing configuration field
        field: String,
    },
}

impl LivecastError {
    /// Check whether this error indicates a torn-down connection.
    ///
    /// Disconnection is not fatal to the session; reconnection policy
    /// belongs to the transport.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, LivecastError::Disconnected { .. })
    }
}
