//! Audio backend error types

use thiserror::Error;

use crate::bridge::BridgeError;

/// Errors that can occur while bringing the backend up or down
#[derive(Error, Debug)]
pub enum AudioError {
    /// Bridge configuration or lifecycle failure
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// Could not open a client on the audio server
    #[error("Failed to open audio client: {0}")]
    Client(String),

    /// Port registration refused by the server
    #[error("Failed to register port '{port}': {reason}")]
    PortRegistration { port: String, reason: String },

    /// Client activation failed
    #[error("Failed to activate audio client: {0}")]
    Activation(String),

    /// Client deactivation failed
    #[error("Failed to deactivate audio client: {0}")]
    Deactivation(String),
}

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;
