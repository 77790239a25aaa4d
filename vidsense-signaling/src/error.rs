//! Signaling channel errors

use std::time::Duration;
use thiserror::Error;
use vidsense_core::VidsenseError;

/// Errors raised by the signaling channel
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalingError {
    /// The relay could not be reached
    #[error("Failed to connect to {url}: {reason}")]
    Connect {
        /// Relay URL
        url: String,
        /// Reason for the failure
        reason: String,
    },

    /// The handshake did not finish in time
    #[error("Connecting to {url} timed out after {duration:?}")]
    ConnectTimeout {
        /// Relay URL
        url: String,
        /// Configured timeout
        duration: Duration,
    },

    /// The channel has been closed
    #[error("Signaling channel closed")]
    Closed,

    /// A message could not be encoded
    #[error("Failed to encode {kind} message: {reason}")]
    Encode {
        /// Wire event name
        kind: String,
        /// Serializer error
        reason: String,
    },
}

impl From<SignalingError> for VidsenseError {
    fn from(err: SignalingError) -> Self {
        match err {
            SignalingError::ConnectTimeout { url, duration } => VidsenseError::Timeout {
                operation: format!("connect to {}", url),
                duration,
            },
            other => VidsenseError::Transport {
                reason: other.to_string(),
            },
        }
    }
}
