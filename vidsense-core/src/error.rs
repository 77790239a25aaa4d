//! Error types for vidsense

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Main error type for vidsense operations
#[derive(Error, Debug)]
pub enum VidsenseError {
    /// Start was requested without a selected capture device
    #[error("No video device selected")]
    NoDeviceSelected,

    /// Camera permission was denied or the camera is unavailable
    #[error("Camera permission denied: {reason}")]
    PermissionDenied {
        /// Reason reported by the platform
        reason: String,
    },

    /// Local media acquisition failed
    #[error("Failed to acquire local media for device {device_id}: {reason}")]
    MediaAcquisition {
        /// Device the acquisition was constrained to
        device_id: String,
        /// Reason for acquisition failure
        reason: String,
    },

    /// Device enumeration failed
    #[error("Device enumeration failed: {reason}")]
    DeviceEnumeration {
        /// Reason for enumeration failure
        reason: String,
    },

    /// A signaling message arrived before the state it applies to exists
    #[error("Signaling message out of order: {message_kind} arrived with no peer connection")]
    SignalingOutOfOrder {
        /// Kind of the message that was dropped
        message_kind: String,
    },

    /// A signaling message arrived in a lifecycle state that cannot accept it
    #[error("Negotiation mismatch: {message_kind} expected state {expected}, got {actual}")]
    NegotiationMismatch {
        /// Kind of the message that was dropped
        message_kind: String,
        /// State the message requires
        expected: String,
        /// State the lifecycle was in
        actual: String,
    },

    /// SDP or ICE application failed
    #[error("Negotiation failed: {reason}")]
    Negotiation {
        /// Reason for negotiation failure
        reason: String,
    },

    /// Signaling channel error
    #[error("Transport error: {reason}")]
    Transport {
        /// Reason for transport error
        reason: String,
    },

    /// A teardown step failed
    #[error("Teardown of {resource} failed: {reason}")]
    Teardown {
        /// Resource being released
        resource: String,
        /// Reason for failure
        reason: String,
    },

    /// Invalid message format
    #[error("Invalid message format: {message}, error: {source}")]
    InvalidMessage {
        /// Invalid message content
        message: String,
        /// Parsing error
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Feature flag fetch failed
    #[error("Feature fetch from {url} failed: {reason}")]
    FeatureFetch {
        /// Endpoint that was queried
        url: String,
        /// Reason for failure
        reason: String,
    },

    /// Missing configuration error
    #[error("Missing required configuration: {field}")]
    MissingConfiguration {
        /// Missing configuration field
        field: String,
    },

    /// Invalid configuration error
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Error message
        message: String,
    },

    /// Operation timed out error
    #[error("Operation timed out: {operation} after {duration:?}")]
    Timeout {
        /// Operation that timed out
        operation: String,
        /// Duration after which timeout occurred
        duration: Duration,
    },
}

/// Error categories used to decide how an error is surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Caused by the user's input, reported inline
    UserInput,
    /// Camera permission denied or unavailable
    Permission,
    /// SDP/ICE failure or stale signaling
    Negotiation,
    /// Signaling channel failure
    Transport,
    /// Releasing tracks or closing connections failed
    ResourceTeardown,
    /// Invalid or missing configuration
    Configuration,
}

/// Severity tag of a user-visible log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Informational
    Info,
    /// Something was dropped or degraded
    Warning,
    /// An operation failed
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl VidsenseError {
    /// Get error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            VidsenseError::NoDeviceSelected => "NO_DEVICE_SELECTED",
            VidsenseError::PermissionDenied { .. } => "PERMISSION_DENIED",
            VidsenseError::MediaAcquisition { .. } => "MEDIA_ACQUISITION_FAILED",
            VidsenseError::DeviceEnumeration { .. } => "DEVICE_ENUMERATION_FAILED",
            VidsenseError::SignalingOutOfOrder { .. } => "SIGNALING_OUT_OF_ORDER",
            VidsenseError::NegotiationMismatch { .. } => "NEGOTIATION_MISMATCH",
            VidsenseError::Negotiation { .. } => "NEGOTIATION_FAILED",
            VidsenseError::Transport { .. } => "TRANSPORT_ERROR",
            VidsenseError::Teardown { .. } => "TEARDOWN_FAILED",
            VidsenseError::InvalidMessage { .. } => "INVALID_MESSAGE",
            VidsenseError::FeatureFetch { .. } => "FEATURE_FETCH_FAILED",
            VidsenseError::MissingConfiguration { .. } => "MISSING_CONFIGURATION",
            VidsenseError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION",
            VidsenseError::Timeout { .. } => "TIMEOUT",
        }
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            VidsenseError::NoDeviceSelected => ErrorCategory::UserInput,
            VidsenseError::PermissionDenied { .. }
            | VidsenseError::MediaAcquisition { .. }
            | VidsenseError::DeviceEnumeration { .. } => ErrorCategory::Permission,
            VidsenseError::SignalingOutOfOrder { .. }
            | VidsenseError::NegotiationMismatch { .. }
            | VidsenseError::Negotiation { .. }
            | VidsenseError::InvalidMessage { .. } => ErrorCategory::Negotiation,
            VidsenseError::Transport { .. }
            | VidsenseError::FeatureFetch { .. }
            | VidsenseError::Timeout { .. } => ErrorCategory::Transport,
            VidsenseError::Teardown { .. } => ErrorCategory::ResourceTeardown,
            VidsenseError::MissingConfiguration { .. }
            | VidsenseError::InvalidConfiguration { .. } => ErrorCategory::Configuration,
        }
    }

    /// Severity used when the error is reported to the user-visible log
    pub fn severity(&self) -> Severity {
        match self {
            // Candidates may legitimately race the offer
            VidsenseError::SignalingOutOfOrder { .. }
            | VidsenseError::NegotiationMismatch { .. }
            | VidsenseError::NoDeviceSelected
            | VidsenseError::FeatureFetch { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }
}
