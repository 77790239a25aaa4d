//! Media error types and handling
//!
//! Errors raised by the platform media capabilities (device enumeration, permission
//! queries, local media acquisition, track teardown) and by the overlay drawing surface.

use thiserror::Error;
use vidsense_core::VidsenseError;

/// Main error type for media operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MediaError {
    /// Device enumeration failed
    #[error("Device enumeration failed: {reason}")]
    DeviceEnumerationFailed {
        /// Failure reason
        reason: String,
    },

    /// Permission denied error
    #[error("Permission denied: {operation}")]
    PermissionDenied {
        /// Operation that was denied
        operation: String,
    },

    /// Local media acquisition failed
    #[error("Media acquisition failed: {reason}")]
    AcquisitionFailed {
        /// Failure reason
        reason: String,
    },

    /// Stopping a track failed
    #[error("Failed to stop track {track_id}: {reason}")]
    TrackStopFailed {
        /// Track identifier
        track_id: String,
        /// Failure reason
        reason: String,
    },

    /// Drawing surface operation failed
    #[error("Surface error: {message}")]
    Surface {
        /// Error message
        message: String,
    },

    /// Invalid configuration provided
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Error message
        message: String,
    },

    /// The platform lacks the capability asked for
    #[error("Unsupported platform: {platform}")]
    UnsupportedPlatform {
        /// Platform name
        platform: String,
    },
}

/// Result type alias for media operations
pub type MediaResult<T> = Result<T, MediaError>;

impl From<MediaError> for VidsenseError {
    fn from(error: MediaError) -> Self {
        match error {
            MediaError::DeviceEnumerationFailed { reason } => {
                VidsenseError::DeviceEnumeration { reason }
            }
            MediaError::PermissionDenied { operation } => VidsenseError::PermissionDenied {
                reason: operation,
            },
            MediaError::AcquisitionFailed { reason } => VidsenseError::MediaAcquisition {
                device_id: String::new(),
                reason,
            },
            MediaError::TrackStopFailed { track_id, reason } => VidsenseError::Teardown {
                resource: format!("track {}", track_id),
                reason,
            },
            MediaError::Surface { message } => VidsenseError::Teardown {
                resource: "overlay surface".to_string(),
                reason: message,
            },
            MediaError::InvalidConfiguration { message } => {
                VidsenseError::InvalidConfiguration { message }
            }
            MediaError::UnsupportedPlatform { platform } => VidsenseError::PermissionDenied {
                reason: format!("unsupported platform {}", platform),
            },
        }
    }
}
