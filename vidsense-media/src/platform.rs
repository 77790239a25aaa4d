//! Platform media capabilities
//!
//! The client never talks to camera hardware directly. Everything it needs from the
//! platform (device enumeration, permission state, local media acquisition, the video
//! element the stream is shown in) is reached through the traits below, so a browser
//! binding and the test fakes plug in the same way.

use crate::error::MediaError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Kind of a media device as reported by enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Camera or other video source
    VideoInput,
    /// Microphone
    AudioInput,
    /// Speaker or headset
    AudioOutput,
}

/// Raw device record returned by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDeviceInfo {
    /// Opaque platform identifier
    pub device_id: String,
    /// Human readable label, empty until permission is granted on some platforms
    pub label: String,
    /// Device kind
    pub kind: DeviceKind,
}

impl MediaDeviceInfo {
    /// Convenience constructor for a video input
    pub fn video(device_id: &str, label: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            label: label.to_string(),
            kind: DeviceKind::VideoInput,
        }
    }
}

/// Camera permission state as reported by the platform's permission query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    /// Permission already granted
    Granted,
    /// Not decided yet; the platform will prompt on acquisition
    Prompt,
    /// Permission explicitly denied
    Denied,
}

/// Video part of a media request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoConstraint {
    /// Any camera the platform picks
    Any,
    /// Exactly this device
    Exact(String),
}

/// Constraints passed to local media acquisition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaConstraints {
    /// Video constraint
    pub video: VideoConstraint,
    /// Whether audio is requested
    pub audio: bool,
}

impl MediaConstraints {
    /// Video only, constrained to one device
    pub fn exact_device(device_id: &str) -> Self {
        Self {
            video: VideoConstraint::Exact(device_id.to_string()),
            audio: false,
        }
    }

    /// Video only, any device; used for permission probes
    pub fn any_video() -> Self {
        Self {
            video: VideoConstraint::Any,
            audio: false,
        }
    }
}

/// Kind of a media track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    /// Video track
    Video,
    /// Audio track
    Audio,
}

/// A live platform media track
pub trait MediaTrack: Send + Sync + fmt::Debug {
    /// Track identifier
    fn id(&self) -> String;

    /// Track kind
    fn kind(&self) -> TrackKind;

    /// Stop the track and release the underlying hardware
    fn stop(&self) -> Result<(), MediaError>;

    /// Whether the track still holds its source
    fn is_live(&self) -> bool;
}

/// A set of tracks acquired together
#[derive(Debug, Clone)]
pub struct MediaStream {
    id: String,
    tracks: Vec<Arc<dyn MediaTrack>>,
}

impl MediaStream {
    /// Create a stream from its tracks
    pub fn new(id: impl Into<String>, tracks: Vec<Arc<dyn MediaTrack>>) -> Self {
        Self {
            id: id.into(),
            tracks,
        }
    }

    /// Stream identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Tracks of the stream
    pub fn tracks(&self) -> &[Arc<dyn MediaTrack>] {
        &self.tracks
    }

    /// Whether any track is still live
    pub fn is_live(&self) -> bool {
        self.tracks.iter().any(|t| t.is_live())
    }

    /// Stop every track.
    ///
    /// A failing track never prevents the remaining tracks from being stopped; every
    /// failure is returned to the caller for reporting.
    pub fn stop_all(&self) -> Vec<MediaError> {
        let mut failures = Vec::new();
        for track in &self.tracks {
            if let Err(e) = track.stop() {
                warn!("Failed to stop track {} of stream {}: {}", track.id(), self.id, e);
                failures.push(e);
            }
        }
        failures
    }
}

/// Platform media device capabilities
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// List every media device visible to the page
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, MediaError>;

    /// Query the camera permission state without prompting
    async fn query_permission(&self) -> Result<PermissionState, MediaError>;

    /// Acquire a local media stream
    async fn get_user_media(&self, constraints: MediaConstraints)
        -> Result<MediaStream, MediaError>;

    /// Whether device labels stay hidden until a real acquisition has happened.
    ///
    /// On such platforms a permission query alone is not enough and the permission gate
    /// must acquire and immediately release a stream before enumerating.
    fn requires_probe(&self) -> bool {
        false
    }
}

/// Layout size of the displayed video, in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SurfaceSize {
    /// Width
    pub width: u32,
    /// Height
    pub height: u32,
}

impl SurfaceSize {
    /// Create a new size
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether nothing can be drawn on a surface of this size
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for SurfaceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// What the video element is showing
#[derive(Debug, Clone)]
pub enum VideoSource {
    /// The local camera, in local preview mode
    Local(MediaStream),
    /// The stream returned by the remote endpoint
    Remote(MediaStream),
}

impl VideoSource {
    /// Identifier of the underlying stream
    pub fn stream_id(&self) -> &str {
        match self {
            VideoSource::Local(stream) | VideoSource::Remote(stream) => stream.id(),
        }
    }
}

/// The video element the client displays into
pub trait VideoElement: Send + Sync {
    /// Replace the displayed source; `None` clears the element
    fn set_source(&self, source: Option<VideoSource>);

    /// Identifier of the stream currently displayed
    fn current_stream_id(&self) -> Option<String>;

    /// Current layout (displayed) size of the element, not its decode resolution
    fn layout_size(&self) -> SurfaceSize;
}
