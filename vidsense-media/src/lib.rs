//! # vidsense Media
//!
//! Media-side components of the vidsense detection client: the platform capability
//! traits, the video input catalog, the camera permission gate and the detection
//! overlay renderer.

#![warn(clippy::all)]

pub mod devices;
pub mod error;
pub mod overlay;
pub mod permission;
pub mod platform;

// Re-export main types
pub use devices::{enumerate, DeviceCatalog, DeviceDescriptor, DeviceSnapshot};
pub use error::{MediaError, MediaResult};
pub use overlay::{
    project, DeviceClass, DrawingSurface, OverlayConfig, OverlayRenderer, OverlayStats,
    OverlayStyle, RenderOutcome,
};
pub use permission::{GateState, PermissionGate, PermissionOutcome};
pub use platform::{
    DeviceKind, MediaConstraints, MediaDeviceInfo, MediaDevices, MediaStream, MediaTrack,
    PermissionState, SurfaceSize, TrackKind, VideoConstraint, VideoElement, VideoSource,
};
