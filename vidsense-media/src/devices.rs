//! Video input device catalog
//!
//! Enumeration yields a [`DeviceSnapshot`]: a lazy, finite iterator over the video
//! inputs visible at call time. It cannot be restarted; a new enumeration produces a new
//! snapshot, and the catalog always replaces its whole list from it.

use crate::error::MediaResult;
use crate::platform::{DeviceKind, MediaDeviceInfo, MediaDevices};
use serde::{Deserialize, Serialize};
use std::iter::FusedIterator;
use tracing::debug;

/// A selectable video input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Opaque platform identifier
    pub id: String,
    /// Label shown to the user
    pub label: String,
    /// Position among the enumerated video inputs
    pub index: usize,
}

impl DeviceDescriptor {
    fn from_info(info: MediaDeviceInfo, index: usize) -> Self {
        let label = if info.label.trim().is_empty() {
            format!("Camera {}", index + 1)
        } else {
            info.label
        };
        Self {
            id: info.device_id,
            label,
            index,
        }
    }
}

/// Video inputs visible at enumeration time
#[derive(Debug)]
pub struct DeviceSnapshot {
    raw: std::vec::IntoIter<MediaDeviceInfo>,
    next_index: usize,
}

impl DeviceSnapshot {
    /// Wrap a raw platform device list
    pub fn new(raw: Vec<MediaDeviceInfo>) -> Self {
        Self {
            raw: raw.into_iter(),
            next_index: 0,
        }
    }
}

impl Iterator for DeviceSnapshot {
    type Item = DeviceDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        for info in self.raw.by_ref() {
            if info.kind != DeviceKind::VideoInput {
                continue;
            }
            let descriptor = DeviceDescriptor::from_info(info, self.next_index);
            self.next_index += 1;
            return Some(descriptor);
        }
        None
    }
}

impl FusedIterator for DeviceSnapshot {}

/// Enumerate the video inputs currently visible to the page
pub async fn enumerate(platform: &dyn MediaDevices) -> MediaResult<DeviceSnapshot> {
    let raw = platform.enumerate_devices().await?;
    debug!("Enumerated {} media devices", raw.len());
    Ok(DeviceSnapshot::new(raw))
}

/// Device list shown to the user
#[derive(Debug, Default, Clone)]
pub struct DeviceCatalog {
    devices: Vec<DeviceDescriptor>,
}

impl DeviceCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole list with a fresh snapshot
    pub fn replace(&mut self, snapshot: DeviceSnapshot) -> &[DeviceDescriptor] {
        self.devices = snapshot.collect();
        &self.devices
    }

    /// Clear the list, e.g. after a failed enumeration
    pub fn clear(&mut self) {
        self.devices.clear();
    }

    /// Current list
    pub fn devices(&self) -> &[DeviceDescriptor] {
        &self.devices
    }

    /// Look up a device by identifier
    pub fn get(&self, id: &str) -> Option<&DeviceDescriptor> {
        self.devices.iter().find(|d| d.id == id)
    }

    /// First device, the default selection after a refresh
    pub fn first(&self) -> Option<&DeviceDescriptor> {
        self.devices.first()
    }

    /// Number of devices
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
