//! Client events for the UI layer

use crate::lifecycle::LifecycleState;
use crate::peer::IceConnectionState;
use tokio::sync::mpsc;
use vidsense_media::{DeviceDescriptor, SurfaceSize};

/// Events the client reports while it runs
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Detection mode was resolved at startup
    DetectionMode {
        /// Whether remote detection is used
        enabled: bool,
    },
    /// The lifecycle state changed
    StateChanged {
        /// New state
        state: LifecycleState,
    },
    /// The device list was rebuilt
    DevicesUpdated {
        /// Video inputs in platform order
        devices: Vec<DeviceDescriptor>,
    },
    /// A device was selected
    DeviceSelected {
        /// Selected device id
        device_id: String,
    },
    /// ICE state changed
    IceStateChanged {
        /// New state
        state: IceConnectionState,
    },
    /// A remote stream is being displayed
    RemoteStreamAttached {
        /// Stream identifier
        stream_id: String,
    },
    /// The local stream is being displayed without a peer connection
    LocalPreviewStarted {
        /// Stream identifier
        stream_id: String,
    },
    /// The overlay was repainted
    OverlayDrawn {
        /// Boxes painted
        boxes: usize,
    },
    /// The overlay surface was resized
    SurfaceResized {
        /// New size
        size: SurfaceSize,
    },
    /// The signaling channel dropped
    ChannelDisconnected {
        /// Reason reported by the channel
        reason: String,
    },
    /// The client loop ended
    Shutdown,
}

impl ClientEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            ClientEvent::DetectionMode { .. } => "detection_mode",
            ClientEvent::StateChanged { .. } => "state_changed",
            ClientEvent::DevicesUpdated { .. } => "devices_updated",
            ClientEvent::DeviceSelected { .. } => "device_selected",
            ClientEvent::IceStateChanged { .. } => "ice_state_changed",
            ClientEvent::RemoteStreamAttached { .. } => "remote_stream_attached",
            ClientEvent::LocalPreviewStarted { .. } => "local_preview_started",
            ClientEvent::OverlayDrawn { .. } => "overlay_drawn",
            ClientEvent::SurfaceResized { .. } => "surface_resized",
            ClientEvent::ChannelDisconnected { .. } => "channel_disconnected",
            ClientEvent::Shutdown => "shutdown",
        }
    }

    /// Check if this is a connection-related event
    pub fn is_connection_event(&self) -> bool {
        matches!(
            self,
            ClientEvent::StateChanged { .. }
                | ClientEvent::IceStateChanged { .. }
                | ClientEvent::RemoteStreamAttached { .. }
                | ClientEvent::LocalPreviewStarted { .. }
                | ClientEvent::ChannelDisconnected { .. }
        )
    }

    /// Check if this is a device-related event
    pub fn is_device_event(&self) -> bool {
        matches!(
            self,
            ClientEvent::DevicesUpdated { .. } | ClientEvent::DeviceSelected { .. }
        )
    }
}

/// Stream of client events for async iteration
#[derive(Debug)]
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<ClientEvent>,
}

impl EventStream {
    /// Create a new event stream with a receiver
    pub fn new(receiver: mpsc::UnboundedReceiver<ClientEvent>) -> Self {
        Self { receiver }
    }

    /// Get the next event from the stream
    pub async fn next(&mut self) -> Option<ClientEvent> {
        self.receiver.recv().await
    }

    /// Try to get the next event without blocking
    pub fn try_next(&mut self) -> Result<Option<ClientEvent>, mpsc::error::TryRecvError> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => {
                Err(mpsc::error::TryRecvError::Disconnected)
            }
        }
    }

    /// Close the event stream
    pub fn close(&mut self) {
        self.receiver.close();
    }
}
