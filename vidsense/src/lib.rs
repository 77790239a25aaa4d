//! # vidsense - Real-Time Video Detection Client
//!
//! vidsense streams a local camera to a remote object detector over a peer connection
//! and paints the detector's bounding boxes on an overlay stacked above the video.
//! When the server does not offer detection, the camera is shown as a local preview.
//!
//! ## Key Features
//!
//! - **Single-owner lifecycle**: start, stop and device switches never leak a camera
//!   or a peer connection, even with operations still in flight
//! - **Session isolation**: detections addressed to other clients on the relay are ignored
//! - **Platform agnostic**: camera, peer connection and canvas are reached through traits
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vidsense::{ClientBuilder, Platform, Vidsense};
//!
//! # async fn example(platform: Platform) -> Result<(), vidsense::VidsenseError> {
//! let config = ClientBuilder::new()
//!     .signaling_server("ws://localhost:8080/ws")
//!     .features_endpoint("http://localhost:8080/config")
//!     .build()?;
//!
//! let vidsense = Vidsense::init_with(config)?;
//! let (client, handle, mut events) = vidsense.connect(platform).await?;
//! tokio::spawn(client.run());
//!
//! handle.start()?;
//! while let Some(event) = events.next().await {
//!     println!("Client event: {:?}", event);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export core types for easy access
pub use vidsense_core::{
    BoundingBox, Detection, DetectionEvent, ErrorCategory, SessionId, SessionToken, Severity,
    VidsenseError,
};

pub use vidsense_media::{
    DeviceClass, DeviceDescriptor, DrawingSurface, MediaConstraints, MediaDeviceInfo,
    MediaDevices, MediaError, MediaStream, MediaTrack, OverlayStyle, PermissionState,
    SurfaceSize, TrackKind, VideoElement, VideoSource,
};

pub use vidsense_signaling::{
    IceCandidate, InboundMessage, OutboundMessage, SessionDescription, SignalingChannel,
};

pub use vidsense_diagnostics::{LogEntry, LogRecord, LogSink};

// Public API modules
pub mod client;
pub mod config;
pub mod event;
pub mod features;
pub mod lifecycle;
pub mod peer;

// Re-export main API types
pub use client::{Client, ClientHandle, Command, Platform};
pub use config::{ClientBuilder, ClientConfig};
pub use event::{ClientEvent, EventStream};
pub use features::{FeatureFlags, FeatureSource, HttpFeatureSource, StaticFeatures};
pub use lifecycle::{ConnectionLifecycle, LifecycleConfig, LifecycleEvent, LifecycleState};
pub use peer::{
    IceConnectionState, PeerConfig, PeerConnection, PeerConnectionFactory, PeerEvent,
    PeerObserver,
};

use tracing::info;

/// Main entry point for vidsense
#[derive(Debug, Clone)]
pub struct Vidsense {
    config: ClientConfig,
    log: LogSink,
}

impl Vidsense {
    /// Initialize with default settings
    pub fn init() -> Result<Self, VidsenseError> {
        Self::init_with(ClientConfig::default())
    }

    /// Initialize with a custom configuration. Installs the `tracing` subscriber
    /// unless one is already present.
    pub fn init_with(config: ClientConfig) -> Result<Self, VidsenseError> {
        config.validate()?;
        vidsense_diagnostics::init_logging(&config.log_filter)?;
        Ok(Self {
            config,
            log: LogSink::disabled(),
        })
    }

    /// Deliver the user-visible log to this sink
    pub fn with_log_sink(mut self, log: LogSink) -> Self {
        self.log = log;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Feature source for the configured endpoint; local preview without one
    pub fn feature_source(&self) -> Box<dyn FeatureSource> {
        match &self.config.features_url {
            Some(url) => Box::new(HttpFeatureSource::new(url)),
            None => Box::new(StaticFeatures::local_preview()),
        }
    }

    async fn open_channel(&self) -> Result<SignalingChannel, VidsenseError> {
        let url = self.config.signaling_url.as_deref().ok_or_else(|| {
            VidsenseError::MissingConfiguration {
                field: "signaling_url".to_string(),
            }
        })?;
        let channel = SignalingChannel::connect(url, self.config.connect_timeout).await?;
        info!("Registered on relay as {}", channel.session_id());
        Ok(channel)
    }

    /// Resolve the detection mode from the configured endpoint and build a client
    pub async fn connect(
        &self,
        platform: Platform,
    ) -> Result<(Client, ClientHandle, EventStream), VidsenseError> {
        let source = self.feature_source();
        self.connect_with(source.as_ref(), platform).await
    }

    /// Build a client using an explicit feature source.
    ///
    /// With detection enabled the signaling channel is opened here. When the relay is
    /// unreachable, or no relay is configured, the error is logged and the client
    /// falls back to local preview.
    pub async fn connect_with(
        &self,
        source: &dyn FeatureSource,
        platform: Platform,
    ) -> Result<(Client, ClientHandle, EventStream), VidsenseError> {
        let detection_enabled = features::resolve_detection(source, &self.log).await;

        let channel = if detection_enabled {
            match self.open_channel().await {
                Ok(channel) => Some(channel),
                Err(e) => {
                    self.log.report(&e);
                    None
                }
            }
        } else {
            None
        };

        Ok(Client::new(
            &self.config,
            platform,
            channel,
            detection_enabled,
            self.log.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.ice_servers, vec![crate::config::DEFAULT_ICE_SERVER]);
        assert_eq!(config.grace_period, Some(Duration::from_secs(2)));
        assert_eq!(config.display_threshold, 0.45);
        assert_eq!(config.device_class, DeviceClass::Full);
        assert_eq!(config.log_filter, "info");
        assert_ok!(config.validate());
    }

    #[test]
    fn test_builder() {
        let config = assert_ok!(ClientBuilder::new()
            .signaling_server("ws://relay/ws")
            .features_endpoint("http://relay/config")
            .grace_period(None)
            .display_threshold(0.6)
            .compact_device()
            .ice_server("stun:a")
            .ice_server("turn:b")
            .build());

        assert_eq!(config.signaling_url.as_deref(), Some("ws://relay/ws"));
        assert_eq!(config.features_url.as_deref(), Some("http://relay/config"));
        assert_eq!(config.grace_period, None);
        assert_eq!(config.device_class, DeviceClass::Compact);
        assert_eq!(config.ice_servers, vec!["stun:a", "turn:b"]);
    }

    #[test]
    fn test_builder_rejects_bad_threshold() {
        let err = assert_err!(ClientBuilder::new().display_threshold(1.2).build());
        assert_eq!(err.error_code(), "INVALID_CONFIGURATION");
    }

    #[test]
    fn test_config_from_json() {
        let config = assert_ok!(ClientConfig::from_json(
            r#"{"signaling_url": "ws://relay/ws", "display_threshold": 0.3,
                "device_class": "compact", "grace_period": null}"#
        ));
        assert_eq!(config.signaling_url.as_deref(), Some("ws://relay/ws"));
        assert_eq!(config.display_threshold, 0.3);
        assert_eq!(config.device_class, DeviceClass::Compact);
        assert_eq!(config.grace_period, None);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));

        assert_err!(ClientConfig::from_json(r#"{"display_threshold": -1}"#));
        assert_err!(ClientConfig::from_json("not json"));
    }

    #[test]
    fn test_feature_flags() {
        let flags = |raw: &str| serde_json::from_str::<FeatureFlags>(raw).unwrap();

        assert!(!flags(r#"{"framework": "flask"}"#).detection_enabled());
        assert!(flags(r#"{"framework": "fastapi"}"#).detection_enabled());
        assert!(flags(r#"{"framework": "aiohttp"}"#).detection_enabled());
        assert!(!flags(r#"{"framework": "fastapi", "object_detection": false}"#)
            .detection_enabled());
        assert!(flags(r#"{"framework": "flask", "object_detection": true}"#).detection_enabled());
        assert!(!flags("{}").detection_enabled());
    }

    #[tokio::test]
    async fn test_unreachable_feature_endpoint_means_preview() {
        let (log, mut records) = LogSink::channel();
        let source = HttpFeatureSource::new("http://127.0.0.1:9/config");

        assert!(!features::resolve_detection(&source, &log).await);
        match records.try_recv().unwrap() {
            LogRecord::Entry(entry) => assert_eq!(entry.severity, Severity::Warning),
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_client_event_types() {
        let event = ClientEvent::StateChanged {
            state: LifecycleState::Streaming,
        };
        assert_eq!(event.event_type(), "state_changed");
        assert!(event.is_connection_event());
        assert!(!event.is_device_event());
        assert!(ClientEvent::DevicesUpdated { devices: vec![] }.is_device_event());
    }
}
