//! Configuration types and defaults

use serde::Deserialize;
use std::time::Duration;
use vidsense_core::VidsenseError;
use vidsense_media::{DeviceClass, OverlayConfig};

/// STUN server used when none is configured
pub const DEFAULT_ICE_SERVER: &str = "stun:stun.l.google.com:19302";

/// Client configuration
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```json
/// { "signaling_url": "ws://localhost:8080/ws", "display_threshold": 0.5 }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Relay WebSocket URL; required once detection is enabled
    pub signaling_url: Option<String>,
    /// Feature endpoint URL; without one the client runs in local preview
    pub features_url: Option<String>,
    /// ICE server URLs handed to every peer connection
    pub ice_servers: Vec<String>,
    /// Delay before detections are drawn after a start
    pub grace_period: Option<Duration>,
    /// Minimum confidence a detection needs to be drawn
    pub display_threshold: f32,
    /// Device class hint for overlay styling
    pub device_class: DeviceClass,
    /// Fallback `tracing` filter when `RUST_LOG` is unset
    pub log_filter: String,
    /// Signaling connect timeout
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            signaling_url: None,
            features_url: None,
            ice_servers: vec![DEFAULT_ICE_SERVER.to_string()],
            grace_period: Some(Duration::from_secs(2)),
            display_threshold: 0.45,
            device_class: DeviceClass::Full,
            log_filter: "info".to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a JSON document
    pub fn from_json(raw: &str) -> Result<Self, VidsenseError> {
        let config: ClientConfig =
            serde_json::from_str(raw).map_err(|e| VidsenseError::InvalidConfiguration {
                message: format!("invalid client configuration: {}", e),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), VidsenseError> {
        self.overlay_config()
            .validate()
            .map_err(|e| VidsenseError::InvalidConfiguration {
                message: e.to_string(),
            })?;

        if self.connect_timeout.is_zero() {
            return Err(VidsenseError::InvalidConfiguration {
                message: "connect timeout must be non-zero".to_string(),
            });
        }
        if self.grace_period.is_some_and(|d| d.is_zero()) {
            return Err(VidsenseError::InvalidConfiguration {
                message: "grace period must be non-zero; use None to disable it".to_string(),
            });
        }
        Ok(())
    }

    /// Overlay settings derived from this configuration
    pub fn overlay_config(&self) -> OverlayConfig {
        OverlayConfig {
            display_threshold: self.display_threshold,
            device_class: self.device_class,
        }
    }
}

/// Fluent builder for [`ClientConfig`]
#[derive(Debug, Default)]
pub struct ClientBuilder {
    config: ClientConfig,
    ice_overridden: bool,
}

impl ClientBuilder {
    /// Start from the defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set signaling server URL
    pub fn signaling_server(mut self, url: &str) -> Self {
        self.config.signaling_url = Some(url.to_string());
        self
    }

    /// Set feature endpoint URL
    pub fn features_endpoint(mut self, url: &str) -> Self {
        self.config.features_url = Some(url.to_string());
        self
    }

    /// Set the startup grace period; `None` draws immediately
    pub fn grace_period(mut self, period: Option<Duration>) -> Self {
        self.config.grace_period = period;
        self
    }

    /// Set the display confidence threshold
    pub fn display_threshold(mut self, threshold: f32) -> Self {
        self.config.display_threshold = threshold;
        self
    }

    /// Use compact overlay styling for small screens
    pub fn compact_device(mut self) -> Self {
        self.config.device_class = DeviceClass::Compact;
        self
    }

    /// Add an ICE server. The first call replaces the default STUN server.
    pub fn ice_server(mut self, url: &str) -> Self {
        if !self.ice_overridden {
            self.config.ice_servers.clear();
            self.ice_overridden = true;
        }
        self.config.ice_servers.push(url.to_string());
        self
    }

    /// Set the fallback log filter
    pub fn log_filter(mut self, filter: &str) -> Self {
        self.config.log_filter = filter.to_string();
        self
    }

    /// Set the signaling connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Validate and produce the configuration
    pub fn build(self) -> Result<ClientConfig, VidsenseError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
