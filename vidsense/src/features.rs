//! Feature flag resolution
//!
//! The server advertises whether remote object detection is available. Anything short
//! of a clear "yes" (an error, a missing endpoint, an unknown framework) leaves the
//! client in local preview.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};
use vidsense_core::VidsenseError;
use vidsense_diagnostics::LogSink;

/// Server frameworks that carry the WebRTC detection pipeline
const DETECTION_FRAMEWORKS: &[&str] = &["aiohttp", "fastapi"];

/// Feature endpoint payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FeatureFlags {
    /// Server framework name
    #[serde(default)]
    pub framework: Option<String>,
    /// Explicit detection switch; wins over the framework heuristic
    #[serde(default)]
    pub object_detection: Option<bool>,
}

impl FeatureFlags {
    /// Whether remote detection should be used
    pub fn detection_enabled(&self) -> bool {
        match self.object_detection {
            Some(enabled) => enabled,
            None => self
                .framework
                .as_deref()
                .is_some_and(|f| DETECTION_FRAMEWORKS.contains(&f.to_ascii_lowercase().as_str())),
        }
    }
}

/// Where feature flags come from
#[async_trait]
pub trait FeatureSource: Send + Sync {
    /// Fetch the current flags
    async fn fetch(&self) -> Result<FeatureFlags, VidsenseError>;
}

/// Fetches flags from an HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpFeatureSource {
    client: reqwest::Client,
    url: String,
}

impl HttpFeatureSource {
    /// Create a source for the given URL
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl FeatureSource for HttpFeatureSource {
    async fn fetch(&self) -> Result<FeatureFlags, VidsenseError> {
        let fetch_error = |reason: String| VidsenseError::FeatureFetch {
            url: self.url.clone(),
            reason,
        };

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?
            .error_for_status()
            .map_err(|e| fetch_error(e.to_string()))?;

        response
            .json::<FeatureFlags>()
            .await
            .map_err(|e| fetch_error(format!("invalid feature payload: {}", e)))
    }
}

/// Fixed flags, for deployments without a feature endpoint
#[derive(Debug, Clone, Default)]
pub struct StaticFeatures(pub FeatureFlags);

impl StaticFeatures {
    /// Flags that enable detection
    pub fn detection() -> Self {
        Self(FeatureFlags {
            framework: None,
            object_detection: Some(true),
        })
    }

    /// Flags that keep the client in local preview
    pub fn local_preview() -> Self {
        Self(FeatureFlags {
            framework: None,
            object_detection: Some(false),
        })
    }
}

#[async_trait]
impl FeatureSource for StaticFeatures {
    async fn fetch(&self) -> Result<FeatureFlags, VidsenseError> {
        Ok(self.0.clone())
    }
}

/// Resolve the detection mode once at startup. Failures are reported and mean
/// local preview.
pub async fn resolve_detection(source: &dyn FeatureSource, log: &LogSink) -> bool {
    match source.fetch().await {
        Ok(flags) => {
            debug!("Feature flags: {:?}", flags);
            let enabled = flags.detection_enabled();
            info!(
                "Object detection {}",
                if enabled { "enabled" } else { "disabled" }
            );
            enabled
        }
        Err(e) => {
            log.report(&e);
            false
        }
    }
}
