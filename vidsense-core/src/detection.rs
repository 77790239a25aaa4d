//! Detection event data model
//!
//! Detection events are produced by the remote detector and relayed to the client over
//! the signaling channel. Boxes are expressed in the detector's *reference space*: the
//! pixel size of the frame the detector ran on, which is generally not the size the
//! client displays the video at.

use crate::error::VidsenseError;
use serde::{Deserialize, Serialize};

/// Axis-aligned box in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge
    pub x1: f64,
    /// Top edge
    pub y1: f64,
    /// Right edge
    pub x2: f64,
    /// Bottom edge
    pub y2: f64,
}

impl BoundingBox {
    /// Create a new box from its corners
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Box width
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    /// Box height
    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Scale the box independently along each axis
    pub fn scale(&self, scale_x: f64, scale_y: f64) -> Self {
        Self {
            x1: self.x1 * scale_x,
            y1: self.y1 * scale_y,
            x2: self.x2 * scale_x,
            y2: self.y2 * scale_y,
        }
    }
}

/// One detected object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    /// Box in reference-space pixels
    #[serde(alias = "bounding_box", alias = "bbox")]
    pub bounding_box: BoundingBox,
    /// Detector confidence in [0, 1]
    pub confidence: f32,
    /// Numeric class identifier
    #[serde(alias = "class_id")]
    pub class_id: i64,
    /// Human readable class name, when the detector provides one
    #[serde(default, alias = "class_name", skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

impl Detection {
    /// Overlay label: class id, optional class name and the confidence to two decimals
    pub fn label(&self) -> String {
        match &self.class_name {
            Some(name) => format!("{} {} {:.2}", self.class_id, name, self.confidence),
            None => format!("{} {:.2}", self.class_id, self.confidence),
        }
    }
}

/// A batch of detections computed on one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionEvent {
    /// Session identity of the client whose video was analysed
    #[serde(alias = "session_id")]
    pub session_id: String,
    /// Width of the detector's reference space
    #[serde(alias = "reference_width")]
    pub reference_width: f64,
    /// Height of the detector's reference space
    #[serde(alias = "reference_height")]
    pub reference_height: f64,
    /// Detections in detector output order
    #[serde(default)]
    pub detections: Vec<Detection>,
}

impl DetectionEvent {
    /// Parse a detection event from its serialized JSON form
    pub fn parse(raw: &str) -> Result<Self, VidsenseError> {
        let event: DetectionEvent =
            serde_json::from_str(raw).map_err(|e| VidsenseError::InvalidMessage {
                message: raw.to_string(),
                source: e.into(),
            })?;
        event.validate()?;
        Ok(event)
    }

    /// Reject events whose reference space cannot be scaled from
    pub fn validate(&self) -> Result<(), VidsenseError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(self.reference_width) || !valid(self.reference_height) {
            return Err(VidsenseError::InvalidConfiguration {
                message: format!(
                    "detection reference space {}x{} is not drawable",
                    self.reference_width, self.reference_height
                ),
            });
        }
        Ok(())
    }
}
