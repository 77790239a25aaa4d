//! Detection overlay rendering
//!
//! The overlay is a drawing surface stacked on top of the video element. Its backing
//! store always matches the element's *displayed* size, while detections arrive in the
//! detector's reference space, so every box is rescaled on the way in.
//!
//! Event handling rules:
//! - events tagged with another client's session are ignored;
//! - while the grace gate is closed events are consumed without drawing;
//! - a drawable event clears the surface and repaints from scratch (last event wins);
//! - detections below the display threshold are skipped.

use crate::error::MediaError;
use crate::platform::SurfaceSize;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use vidsense_core::{BoundingBox, DetectionEvent, SessionId, VidsenseError};

/// Coarse device class used only to pick legible label and stroke sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    /// Phones and other small screens
    Compact,
    /// Desktop and tablet screens
    #[default]
    Full,
}

impl DeviceClass {
    /// Drawing style for this device class
    pub fn style(&self) -> OverlayStyle {
        match self {
            DeviceClass::Compact => OverlayStyle {
                font_px: 10,
                line_width: 1.0,
                ..OverlayStyle::default()
            },
            DeviceClass::Full => OverlayStyle::default(),
        }
    }
}

/// Stroke and label style
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    /// Label font size in pixels
    pub font_px: u32,
    /// Rectangle stroke width in pixels
    pub line_width: f64,
    /// Rectangle and label color (R, G, B)
    pub color: [u8; 3],
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            font_px: 16,
            line_width: 2.0,
            color: [0, 255, 0],
        }
    }
}

/// Overlay configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayConfig {
    /// Minimum confidence a detection needs to be drawn
    pub display_threshold: f32,
    /// Device class hint
    pub device_class: DeviceClass,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            display_threshold: 0.45,
            device_class: DeviceClass::Full,
        }
    }
}

impl OverlayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), MediaError> {
        if !(0.0..=1.0).contains(&self.display_threshold) {
            return Err(MediaError::InvalidConfiguration {
                message: format!(
                    "display threshold {} is outside [0, 1]",
                    self.display_threshold
                ),
            });
        }
        Ok(())
    }
}

/// Surface the overlay paints on, exclusively owned by the renderer
pub trait DrawingSurface: Send {
    /// Resize the pixel backing store
    fn resize(&mut self, size: SurfaceSize) -> Result<(), MediaError>;

    /// Erase everything drawn
    fn clear(&mut self);

    /// Stroke a rectangle outline
    fn stroke_rect(&mut self, rect: &BoundingBox, style: &OverlayStyle);

    /// Draw a text label with its baseline at (x, y)
    fn fill_text(&mut self, text: &str, x: f64, y: f64, style: &OverlayStyle);
}

/// What happened to one detection event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The surface was repainted with this many boxes
    Drawn {
        /// Boxes that passed the confidence threshold
        boxes: usize,
    },
    /// The event belongs to another client
    ForeignSession,
    /// The grace gate was closed
    GateClosed,
    /// The surface has not been sized yet
    SurfaceUnsized,
    /// The event's reference space cannot be scaled from
    InvalidReference,
}

/// Overlay statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OverlayStats {
    /// Events that repainted the surface
    pub events_drawn: u64,
    /// Boxes painted across all events
    pub boxes_drawn: u64,
    /// Events addressed to another session
    pub discarded_foreign: u64,
    /// Events consumed while the grace gate was closed
    pub discarded_gated: u64,
    /// Payloads that failed to parse or had an unusable reference space
    pub discarded_malformed: u64,
    /// Events received before the surface had a size
    pub discarded_unsized: u64,
}

/// Map a box from reference space onto a surface
pub fn project(
    bbox: &BoundingBox,
    reference_width: f64,
    reference_height: f64,
    surface: SurfaceSize,
) -> BoundingBox {
    let scale_x = f64::from(surface.width) / reference_width;
    let scale_y = f64::from(surface.height) / reference_height;
    bbox.scale(scale_x, scale_y)
}

/// Detection overlay renderer
pub struct OverlayRenderer {
    surface: Box<dyn DrawingSurface>,
    config: OverlayConfig,
    style: OverlayStyle,
    size: SurfaceSize,
    local_session: Option<SessionId>,
    gate_open: bool,
    stats: OverlayStats,
}

impl std::fmt::Debug for OverlayRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayRenderer")
            .field("config", &self.config)
            .field("size", &self.size)
            .field("local_session", &self.local_session)
            .field("gate_open", &self.gate_open)
            .field("stats", &self.stats)
            .finish()
    }
}

impl OverlayRenderer {
    /// Create a renderer over a surface. The gate starts closed.
    pub fn new(surface: Box<dyn DrawingSurface>, config: OverlayConfig) -> Self {
        Self {
            surface,
            style: config.device_class.style(),
            config,
            size: SurfaceSize::default(),
            local_session: None,
            gate_open: false,
            stats: OverlayStats::default(),
        }
    }

    /// Set the identity events must carry to be drawn
    pub fn set_local_session(&mut self, session: Option<SessionId>) {
        self.local_session = session;
    }

    /// Identity events must carry to be drawn
    pub fn local_session(&self) -> Option<&SessionId> {
        self.local_session.as_ref()
    }

    /// Allow drawing
    pub fn open_gate(&mut self) {
        debug!("Overlay gate opened");
        self.gate_open = true;
    }

    /// Suppress drawing
    pub fn close_gate(&mut self) {
        self.gate_open = false;
    }

    /// Whether drawing is allowed
    pub fn is_gate_open(&self) -> bool {
        self.gate_open
    }

    /// Current surface size
    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    /// Statistics
    pub fn stats(&self) -> &OverlayStats {
        &self.stats
    }

    /// Configuration
    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Match the backing store to the video element's displayed size.
    ///
    /// Returns the new size when it changed, `None` when it was already current.
    pub fn resize(&mut self, size: SurfaceSize) -> Result<Option<SurfaceSize>, MediaError> {
        if size == self.size {
            return Ok(None);
        }
        self.surface.resize(size)?;
        debug!("Overlay surface resized {} -> {}", self.size, size);
        self.size = size;
        Ok(Some(size))
    }

    /// Clear the drawing and close the gate; used when the session stops
    pub fn reset(&mut self) {
        self.surface.clear();
        self.gate_open = false;
    }

    /// Handle a payload that arrived in serialized form.
    ///
    /// A payload that fails to parse is counted and returned as an error; the surface is
    /// left exactly as it was.
    pub fn on_detection_payload(&mut self, raw: &str) -> Result<RenderOutcome, VidsenseError> {
        match DetectionEvent::parse(raw) {
            Ok(event) => Ok(self.on_detection_event(&event)),
            Err(e) => {
                self.stats.discarded_malformed += 1;
                Err(e)
            }
        }
    }

    /// Handle one detection event
    pub fn on_detection_event(&mut self, event: &DetectionEvent) -> RenderOutcome {
        let ours = self
            .local_session
            .as_ref()
            .is_some_and(|s| s.matches(&event.session_id));
        if !ours {
            trace!("Ignoring detections for session {}", event.session_id);
            self.stats.discarded_foreign += 1;
            return RenderOutcome::ForeignSession;
        }

        if !self.gate_open {
            self.stats.discarded_gated += 1;
            return RenderOutcome::GateClosed;
        }

        if self.size.is_empty() {
            self.stats.discarded_unsized += 1;
            return RenderOutcome::SurfaceUnsized;
        }
        if event.validate().is_err() {
            self.stats.discarded_malformed += 1;
            return RenderOutcome::InvalidReference;
        }

        self.surface.clear();
        let mut boxes = 0;
        for detection in &event.detections {
            if detection.confidence < self.config.display_threshold {
                continue;
            }
            let rect = project(
                &detection.bounding_box,
                event.reference_width,
                event.reference_height,
                self.size,
            );
            self.surface.stroke_rect(&rect, &self.style);

            let font = f64::from(self.style.font_px);
            let label_y = if rect.y1 > font { rect.y1 - 4.0 } else { rect.y1 + font };
            self.surface
                .fill_text(&detection.label(), rect.x1, label_y, &self.style);
            boxes += 1;
        }

        self.stats.events_drawn += 1;
        self.stats.boxes_drawn += boxes as u64;
        RenderOutcome::Drawn { boxes }
    }
}
