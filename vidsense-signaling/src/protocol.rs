//! Signaling protocol messages
//!
//! Every frame on the relay is a JSON envelope `{"event": <name>, "data": <payload>}`.
//! Offers, answers and candidates are correlated only by the channel they travel on;
//! there is no transaction id.

use serde::{Deserialize, Serialize};
use vidsense_core::{DetectionEvent, VidsenseError};

/// SDP description type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    /// Local offer
    Offer,
    /// Remote answer
    Answer,
    /// Provisional answer
    Pranswer,
    /// Rollback to the last stable state
    Rollback,
}

/// SDP offer or answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    /// Description type
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    /// SDP body
    pub sdp: String,
}

impl SessionDescription {
    /// Create an offer description
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    /// Create an answer description
    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// ICE candidate exchanged in either direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    /// Media stream identification tag
    #[serde(rename = "sdpMid", default)]
    pub sdp_mid: Option<String>,
    /// Index of the m-line the candidate belongs to
    #[serde(rename = "sdpMLineIndex", default)]
    pub sdp_m_line_index: Option<u16>,
    /// Candidate attribute line
    pub candidate: String,
}

/// Detections as they arrive on the wire: either already structured or as a JSON
/// string that still needs parsing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetectionPayload {
    /// Structured event
    Event(DetectionEvent),
    /// Serialized event
    Encoded(String),
}

/// Messages the client sends to the relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Announce the channel's session identity
    Register {
        /// Session identity detections will be tagged with
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    /// Local SDP offer
    #[serde(rename = "sdp")]
    Offer(SessionDescription),
    /// Locally discovered ICE candidate
    IceCandidate(IceCandidate),
    /// Displayed size of the video, for server-side scaling
    SurfaceSize {
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },
}

impl OutboundMessage {
    /// Wire event name
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Register { .. } => "register",
            OutboundMessage::Offer(_) => "sdp",
            OutboundMessage::IceCandidate(_) => "ice_candidate",
            OutboundMessage::SurfaceSize { .. } => "surface_size",
        }
    }
}

/// Messages the relay delivers to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Remote SDP answer
    #[serde(rename = "sdp_answer")]
    Answer(SessionDescription),
    /// Remote ICE candidate
    IceCandidate(IceCandidate),
    /// Detection results
    Detections(DetectionPayload),
}

impl InboundMessage {
    /// Wire event name
    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::Answer(_) => "sdp_answer",
            InboundMessage::IceCandidate(_) => "ice_candidate",
            InboundMessage::Detections(_) => "detections",
        }
    }

    /// Parse a text frame received from the relay
    pub fn parse(raw: &str) -> Result<Self, VidsenseError> {
        serde_json::from_str(raw).map_err(|e| VidsenseError::InvalidMessage {
            message: raw.to_string(),
            source: e.into(),
        })
    }
}
