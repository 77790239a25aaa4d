//! # vidsense Signaling
//!
//! Signaling channel and wire protocol for the vidsense detection client.
//! Carries SDP offers and answers, trickled ICE candidates and detection results
//! between the client and the relay.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod error;
pub mod protocol;

// Re-export main types
pub use channel::{
    decode_frame, ChannelEvent, RelayEnd, SignalingChannel, SignalingSender, SignalingSink,
};
pub use error::SignalingError;
pub use protocol::{
    DetectionPayload, IceCandidate, InboundMessage, OutboundMessage, SdpType, SessionDescription,
};
