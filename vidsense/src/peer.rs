//! Peer connection capability
//!
//! The real-time transport stack is reached through [`PeerConnection`]. Its three
//! observer callbacks (local candidate, ICE state, remote track) are funnelled into a
//! [`PeerObserver`], which tags each callback with the session token of the peer
//! connection that raised it. A callback from a connection belonging to an earlier
//! session is recognisable as stale when it is processed.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use vidsense_core::{SessionToken, VidsenseError};
use vidsense_media::{MediaStream, MediaTrack};
use vidsense_signaling::{IceCandidate, SessionDescription};

/// ICE connection state reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceConnectionState {
    /// Gathering has not started
    New,
    /// Checking candidate pairs
    Checking,
    /// A usable pair was found
    Connected,
    /// Checking finished
    Completed,
    /// No usable pair
    Failed,
    /// Connectivity lost
    Disconnected,
    /// Connection closed
    Closed,
}

impl fmt::Display for IceConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IceConnectionState::New => "new",
            IceConnectionState::Checking => "checking",
            IceConnectionState::Connected => "connected",
            IceConnectionState::Completed => "completed",
            IceConnectionState::Failed => "failed",
            IceConnectionState::Disconnected => "disconnected",
            IceConnectionState::Closed => "closed",
        };
        write!(f, "{}", name)
    }
}

/// Observer callback raised by a peer connection
#[derive(Debug, Clone)]
pub enum PeerEvent {
    /// A local candidate was gathered; `None` marks the end of gathering
    LocalCandidate(Option<IceCandidate>),
    /// ICE state changed
    IceStateChanged(IceConnectionState),
    /// A remote track arrived, with the first stream it belongs to if any
    RemoteTrack(Option<MediaStream>),
}

/// Token-tagged sink for peer connection callbacks
#[derive(Debug, Clone)]
pub struct PeerObserver {
    token: SessionToken,
    tx: mpsc::UnboundedSender<(SessionToken, PeerEvent)>,
}

impl PeerObserver {
    pub(crate) fn new(
        token: SessionToken,
        tx: mpsc::UnboundedSender<(SessionToken, PeerEvent)>,
    ) -> Self {
        Self { token, tx }
    }

    /// Session token this observer reports under
    pub fn token(&self) -> SessionToken {
        self.token
    }

    /// Forward a callback. Silently dropped once the client has gone away.
    pub fn notify(&self, event: PeerEvent) {
        let _ = self.tx.send((self.token, event));
    }

    /// Local candidate callback
    pub fn on_local_candidate(&self, candidate: Option<IceCandidate>) {
        self.notify(PeerEvent::LocalCandidate(candidate));
    }

    /// ICE state callback
    pub fn on_ice_state_change(&self, state: IceConnectionState) {
        self.notify(PeerEvent::IceStateChanged(state));
    }

    /// Remote track callback
    pub fn on_track(&self, stream: Option<MediaStream>) {
        self.notify(PeerEvent::RemoteTrack(stream));
    }
}

/// Settings for a new peer connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConfig {
    /// ICE server URLs
    pub ice_servers: Vec<String>,
}

/// One peer connection
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Attach a local track, associated with its stream
    fn add_track(
        &self,
        track: Arc<dyn MediaTrack>,
        stream: &MediaStream,
    ) -> Result<(), VidsenseError>;

    /// Generate an SDP offer
    async fn create_offer(&self) -> Result<SessionDescription, VidsenseError>;

    /// Apply the local description
    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), VidsenseError>;

    /// Apply the remote description
    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), VidsenseError>;

    /// Apply a remote candidate
    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), VidsenseError>;

    /// Close the connection. Closing twice is not an error.
    fn close(&self) -> Result<(), VidsenseError>;

    /// Whether the connection has not been closed
    fn is_open(&self) -> bool;
}

/// Creates peer connections wired to an observer
pub trait PeerConnectionFactory: Send + Sync {
    /// Construct a connection and register its observer callbacks
    fn create(
        &self,
        config: &PeerConfig,
        observer: PeerObserver,
    ) -> Result<Arc<dyn PeerConnection>, VidsenseError>;
}
