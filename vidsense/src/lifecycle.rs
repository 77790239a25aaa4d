//! Connection lifecycle
//!
//! `Idle -> Acquiring -> Negotiating -> Streaming -> Closing -> Idle`
//!
//! The lifecycle exclusively owns the local media stream and the peer connection.
//! Every awaited platform operation is scheduled as a boxed future that owns what it
//! needs and resolves to a [`Continuation`] tagged with the session token current when
//! it was issued. [`ConnectionLifecycle::stop`] bumps the token, so whatever was in
//! flight resumes as stale and is made harmless: a stale media stream has its tracks
//! stopped, a stale offer is never published, a stale grace timer opens nothing.
//!
//! Side effects the lifecycle does not own itself (overlay gating, UI notifications)
//! are queued as [`LifecycleEvent`]s for the client to apply.

use crate::peer::{
    IceConnectionState, PeerConfig, PeerConnection, PeerConnectionFactory, PeerEvent,
    PeerObserver,
};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use vidsense_core::{SessionToken, TokenGenerator, VidsenseError};
use vidsense_diagnostics::LogSink;
use vidsense_media::{
    MediaConstraints, MediaDevices, MediaError, MediaStream, VideoElement, VideoSource,
};
use vidsense_signaling::{IceCandidate, OutboundMessage, SessionDescription, SignalingSink};

/// Lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Nothing held
    Idle,
    /// Waiting for local media
    Acquiring,
    /// Peer connection built, waiting for the answer
    Negotiating,
    /// Video is flowing (remotely or as local preview)
    Streaming,
    /// Tearing down
    Closing,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Idle => "Idle",
            LifecycleState::Acquiring => "Acquiring",
            LifecycleState::Negotiating => "Negotiating",
            LifecycleState::Streaming => "Streaming",
            LifecycleState::Closing => "Closing",
        };
        write!(f, "{}", name)
    }
}

/// Effects for the owner of the lifecycle to apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The state changed
    StateChanged(LifecycleState),
    /// Drawing must be suppressed until the grace period ends
    GateClosed,
    /// Drawing may start
    GateOpened,
    /// The session ended; the overlay should be cleared and gated
    GateReset,
    /// ICE state reported by the peer connection
    IceStateChanged(IceConnectionState),
    /// A remote stream was routed to the display
    RemoteStreamAttached {
        /// Stream identifier
        stream_id: String,
    },
    /// The local stream was routed to the display
    LocalPreviewStarted {
        /// Stream identifier
        stream_id: String,
    },
}

/// Lifecycle settings
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleConfig {
    /// Negotiate with the remote detector instead of previewing locally
    pub detection_enabled: bool,
    /// ICE servers for new peer connections
    pub ice_servers: Vec<String>,
    /// Overlay grace period armed on every start
    pub grace_period: Option<Duration>,
}

#[derive(Debug)]
enum Step {
    Acquired(Result<MediaStream, MediaError>),
    OfferReady(Result<SessionDescription, VidsenseError>),
    RemoteDescriptionApplied(Result<(), VidsenseError>),
    CandidateApplied(Result<(), VidsenseError>),
    GraceElapsed,
}

/// A finished platform operation, tagged with the session that issued it
#[derive(Debug)]
pub struct Continuation {
    token: SessionToken,
    step: Step,
}

impl Continuation {
    /// Session the operation was issued under
    pub fn token(&self) -> SessionToken {
        self.token
    }
}

/// Something the lifecycle must react to
#[derive(Debug)]
pub enum LifecycleInput {
    /// An awaited operation finished
    Resumed(Continuation),
    /// A peer connection callback fired
    Peer(SessionToken, PeerEvent),
}

/// Owner of the local stream and the peer connection
pub struct ConnectionLifecycle {
    state: LifecycleState,
    tokens: TokenGenerator,
    config: LifecycleConfig,
    devices: Arc<dyn MediaDevices>,
    peers: Arc<dyn PeerConnectionFactory>,
    display: Arc<dyn VideoElement>,
    signaling: Option<Arc<dyn SignalingSink>>,
    device_id: Option<String>,
    local_stream: Option<MediaStream>,
    peer: Option<Arc<dyn PeerConnection>>,
    offer_published: bool,
    pending: FuturesUnordered<BoxFuture<'static, Continuation>>,
    peer_tx: mpsc::UnboundedSender<(SessionToken, PeerEvent)>,
    peer_rx: mpsc::UnboundedReceiver<(SessionToken, PeerEvent)>,
    events: Vec<LifecycleEvent>,
    log: LogSink,
}

impl fmt::Debug for ConnectionLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionLifecycle")
            .field("state", &self.state)
            .field("token", &self.tokens.current())
            .field("config", &self.config)
            .field("device_id", &self.device_id)
            .field("local_stream", &self.local_stream.as_ref().map(|s| s.id()))
            .field("has_peer", &self.peer.is_some())
            .field("offer_published", &self.offer_published)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl ConnectionLifecycle {
    /// Create an idle lifecycle
    pub fn new(
        config: LifecycleConfig,
        devices: Arc<dyn MediaDevices>,
        peers: Arc<dyn PeerConnectionFactory>,
        display: Arc<dyn VideoElement>,
        signaling: Option<Arc<dyn SignalingSink>>,
        log: LogSink,
    ) -> Self {
        let (peer_tx, peer_rx) = mpsc::unbounded_channel();
        Self {
            state: LifecycleState::Idle,
            tokens: TokenGenerator::new(),
            config,
            devices,
            peers,
            display,
            signaling,
            device_id: None,
            local_stream: None,
            peer: None,
            offer_published: false,
            pending: FuturesUnordered::new(),
            peer_tx,
            peer_rx,
            events: Vec::new(),
            log,
        }
    }

    /// Current state
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Whether nothing is running
    pub fn is_idle(&self) -> bool {
        self.state == LifecycleState::Idle
    }

    /// Token of the current session
    pub fn token(&self) -> SessionToken {
        self.tokens.current()
    }

    /// Settings
    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Whether an open peer connection is held
    pub fn has_live_peer(&self) -> bool {
        self.peer.as_ref().is_some_and(|p| p.is_open())
    }

    /// Whether a local stream is held
    pub fn has_local_stream(&self) -> bool {
        self.local_stream.is_some()
    }

    /// Operations still in flight, stale ones included
    pub fn pending_operations(&self) -> usize {
        self.pending.len()
    }

    /// Drop the signaling sink and run every later session as a local preview
    pub fn disable_detection(&mut self) {
        if self.config.detection_enabled {
            warn!("Detection disabled; later sessions use local preview");
        }
        self.config.detection_enabled = false;
        self.signaling = None;
    }

    /// Take the queued effects
    pub fn drain_events(&mut self) -> Vec<LifecycleEvent> {
        std::mem::take(&mut self.events)
    }

    fn transition(&mut self, next: LifecycleState) {
        if self.state != next {
            info!("Lifecycle {} -> {}", self.state, next);
            self.state = next;
            self.events.push(LifecycleEvent::StateChanged(next));
        }
    }

    fn schedule<F>(&mut self, token: SessionToken, operation: F)
    where
        F: Future<Output = Step> + Send + 'static,
    {
        self.pending.push(Box::pin(async move {
            Continuation {
                token,
                step: operation.await,
            }
        }));
    }

    fn publish(&self, message: OutboundMessage) -> Result<(), VidsenseError> {
        match &self.signaling {
            Some(sink) => sink.send(message).map_err(VidsenseError::from),
            None => Err(VidsenseError::Transport {
                reason: format!("no signaling channel to send {}", message.kind()),
            }),
        }
    }

    /// Close the peer connection, stop every local track and clear the display.
    /// Each step runs even when an earlier one fails.
    fn release(&mut self) {
        self.offer_published = false;
        if let Some(peer) = self.peer.take() {
            if let Err(e) = peer.close() {
                self.log.report(&VidsenseError::Teardown {
                    resource: "peer connection".to_string(),
                    reason: e.to_string(),
                });
            }
        }
        if let Some(stream) = self.local_stream.take() {
            for failure in stream.stop_all() {
                self.log.report(&VidsenseError::from(failure));
            }
        }
        self.display.set_source(None);
    }

    /// Start a session on the given device.
    ///
    /// Anything still held from a previous session is released first, and the
    /// overlay is reset when one was running. Media acquisition is scheduled, not
    /// awaited; the returned token names the new session.
    pub fn start(&mut self, device_id: Option<&str>) -> Result<SessionToken, VidsenseError> {
        let device_id = device_id
            .filter(|id| !id.is_empty())
            .ok_or(VidsenseError::NoDeviceSelected)?;

        let replacing = self.state != LifecycleState::Idle
            || self.peer.is_some()
            || self.local_stream.is_some();
        self.release();
        if replacing {
            self.events.push(LifecycleEvent::GateReset);
        }
        let token = self.tokens.bump();
        self.device_id = Some(device_id.to_string());
        self.transition(LifecycleState::Acquiring);

        let devices = Arc::clone(&self.devices);
        let constraints = MediaConstraints::exact_device(device_id);
        self.schedule(token, async move {
            Step::Acquired(devices.get_user_media(constraints).await)
        });

        match self.config.grace_period {
            Some(period) => {
                self.events.push(LifecycleEvent::GateClosed);
                self.schedule(token, async move {
                    tokio::time::sleep(period).await;
                    Step::GraceElapsed
                });
            }
            None => self.events.push(LifecycleEvent::GateOpened),
        }

        info!("Session {} starting on device {}", token, device_id);
        Ok(token)
    }

    /// Tear everything down. Safe in every state and safe to repeat.
    pub fn stop(&mut self) {
        self.tokens.bump();
        if self.state != LifecycleState::Idle {
            self.transition(LifecycleState::Closing);
        }
        self.release();
        self.device_id = None;
        self.events.push(LifecycleEvent::GateReset);
        self.transition(LifecycleState::Idle);
    }

    /// Apply a remote answer. Only accepted while negotiating, once this session's
    /// offer has gone out.
    pub fn on_remote_answer(
        &mut self,
        description: SessionDescription,
    ) -> Result<(), VidsenseError> {
        if self.state != LifecycleState::Negotiating {
            return Err(VidsenseError::NegotiationMismatch {
                message_kind: "sdp_answer".to_string(),
                expected: LifecycleState::Negotiating.to_string(),
                actual: self.state.to_string(),
            });
        }
        if !self.offer_published {
            return Err(VidsenseError::NegotiationMismatch {
                message_kind: "sdp_answer".to_string(),
                expected: format!("{} with offer published", LifecycleState::Negotiating),
                actual: format!("{} with offer pending", self.state),
            });
        }
        let peer = self
            .peer
            .clone()
            .ok_or_else(|| VidsenseError::SignalingOutOfOrder {
                message_kind: "sdp_answer".to_string(),
            })?;

        self.transition(LifecycleState::Streaming);
        let token = self.token();
        self.schedule(token, async move {
            Step::RemoteDescriptionApplied(peer.set_remote_description(description).await)
        });
        Ok(())
    }

    /// Apply a remote candidate to the current peer connection
    pub fn on_remote_candidate(&mut self, candidate: IceCandidate) -> Result<(), VidsenseError> {
        let peer = self
            .peer
            .clone()
            .ok_or_else(|| VidsenseError::SignalingOutOfOrder {
                message_kind: "ice_candidate".to_string(),
            })?;

        let token = self.token();
        self.schedule(token, async move {
            Step::CandidateApplied(peer.add_ice_candidate(candidate).await)
        });
        Ok(())
    }

    /// Wait for the next finished operation or peer callback
    pub async fn next_input(&mut self) -> LifecycleInput {
        tokio::select! {
            Some(continuation) = self.pending.next(), if !self.pending.is_empty() => {
                LifecycleInput::Resumed(continuation)
            }
            Some((token, event)) = self.peer_rx.recv() => LifecycleInput::Peer(token, event),
            else => std::future::pending().await,
        }
    }

    /// React to an input returned by [`next_input`](Self::next_input)
    pub fn handle_input(&mut self, input: LifecycleInput) -> Result<(), VidsenseError> {
        match input {
            LifecycleInput::Resumed(continuation) => self.resume(continuation),
            LifecycleInput::Peer(token, event) => self.on_peer_event(token, event),
        }
    }

    /// Continue after an awaited operation
    pub fn resume(&mut self, continuation: Continuation) -> Result<(), VidsenseError> {
        let Continuation { token, step } = continuation;
        if !self.tokens.is_current(token) {
            self.discard_stale(token, step);
            return Ok(());
        }

        match step {
            Step::Acquired(Ok(stream)) => self.on_media_acquired(token, stream),
            Step::Acquired(Err(e)) => {
                let device = self.device_id.clone().unwrap_or_default();
                self.stop();
                Err(match VidsenseError::from(e) {
                    VidsenseError::MediaAcquisition { device_id, reason } if device_id.is_empty() => {
                        VidsenseError::MediaAcquisition {
                            device_id: device,
                            reason,
                        }
                    }
                    other => other,
                })
            }
            Step::OfferReady(Ok(offer)) => {
                debug!("Publishing offer for session {}", token);
                self.publish(OutboundMessage::Offer(offer))?;
                self.offer_published = true;
                Ok(())
            }
            Step::OfferReady(Err(e)) => Err(e),
            Step::RemoteDescriptionApplied(result) => {
                if result.is_ok() {
                    info!("Remote description applied for session {}", token);
                }
                result
            }
            Step::CandidateApplied(result) => result,
            Step::GraceElapsed => {
                debug!("Grace period elapsed for session {}", token);
                self.events.push(LifecycleEvent::GateOpened);
                Ok(())
            }
        }
    }

    fn discard_stale(&mut self, token: SessionToken, step: Step) {
        match step {
            Step::Acquired(Ok(stream)) => {
                warn!(
                    "Releasing stream {} acquired by stale session {}",
                    stream.id(),
                    token
                );
                for failure in stream.stop_all() {
                    self.log.report(&VidsenseError::from(failure));
                }
            }
            Step::OfferReady(Ok(_)) => debug!("Dropping offer from stale session {}", token),
            _ => debug!("Dropping stale continuation from session {}", token),
        }
    }

    fn on_media_acquired(
        &mut self,
        token: SessionToken,
        stream: MediaStream,
    ) -> Result<(), VidsenseError> {
        info!(
            "Acquired local stream {} with {} track(s)",
            stream.id(),
            stream.tracks().len()
        );
        self.local_stream = Some(stream.clone());

        if !self.config.detection_enabled {
            let stream_id = stream.id().to_string();
            self.display.set_source(Some(VideoSource::Local(stream)));
            self.events
                .push(LifecycleEvent::LocalPreviewStarted { stream_id });
            self.transition(LifecycleState::Streaming);
            return Ok(());
        }

        if let Some(previous) = self.peer.take() {
            if let Err(e) = previous.close() {
                self.log.report(&e);
            }
        }

        let observer = PeerObserver::new(token, self.peer_tx.clone());
        let config = PeerConfig {
            ice_servers: self.config.ice_servers.clone(),
        };
        let peer = match self.peers.create(&config, observer) {
            Ok(peer) => peer,
            Err(e) => {
                self.stop();
                return Err(e);
            }
        };
        self.peer = Some(Arc::clone(&peer));

        for track in stream.tracks() {
            if let Err(e) = peer.add_track(Arc::clone(track), &stream) {
                self.stop();
                return Err(e);
            }
        }
        self.transition(LifecycleState::Negotiating);

        self.schedule(token, async move {
            let offer: Result<SessionDescription, VidsenseError> = async {
                let offer = peer.create_offer().await?;
                peer.set_local_description(offer.clone()).await?;
                Ok(offer)
            }
            .await;
            Step::OfferReady(offer)
        });
        Ok(())
    }

    fn on_peer_event(&mut self, token: SessionToken, event: PeerEvent) -> Result<(), VidsenseError> {
        if !self.tokens.is_current(token) || self.peer.is_none() {
            debug!("Ignoring peer callback from stale session {}", token);
            return Ok(());
        }

        match event {
            PeerEvent::LocalCandidate(Some(candidate)) => {
                self.publish(OutboundMessage::IceCandidate(candidate))
            }
            PeerEvent::LocalCandidate(None) => {
                debug!("ICE gathering complete");
                Ok(())
            }
            PeerEvent::IceStateChanged(state) => {
                info!("ICE connection state: {}", state);
                self.events.push(LifecycleEvent::IceStateChanged(state));
                Ok(())
            }
            PeerEvent::RemoteTrack(None) => {
                warn!("Remote track without a stream ignored");
                Ok(())
            }
            PeerEvent::RemoteTrack(Some(stream)) => {
                if self.display.current_stream_id().as_deref() == Some(stream.id()) {
                    debug!("Stream {} already attached", stream.id());
                    return Ok(());
                }
                let stream_id = stream.id().to_string();
                self.display.set_source(Some(VideoSource::Remote(stream)));
                self.events
                    .push(LifecycleEvent::RemoteStreamAttached { stream_id });
                Ok(())
            }
        }
    }
}
