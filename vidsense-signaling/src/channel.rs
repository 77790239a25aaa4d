//! Signaling channel to the relay
//!
//! The channel is a message-oriented, bidirectional WebSocket. On connect it mints the
//! client's [`SessionId`] and announces it with a `register` message; detection events
//! carry that identity back so the client can tell its own results apart from those
//! of other clients on the same relay.
//!
//! Sending never blocks: outbound messages are queued to a writer task. Inbound frames
//! are decoded by a reader task and surfaced as [`ChannelEvent`]s. There is no
//! reconnect; a dropped socket is reported once as [`ChannelEvent::Disconnected`].

use crate::error::SignalingError;
use crate::protocol::{InboundMessage, OutboundMessage};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use vidsense_core::SessionId;

/// Anything outbound signaling messages can be handed to
pub trait SignalingSink: Send + Sync {
    /// Queue a message for delivery
    fn send(&self, message: OutboundMessage) -> Result<(), SignalingError>;
}

/// Something that happened on the channel
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// A well-formed message from the relay
    Message(InboundMessage),
    /// A frame that could not be decoded
    Malformed {
        /// Raw frame text
        raw: String,
        /// Decoder error
        error: String,
    },
    /// The socket closed or failed
    Disconnected {
        /// Close reason
        reason: String,
    },
}

/// Decode one text frame into a channel event
pub fn decode_frame(raw: &str) -> ChannelEvent {
    match InboundMessage::parse(raw) {
        Ok(message) => ChannelEvent::Message(message),
        Err(e) => ChannelEvent::Malformed {
            raw: raw.to_string(),
            error: e.to_string(),
        },
    }
}

/// Cloneable handle for queuing outbound messages
#[derive(Debug, Clone)]
pub struct SignalingSender {
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl SignalingSink for SignalingSender {
    fn send(&self, message: OutboundMessage) -> Result<(), SignalingError> {
        debug!("Queueing {} message", message.kind());
        self.tx.send(message).map_err(|_| SignalingError::Closed)
    }
}

/// Client side of the signaling channel
#[derive(Debug)]
pub struct SignalingChannel {
    session_id: SessionId,
    sender: SignalingSender,
    events: mpsc::UnboundedReceiver<ChannelEvent>,
    tasks: Vec<JoinHandle<()>>,
}

impl SignalingChannel {
    /// Open a WebSocket to the relay and register a fresh session identity
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, SignalingError> {
        let (ws_stream, _) = tokio::time::timeout(timeout, connect_async(url))
            .await
            .map_err(|_| SignalingError::ConnectTimeout {
                url: url.to_string(),
                duration: timeout,
            })?
            .map_err(|e| SignalingError::Connect {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let session_id = SessionId::generate();
        info!("Signaling channel connected to {} as {}", url, session_id);

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<OutboundMessage>();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let writer_events = event_tx.clone();
        let writer = tokio::spawn(async move {
            while let Some(message) = out_rx.recv().await {
                let text = match serde_json::to_string(&message) {
                    Ok(json) => json,
                    Err(e) => {
                        let err = SignalingError::Encode {
                            kind: message.kind().to_string(),
                            reason: e.to_string(),
                        };
                        error!("{}", err);
                        continue;
                    }
                };
                if let Err(e) = ws_sender.send(Message::Text(text)).await {
                    error!("Failed to send {} message: {}", message.kind(), e);
                    let _ = writer_events.send(ChannelEvent::Disconnected {
                        reason: e.to_string(),
                    });
                    break;
                }
            }
            let _ = ws_sender.close().await;
        });

        let reader = tokio::spawn(async move {
            let reason = loop {
                match ws_receiver.next().await {
                    Some(Ok(Message::Text(text))) => {
                        let event = decode_frame(&text);
                        if let ChannelEvent::Malformed { error, .. } = &event {
                            warn!("Invalid message format: {}", error);
                        }
                        if event_tx.send(event).is_err() {
                            return;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break frame
                            .map(|f| f.reason.to_string())
                            .unwrap_or_else(|| "closed by relay".to_string());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("WebSocket error: {}", e);
                        break e.to_string();
                    }
                    None => break "stream ended".to_string(),
                }
            };
            let _ = event_tx.send(ChannelEvent::Disconnected { reason });
        });

        let channel = Self {
            session_id,
            sender: SignalingSender { tx: out_tx },
            events: event_rx,
            tasks: vec![writer, reader],
        };
        channel.register()?;
        Ok(channel)
    }

    /// Build a channel whose far end is held in memory instead of a socket.
    ///
    /// The returned [`RelayEnd`] observes everything the client sends (starting with
    /// the `register` message) and can inject inbound traffic.
    pub fn in_memory(session_id: SessionId) -> (Self, RelayEnd) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let channel = Self {
            session_id: session_id.clone(),
            sender: SignalingSender { tx: out_tx },
            events: event_rx,
            tasks: Vec::new(),
        };
        // The receiver is alive, so this cannot fail
        let _ = channel.register();
        let relay = RelayEnd {
            session_id,
            outbound: out_rx,
            events: event_tx,
        };
        (channel, relay)
    }

    fn register(&self) -> Result<(), SignalingError> {
        self.sender.send(OutboundMessage::Register {
            session_id: self.session_id.to_string(),
        })
    }

    /// Identity registered for this channel
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Cloneable outbound handle
    pub fn sender(&self) -> SignalingSender {
        self.sender.clone()
    }

    /// Wait for the next channel event. `None` once both tasks have finished.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        self.events.recv().await
    }

    /// Tear down the socket tasks
    pub fn close(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.events.close();
    }
}

impl Drop for SignalingChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Far end of an in-memory channel
#[derive(Debug)]
pub struct RelayEnd {
    session_id: SessionId,
    outbound: mpsc::UnboundedReceiver<OutboundMessage>,
    events: mpsc::UnboundedSender<ChannelEvent>,
}

impl RelayEnd {
    /// Identity the client registered
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Deliver a message to the client. Returns false when the client is gone.
    pub fn deliver(&self, message: InboundMessage) -> bool {
        self.events.send(ChannelEvent::Message(message)).is_ok()
    }

    /// Deliver a raw text frame, decoded the same way a socket frame would be
    pub fn deliver_raw(&self, raw: &str) -> bool {
        self.events.send(decode_frame(raw)).is_ok()
    }

    /// Report the socket as dropped
    pub fn disconnect(&self, reason: &str) -> bool {
        self.events
            .send(ChannelEvent::Disconnected {
                reason: reason.to_string(),
            })
            .is_ok()
    }

    /// Wait for the next message the client sent
    pub async fn recv(&mut self) -> Option<OutboundMessage> {
        self.outbound.recv().await
    }

    /// Next message the client sent, if one is already queued
    pub fn try_recv(&mut self) -> Option<OutboundMessage> {
        self.outbound.try_recv().ok()
    }

    /// Drain every message queued so far
    pub fn drain(&mut self) -> Vec<OutboundMessage> {
        let mut sent = Vec::new();
        while let Ok(message) = self.outbound.try_recv() {
            sent.push(message);
        }
        sent
    }
}
