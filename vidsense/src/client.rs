//! Client event loop
//!
//! A [`Client`] is one task that owns the lifecycle, the overlay, the device catalog
//! and the signaling channel, and reacts to one input at a time: a UI command, a
//! channel event, a finished lifecycle operation or a finished device refresh.
//! Nothing it owns is shared, so nothing is locked.

use crate::config::ClientConfig;
use crate::event::{ClientEvent, EventStream};
use crate::lifecycle::{ConnectionLifecycle, LifecycleConfig, LifecycleEvent};
use crate::peer::PeerConnectionFactory;
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};
use vidsense_core::{SessionId, VidsenseError};
use vidsense_diagnostics::LogSink;
use vidsense_media::{
    enumerate, DeviceCatalog, DeviceSnapshot, DrawingSurface, MediaDevices, MediaError,
    OverlayRenderer, OverlayStats, PermissionGate, RenderOutcome, VideoElement,
};
use vidsense_signaling::{
    ChannelEvent, DetectionPayload, InboundMessage, OutboundMessage, SignalingChannel,
    SignalingSender, SignalingSink,
};

/// UI commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start video on the selected device
    Start,
    /// Stop video
    Stop,
    /// Start when idle, stop otherwise
    Toggle,
    /// Choose the device the next start uses
    SelectDevice(String),
    /// Choose a device and restart on it if video is running
    SwitchDevice(String),
    /// Re-check permission and rebuild the device list
    RefreshDevices,
    /// The window was resized
    Resize,
    /// The video element loaded new metadata
    VideoMetadataLoaded,
    /// End the client loop
    Shutdown,
}

/// Platform capabilities the client runs on
pub struct Platform {
    /// Device enumeration, permission and media acquisition
    pub devices: Arc<dyn MediaDevices>,
    /// Peer connection construction
    pub peers: Arc<dyn PeerConnectionFactory>,
    /// The video element
    pub display: Arc<dyn VideoElement>,
    /// The overlay drawing surface
    pub surface: Box<dyn DrawingSurface>,
}

/// Cloneable handle for sending commands to a running client
#[derive(Debug, Clone)]
pub struct ClientHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl ClientHandle {
    /// Send a command
    pub fn send(&self, command: Command) -> Result<(), VidsenseError> {
        self.tx.send(command).map_err(|_| VidsenseError::Transport {
            reason: "client is not running".to_string(),
        })
    }

    /// Start video
    pub fn start(&self) -> Result<(), VidsenseError> {
        self.send(Command::Start)
    }

    /// Stop video
    pub fn stop(&self) -> Result<(), VidsenseError> {
        self.send(Command::Stop)
    }

    /// Toggle video
    pub fn toggle(&self) -> Result<(), VidsenseError> {
        self.send(Command::Toggle)
    }

    /// Select a device
    pub fn select_device(&self, device_id: &str) -> Result<(), VidsenseError> {
        self.send(Command::SelectDevice(device_id.to_string()))
    }

    /// Switch to a device
    pub fn switch_device(&self, device_id: &str) -> Result<(), VidsenseError> {
        self.send(Command::SwitchDevice(device_id.to_string()))
    }

    /// Rebuild the device list
    pub fn refresh_devices(&self) -> Result<(), VidsenseError> {
        self.send(Command::RefreshDevices)
    }

    /// Report a window resize
    pub fn resize(&self) -> Result<(), VidsenseError> {
        self.send(Command::Resize)
    }

    /// Report that video metadata loaded
    pub fn video_metadata_loaded(&self) -> Result<(), VidsenseError> {
        self.send(Command::VideoMetadataLoaded)
    }

    /// Stop the client loop
    pub fn shutdown(&self) -> Result<(), VidsenseError> {
        self.send(Command::Shutdown)
    }
}

type RefreshOutcome = (PermissionGate, Result<DeviceSnapshot, MediaError>);

/// The detection client
pub struct Client {
    lifecycle: ConnectionLifecycle,
    overlay: OverlayRenderer,
    catalog: DeviceCatalog,
    gate: Option<PermissionGate>,
    refresh: Option<BoxFuture<'static, RefreshOutcome>>,
    devices: Arc<dyn MediaDevices>,
    display: Arc<dyn VideoElement>,
    channel: Option<SignalingChannel>,
    sender: Option<SignalingSender>,
    selected: Option<String>,
    detection_enabled: bool,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<ClientEvent>,
    log: LogSink,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("lifecycle", &self.lifecycle)
            .field("overlay", &self.overlay)
            .field("catalog", &self.catalog)
            .field("selected", &self.selected)
            .field("detection_enabled", &self.detection_enabled)
            .field("session_id", &self.session_id())
            .finish()
    }
}

impl Client {
    /// Assemble a client.
    ///
    /// Detection needs a signaling channel; without one the client falls back to local
    /// preview.
    pub fn new(
        config: &ClientConfig,
        platform: Platform,
        channel: Option<SignalingChannel>,
        detection_enabled: bool,
        log: LogSink,
    ) -> (Self, ClientHandle, EventStream) {
        let detection_enabled = if detection_enabled && channel.is_none() {
            warn!("Detection requested without a signaling channel; using local preview");
            false
        } else {
            detection_enabled
        };

        let sender = channel.as_ref().map(|c| c.sender());
        let signaling = sender
            .clone()
            .map(|s| Arc::new(s) as Arc<dyn SignalingSink>);

        let lifecycle = ConnectionLifecycle::new(
            LifecycleConfig {
                detection_enabled,
                ice_servers: config.ice_servers.clone(),
                grace_period: config.grace_period,
            },
            Arc::clone(&platform.devices),
            platform.peers,
            Arc::clone(&platform.display),
            signaling,
            log.clone(),
        );

        let mut overlay = OverlayRenderer::new(platform.surface, config.overlay_config());
        overlay.set_local_session(channel.as_ref().map(|c| c.session_id().clone()));

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let client = Self {
            lifecycle,
            overlay,
            catalog: DeviceCatalog::new(),
            gate: Some(PermissionGate::new()),
            refresh: None,
            devices: platform.devices,
            display: platform.display,
            channel,
            sender,
            selected: None,
            detection_enabled,
            commands: command_rx,
            events: event_tx,
            log,
        };
        (
            client,
            ClientHandle { tx: command_tx },
            EventStream::new(event_rx),
        )
    }

    /// Session identity registered on the relay, if connected
    pub fn session_id(&self) -> Option<&SessionId> {
        self.overlay.local_session()
    }

    /// Overlay statistics
    pub fn overlay_stats(&self) -> &OverlayStats {
        self.overlay.stats()
    }

    /// Run until a `Shutdown` command arrives or every handle is dropped
    pub async fn run(mut self) {
        self.emit(ClientEvent::DetectionMode {
            enabled: self.detection_enabled,
        });
        if self.detection_enabled {
            self.log.info("Object detection enabled");
        } else {
            self.log.info("Local preview mode");
        }
        self.request_refresh();
        self.resize_surface();

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                event = next_channel_event(&mut self.channel) => self.handle_channel_event(event),
                input = self.lifecycle.next_input() => {
                    let result = self.lifecycle.handle_input(input);
                    self.report(result);
                }
                outcome = poll_refresh(&mut self.refresh) => {
                    self.refresh = None;
                    self.on_refresh(outcome);
                }
            }
            self.apply_lifecycle_events();
        }

        self.lifecycle.stop();
        self.apply_lifecycle_events();
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
        info!("Client stopped");
        self.emit(ClientEvent::Shutdown);
    }

    fn emit(&self, event: ClientEvent) {
        trace!("Client event: {}", event.event_type());
        let _ = self.events.send(event);
    }

    fn report(&self, result: Result<(), VidsenseError>) {
        if let Err(e) = result {
            self.log.report(&e);
        }
    }

    fn handle_command(&mut self, command: Command) {
        debug!("Command: {:?}", command);
        match command {
            Command::Start => self.start(),
            Command::Stop => self.stop(),
            Command::Toggle => {
                if self.lifecycle.is_idle() {
                    self.start();
                } else {
                    self.stop();
                }
            }
            Command::SelectDevice(device_id) => {
                self.select_device(device_id);
            }
            Command::SwitchDevice(device_id) => {
                let running = !self.lifecycle.is_idle();
                if self.select_device(device_id) && running {
                    self.lifecycle.stop();
                    self.apply_lifecycle_events();
                    self.start();
                }
            }
            Command::RefreshDevices => self.request_refresh(),
            Command::Resize | Command::VideoMetadataLoaded => self.resize_surface(),
            Command::Shutdown => {}
        }
    }

    fn start(&mut self) {
        match self.lifecycle.start(self.selected.as_deref()) {
            Ok(_) => self.log.info("Starting video"),
            Err(e) => self.log.report(&e),
        }
    }

    fn stop(&mut self) {
        self.lifecycle.stop();
        self.log.clear();
        self.log.info("Video stopped");
    }

    fn select_device(&mut self, device_id: String) -> bool {
        if self.catalog.get(&device_id).is_none() {
            self.log
                .warning(format!("Unknown video device {}", device_id));
            return false;
        }
        self.selected = Some(device_id.clone());
        self.emit(ClientEvent::DeviceSelected { device_id });
        true
    }

    fn request_refresh(&mut self) {
        let Some(mut gate) = self.gate.take() else {
            debug!("Device refresh already in flight");
            return;
        };
        let devices = Arc::clone(&self.devices);
        self.refresh = Some(Box::pin(async move {
            let result = match gate.ensure(devices.as_ref()).await {
                Ok(outcome) => {
                    debug!("Camera permission: {:?}", outcome);
                    enumerate(devices.as_ref()).await
                }
                Err(e) => Err(e),
            };
            (gate, result)
        }));
    }

    fn on_refresh(&mut self, (gate, result): RefreshOutcome) {
        self.gate = Some(gate);
        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.catalog.clear();
                self.log.report(&VidsenseError::from(e));
                self.log
                    .error("Unable to list cameras; check camera permissions and connections");
                self.emit(ClientEvent::DevicesUpdated {
                    devices: Vec::new(),
                });
                return;
            }
        };

        let devices = self.catalog.replace(snapshot).to_vec();
        info!("Found {} video input(s)", devices.len());

        let still_present = self
            .selected
            .as_deref()
            .is_some_and(|id| self.catalog.get(id).is_some());
        let fallback = self.catalog.first().map(|d| d.id.clone());
        self.emit(ClientEvent::DevicesUpdated { devices });

        if !still_present {
            self.selected = fallback.clone();
            if let Some(device_id) = fallback {
                self.emit(ClientEvent::DeviceSelected { device_id });
            }
        }
    }

    fn resize_surface(&mut self) {
        let size = self.display.layout_size();
        match self.overlay.resize(size) {
            Ok(Some(size)) => {
                self.emit(ClientEvent::SurfaceResized { size });
                if !self.detection_enabled {
                    return;
                }
                if let Some(sender) = &self.sender {
                    let message = OutboundMessage::SurfaceSize {
                        width: size.width,
                        height: size.height,
                    };
                    if let Err(e) = sender.send(message) {
                        debug!("Surface size not announced: {}", e);
                    }
                }
            }
            Ok(None) => {}
            Err(e) => self.log.report(&VidsenseError::from(e)),
        }
    }

    fn handle_channel_event(&mut self, event: Option<ChannelEvent>) {
        match event {
            Some(ChannelEvent::Message(message)) => self.handle_message(message),
            Some(ChannelEvent::Malformed { error, .. }) => {
                self.log
                    .warning(format!("Dropped malformed signaling message: {}", error));
            }
            Some(ChannelEvent::Disconnected { reason }) => self.on_disconnected(reason),
            None => self.on_disconnected("channel closed".to_string()),
        }
    }

    fn handle_message(&mut self, message: InboundMessage) {
        trace!("Inbound {} message", message.kind());
        match message {
            InboundMessage::Answer(description) => {
                let result = self.lifecycle.on_remote_answer(description);
                self.report(result);
            }
            InboundMessage::IceCandidate(candidate) => {
                let result = self.lifecycle.on_remote_candidate(candidate);
                self.report(result);
            }
            InboundMessage::Detections(payload) => self.on_detections(payload),
        }
    }

    fn on_detections(&mut self, payload: DetectionPayload) {
        let outcome = match payload {
            DetectionPayload::Event(event) => Ok(self.overlay.on_detection_event(&event)),
            DetectionPayload::Encoded(raw) => self.overlay.on_detection_payload(&raw),
        };
        match outcome {
            Ok(RenderOutcome::Drawn { boxes }) => self.emit(ClientEvent::OverlayDrawn { boxes }),
            Ok(other) => trace!("Detection event not drawn: {:?}", other),
            Err(e) => self.log.report(&e),
        }
    }

    fn on_disconnected(&mut self, reason: String) {
        self.log.report(&VidsenseError::Transport {
            reason: format!("signaling channel disconnected: {}", reason),
        });
        self.lifecycle.stop();
        self.lifecycle.disable_detection();
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
        self.sender = None;
        self.emit(ClientEvent::ChannelDisconnected { reason });
        if self.detection_enabled {
            self.detection_enabled = false;
            self.log.warning("Signaling lost; switching to local preview mode");
            self.emit(ClientEvent::DetectionMode { enabled: false });
        }
    }

    fn apply_lifecycle_events(&mut self) {
        for event in self.lifecycle.drain_events() {
            match event {
                LifecycleEvent::StateChanged(state) => {
                    self.emit(ClientEvent::StateChanged { state })
                }
                LifecycleEvent::GateClosed => self.overlay.close_gate(),
                LifecycleEvent::GateOpened => self.overlay.open_gate(),
                LifecycleEvent::GateReset => self.overlay.reset(),
                LifecycleEvent::IceStateChanged(state) => {
                    self.emit(ClientEvent::IceStateChanged { state })
                }
                LifecycleEvent::RemoteStreamAttached { stream_id } => {
                    self.emit(ClientEvent::RemoteStreamAttached { stream_id })
                }
                LifecycleEvent::LocalPreviewStarted { stream_id } => {
                    self.emit(ClientEvent::LocalPreviewStarted { stream_id })
                }
            }
        }
    }
}

async fn next_channel_event(channel: &mut Option<SignalingChannel>) -> Option<ChannelEvent> {
    match channel {
        Some(channel) => channel.next_event().await,
        None => std::future::pending().await,
    }
}

async fn poll_refresh(refresh: &mut Option<BoxFuture<'static, RefreshOutcome>>) -> RefreshOutcome {
    match refresh.as_mut() {
        Some(operation) => operation.await,
        None => std::future::pending().await,
    }
}
