//! Platform fakes shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use vidsense::*;
use vidsense_signaling::{SignalingError, SignalingSink};

// ============================================================================
// MEDIA
// ============================================================================

#[derive(Debug)]
pub struct FakeTrack {
    id: String,
    live: AtomicBool,
    fail_stop: bool,
}

impl FakeTrack {
    pub fn new(id: &str, fail_stop: bool) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            live: AtomicBool::new(true),
            fail_stop,
        })
    }
}

impl MediaTrack for FakeTrack {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn kind(&self) -> TrackKind {
        TrackKind::Video
    }

    fn stop(&self) -> Result<(), MediaError> {
        self.live.store(false, Ordering::SeqCst);
        if self.fail_stop {
            return Err(MediaError::TrackStopFailed {
                track_id: self.id.clone(),
                reason: "driver refused".to_string(),
            });
        }
        Ok(())
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

pub fn stream_of(id: &str, tracks: Vec<Arc<FakeTrack>>) -> MediaStream {
    let tracks: Vec<Arc<dyn MediaTrack>> = tracks
        .into_iter()
        .map(|t| t as Arc<dyn MediaTrack>)
        .collect();
    MediaStream::new(id, tracks)
}

pub struct FakeDevices {
    pub devices: Vec<MediaDeviceInfo>,
    pub hold: Option<Arc<Notify>>,
    pub fail_acquire: bool,
    pub fail_stop: bool,
    acquired: Mutex<Vec<Arc<FakeTrack>>>,
    constraints: Mutex<Vec<MediaConstraints>>,
    counter: AtomicUsize,
}

impl FakeDevices {
    pub fn new() -> Self {
        Self {
            devices: vec![
                MediaDeviceInfo::video("cam-1", "Front"),
                MediaDeviceInfo::video("cam-2", ""),
            ],
            hold: None,
            fail_acquire: false,
            fail_stop: false,
            acquired: Mutex::new(Vec::new()),
            constraints: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(0),
        }
    }

    pub fn tracks(&self) -> Vec<Arc<FakeTrack>> {
        self.acquired.lock().clone()
    }

    pub fn live_tracks(&self) -> usize {
        self.acquired.lock().iter().filter(|t| t.is_live()).count()
    }

    pub fn constraints(&self) -> Vec<MediaConstraints> {
        self.constraints.lock().clone()
    }
}

#[async_trait]
impl MediaDevices for FakeDevices {
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, MediaError> {
        Ok(self.devices.clone())
    }

    async fn query_permission(&self) -> Result<PermissionState, MediaError> {
        Ok(PermissionState::Granted)
    }

    async fn get_user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<MediaStream, MediaError> {
        self.constraints.lock().push(constraints);
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        if self.fail_acquire {
            return Err(MediaError::PermissionDenied {
                operation: "getUserMedia".to_string(),
            });
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let track = FakeTrack::new(&format!("track-{}", n), self.fail_stop);
        self.acquired.lock().push(Arc::clone(&track));
        Ok(stream_of(&format!("local-{}", n), vec![track]))
    }
}

// ============================================================================
// PEER CONNECTIONS
// ============================================================================

pub struct FakePeer {
    pub id: usize,
    pub observer: PeerObserver,
    open: AtomicBool,
    fail_close: bool,
    pub tracks: Mutex<Vec<String>>,
    pub local: Mutex<Option<SessionDescription>>,
    pub remote: Mutex<Option<SessionDescription>>,
    pub candidates: Mutex<Vec<IceCandidate>>,
}

#[async_trait]
impl PeerConnection for FakePeer {
    fn add_track(
        &self,
        track: Arc<dyn MediaTrack>,
        _stream: &MediaStream,
    ) -> Result<(), VidsenseError> {
        self.tracks.lock().push(track.id());
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription, VidsenseError> {
        Ok(SessionDescription::offer(format!("offer-{}", self.id)))
    }

    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), VidsenseError> {
        *self.local.lock() = Some(description);
        Ok(())
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), VidsenseError> {
        if !self.is_open() {
            return Err(VidsenseError::Negotiation {
                reason: "connection closed".to_string(),
            });
        }
        *self.remote.lock() = Some(description);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), VidsenseError> {
        self.candidates.lock().push(candidate);
        Ok(())
    }

    fn close(&self) -> Result<(), VidsenseError> {
        self.open.store(false, Ordering::SeqCst);
        if self.fail_close {
            return Err(VidsenseError::Transport {
                reason: "close raised".to_string(),
            });
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct FakePeerFactory {
    pub fail_close: bool,
    peers: Mutex<Vec<Arc<FakePeer>>>,
}

impl FakePeerFactory {
    pub fn failing_close() -> Self {
        Self {
            fail_close: true,
            ..Self::default()
        }
    }

    pub fn created(&self) -> usize {
        self.peers.lock().len()
    }

    pub fn live(&self) -> usize {
        self.peers.lock().iter().filter(|p| p.is_open()).count()
    }

    pub fn last(&self) -> Arc<FakePeer> {
        self.peers.lock().last().cloned().expect("no peer connection created")
    }

    pub fn get(&self, index: usize) -> Arc<FakePeer> {
        Arc::clone(&self.peers.lock()[index])
    }
}

impl PeerConnectionFactory for FakePeerFactory {
    fn create(
        &self,
        _config: &PeerConfig,
        observer: PeerObserver,
    ) -> Result<Arc<dyn PeerConnection>, VidsenseError> {
        let mut peers = self.peers.lock();
        let peer = Arc::new(FakePeer {
            id: peers.len(),
            observer,
            open: AtomicBool::new(true),
            fail_close: self.fail_close,
            tracks: Mutex::new(Vec::new()),
            local: Mutex::new(None),
            remote: Mutex::new(None),
            candidates: Mutex::new(Vec::new()),
        });
        peers.push(Arc::clone(&peer));
        let peer: Arc<dyn PeerConnection> = peer;
        Ok(peer)
    }
}

// ============================================================================
// DISPLAY, SURFACE AND SIGNALING
// ============================================================================

pub struct FakeDisplay {
    source: Mutex<Option<VideoSource>>,
    size: Mutex<SurfaceSize>,
}

impl FakeDisplay {
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            source: Mutex::new(None),
            size: Mutex::new(size),
        }
    }

    pub fn set_layout_size(&self, size: SurfaceSize) {
        *self.size.lock() = size;
    }

    pub fn source(&self) -> Option<VideoSource> {
        self.source.lock().clone()
    }
}

impl VideoElement for FakeDisplay {
    fn set_source(&self, source: Option<VideoSource>) {
        *self.source.lock() = source;
    }

    fn current_stream_id(&self) -> Option<String> {
        self.source.lock().as_ref().map(|s| s.stream_id().to_string())
    }

    fn layout_size(&self) -> SurfaceSize {
        *self.size.lock()
    }
}

#[derive(Clone, Default)]
pub struct RecordingSurface {
    rects: Arc<Mutex<Vec<BoundingBox>>>,
    clears: Arc<AtomicUsize>,
}

impl RecordingSurface {
    pub fn rects(&self) -> Vec<BoundingBox> {
        self.rects.lock().clone()
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl DrawingSurface for RecordingSurface {
    fn resize(&mut self, _size: SurfaceSize) -> Result<(), MediaError> {
        Ok(())
    }

    fn clear(&mut self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }

    fn stroke_rect(&mut self, rect: &BoundingBox, _style: &OverlayStyle) {
        self.rects.lock().push(*rect);
    }

    fn fill_text(&mut self, _text: &str, _x: f64, _y: f64, _style: &OverlayStyle) {}
}

#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<OutboundMessage>>,
}

impl RecordingSink {
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().clone()
    }

    pub fn offers(&self) -> usize {
        self.sent
            .lock()
            .iter()
            .filter(|m| matches!(m, OutboundMessage::Offer(_)))
            .count()
    }
}

impl SignalingSink for RecordingSink {
    fn send(&self, message: OutboundMessage) -> Result<(), SignalingError> {
        self.sent.lock().push(message);
        Ok(())
    }
}

// ============================================================================
// HELPERS
// ============================================================================

pub fn detections_for(session: &str, confidence: f32) -> DetectionEvent {
    DetectionEvent {
        session_id: session.to_string(),
        reference_width: 640.0,
        reference_height: 480.0,
        detections: vec![Detection {
            bounding_box: BoundingBox::new(100.0, 100.0, 200.0, 200.0),
            confidence,
            class_id: 0,
            class_name: Some("person".to_string()),
        }],
    }
}

/// Feed inputs to the lifecycle until nothing arrives for a short while, returning
/// every error the handlers produced
pub async fn drive(lifecycle: &mut ConnectionLifecycle) -> Vec<VidsenseError> {
    let mut errors = Vec::new();
    while let Ok(input) =
        tokio::time::timeout(Duration::from_millis(50), lifecycle.next_input()).await
    {
        if let Err(e) = lifecycle.handle_input(input) {
            errors.push(e);
        }
    }
    errors
}

/// Wait for the first event matching `predicate`
pub async fn wait_for<F>(events: &mut EventStream, predicate: F) -> ClientEvent
where
    F: Fn(&ClientEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match events.next().await {
                Some(event) if predicate(&event) => return event,
                Some(_) => continue,
                None => panic!("event stream closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for client event")
}
