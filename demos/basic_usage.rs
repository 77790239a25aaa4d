//! Basic usage example for vidsense
//!
//! Runs a client against in-process stand-ins for the camera, the peer connection and
//! the overlay canvas. Without `VIDSENSE_FEATURES_URL` the client comes up in local
//! preview; point it at a server's config endpoint (and set `VIDSENSE_SIGNALING_URL`)
//! to exercise the detection path.
//!
//! ```text
//! cargo run --example basic_usage
//! VIDSENSE_FEATURES_URL=http://localhost:8080/config \
//!     VIDSENSE_SIGNALING_URL=ws://localhost:8080/ws cargo run --example basic_usage
//! ```

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vidsense::{
    BoundingBox, ClientBuilder, ClientEvent, DrawingSurface, IceCandidate, IceConnectionState,
    MediaConstraints, MediaDeviceInfo, MediaDevices, MediaError, MediaStream, MediaTrack,
    OverlayStyle, PeerConfig, PeerConnection, PeerConnectionFactory, PeerObserver,
    PermissionState, Platform, SessionDescription, SurfaceSize, TrackKind, VideoElement,
    VideoSource, Vidsense, VidsenseError,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("vidsense basic usage");
    println!("====================");

    let mut builder = ClientBuilder::new()
        .grace_period(Some(Duration::from_millis(500)))
        .log_filter("vidsense=debug,info");
    if let Ok(url) = std::env::var("VIDSENSE_FEATURES_URL") {
        builder = builder.features_endpoint(&url);
    }
    if let Ok(url) = std::env::var("VIDSENSE_SIGNALING_URL") {
        builder = builder.signaling_server(&url);
    }
    let vidsense = Vidsense::init_with(builder.build()?)?;

    let platform = Platform {
        devices: Arc::new(DemoCamera),
        peers: Arc::new(LoopbackPeers),
        display: Arc::new(ConsoleDisplay::default()),
        surface: Box::new(ConsoleSurface),
    };
    let (client, handle, mut events) = vidsense.connect(platform).await?;
    let task = tokio::spawn(client.run());

    let outcome = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(event) = events.next().await {
            println!("event: {:?}", event);
            match event {
                ClientEvent::DeviceSelected { .. } => handle.start()?,
                ClientEvent::LocalPreviewStarted { stream_id } => {
                    println!("Previewing {}", stream_id);
                    break;
                }
                ClientEvent::RemoteStreamAttached { stream_id } => {
                    println!("Showing processed stream {}", stream_id);
                    break;
                }
                _ => {}
            }
        }
        Ok::<(), VidsenseError>(())
    })
    .await;
    match outcome {
        Ok(result) => result?,
        Err(_) => println!("No stream after 5s; shutting down"),
    }

    handle.stop()?;
    handle.shutdown()?;
    task.await?;
    println!("Done");
    Ok(())
}

/// One built-in camera that always grants access
struct DemoCamera;

#[async_trait]
impl MediaDevices for DemoCamera {
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, MediaError> {
        Ok(vec![MediaDeviceInfo::video("demo-cam", "Demo Camera")])
    }

    async fn query_permission(&self) -> Result<PermissionState, MediaError> {
        Ok(PermissionState::Granted)
    }

    async fn get_user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<MediaStream, MediaError> {
        println!("Opening camera with {:?}", constraints);
        let track: Arc<dyn MediaTrack> = Arc::new(DemoTrack {
            live: AtomicBool::new(true),
        });
        Ok(MediaStream::new("demo-stream", vec![track]))
    }
}

#[derive(Debug)]
struct DemoTrack {
    live: AtomicBool,
}

impl MediaTrack for DemoTrack {
    fn id(&self) -> String {
        "demo-video".to_string()
    }

    fn kind(&self) -> TrackKind {
        TrackKind::Video
    }

    fn stop(&self) -> Result<(), MediaError> {
        println!("Camera track stopped");
        self.live.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

/// Peer connections that answer their own offers with a single host candidate
struct LoopbackPeers;

impl PeerConnectionFactory for LoopbackPeers {
    fn create(
        &self,
        config: &PeerConfig,
        observer: PeerObserver,
    ) -> Result<Arc<dyn PeerConnection>, VidsenseError> {
        println!("New peer connection with ICE servers {:?}", config.ice_servers);
        Ok(Arc::new(LoopbackPeer {
            observer,
            open: AtomicBool::new(true),
        }))
    }
}

struct LoopbackPeer {
    observer: PeerObserver,
    open: AtomicBool,
}

#[async_trait]
impl PeerConnection for LoopbackPeer {
    fn add_track(
        &self,
        track: Arc<dyn MediaTrack>,
        stream: &MediaStream,
    ) -> Result<(), VidsenseError> {
        println!("Sending track {} from {}", track.id(), stream.id());
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription, VidsenseError> {
        Ok(SessionDescription::offer("v=0\r\ns=vidsense-demo\r\n"))
    }

    async fn set_local_description(
        &self,
        _description: SessionDescription,
    ) -> Result<(), VidsenseError> {
        self.observer.on_local_candidate(Some(IceCandidate {
            sdp_mid: Some("0".to_string()),
            sdp_m_line_index: Some(0),
            candidate: "candidate:1 1 udp 2122260223 127.0.0.1 50000 typ host".to_string(),
        }));
        self.observer.on_local_candidate(None);
        Ok(())
    }

    async fn set_remote_description(
        &self,
        _description: SessionDescription,
    ) -> Result<(), VidsenseError> {
        self.observer
            .on_ice_state_change(IceConnectionState::Connected);
        let track: Arc<dyn MediaTrack> = Arc::new(DemoTrack {
            live: AtomicBool::new(true),
        });
        self.observer
            .on_track(Some(MediaStream::new("processed", vec![track])));
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), VidsenseError> {
        println!("Remote candidate {}", candidate.candidate);
        Ok(())
    }

    fn close(&self) -> Result<(), VidsenseError> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct ConsoleDisplay {
    source: Mutex<Option<String>>,
}

impl VideoElement for ConsoleDisplay {
    fn set_source(&self, source: Option<VideoSource>) {
        let id = source.map(|s| s.stream_id().to_string());
        println!("Video element source: {:?}", id);
        if let Ok(mut current) = self.source.lock() {
            *current = id;
        }
    }

    fn current_stream_id(&self) -> Option<String> {
        self.source.lock().ok().and_then(|s| s.clone())
    }

    fn layout_size(&self) -> SurfaceSize {
        SurfaceSize::new(640, 480)
    }
}

struct ConsoleSurface;

impl DrawingSurface for ConsoleSurface {
    fn resize(&mut self, size: SurfaceSize) -> Result<(), MediaError> {
        println!("Overlay resized to {}x{}", size.width, size.height);
        Ok(())
    }

    fn clear(&mut self) {}

    fn stroke_rect(&mut self, rect: &BoundingBox, _style: &OverlayStyle) {
        println!("Box at {:?}", rect);
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, _style: &OverlayStyle) {
        println!("Label {} at ({:.0}, {:.0})", text, x, y);
    }
}
