//! Integration tests for the in-memory signaling channel

use std::time::Duration;
use tokio_test::assert_err;
use vidsense_core::SessionId;
use vidsense_signaling::*;

#[tokio::test]
async fn test_register_is_sent_first() {
    let (channel, mut relay) = SignalingChannel::in_memory(SessionId::from("client-1"));
    assert_eq!(channel.session_id().as_str(), "client-1");

    let first = relay.recv().await.unwrap();
    assert_eq!(
        first,
        OutboundMessage::Register {
            session_id: "client-1".to_string()
        }
    );
}

#[tokio::test]
async fn test_sender_is_cloneable_and_ordered() {
    let (channel, mut relay) = SignalingChannel::in_memory(SessionId::generate());
    relay.drain();

    let a = channel.sender();
    let b = a.clone();
    a.send(OutboundMessage::Offer(SessionDescription::offer("v=0")))
        .unwrap();
    b.send(OutboundMessage::SurfaceSize {
        width: 10,
        height: 20,
    })
    .unwrap();

    let kinds: Vec<_> = relay.drain().iter().map(|m| m.kind()).collect();
    assert_eq!(kinds, vec!["sdp", "surface_size"]);
}

#[tokio::test]
async fn test_inbound_messages_and_malformed_frames() {
    let (mut channel, relay) = SignalingChannel::in_memory(SessionId::generate());

    assert!(relay.deliver(InboundMessage::Answer(SessionDescription::answer("v=0"))));
    assert!(relay.deliver_raw("{ broken"));
    assert!(relay.disconnect("relay restarted"));

    assert!(matches!(
        channel.next_event().await,
        Some(ChannelEvent::Message(InboundMessage::Answer(_)))
    ));
    assert!(matches!(
        channel.next_event().await,
        Some(ChannelEvent::Malformed { .. })
    ));
    assert_eq!(
        channel.next_event().await,
        Some(ChannelEvent::Disconnected {
            reason: "relay restarted".to_string()
        })
    );
}

#[tokio::test]
async fn test_send_after_relay_dropped() {
    let (channel, relay) = SignalingChannel::in_memory(SessionId::generate());
    drop(relay);

    let err = assert_err!(channel
        .sender()
        .send(OutboundMessage::SurfaceSize { width: 1, height: 1 }));
    assert_eq!(err, SignalingError::Closed);
}

#[tokio::test]
async fn test_connect_to_unreachable_relay() {
    // Nothing listens on port 9 locally
    let result = SignalingChannel::connect("ws://127.0.0.1:9", Duration::from_secs(2)).await;
    assert!(result.is_err());
}
