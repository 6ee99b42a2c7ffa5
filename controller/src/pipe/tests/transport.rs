use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use shared::{ChannelIdentity, Message};

use super::{connected, listening, CONNECT_TIMEOUT};
use crate::pipe::framing::MAX_FRAME_LEN;
use crate::pipe::{PipePeer, TransportEvent};

#[tokio::test]
async fn test_send_without_peer_fails() {
    let (_dir, transport) = listening("lonely").await;

    assert!(!transport.is_connected());
    assert!(!transport.send(&Message::ping()).await);
}

#[tokio::test]
async fn test_ping_without_peer_fails_at_timeout() {
    let (_dir, transport) = listening("lonely").await;
    let timeout = Duration::from_millis(200);

    let started = Instant::now();
    let healthy = transport.ping(timeout).await;
    let elapsed = started.elapsed();

    assert!(!healthy);
    assert!(elapsed >= timeout, "resolved after {elapsed:?}, before the timeout");
    assert!(elapsed < timeout + Duration::from_secs(1), "resolved after {elapsed:?}");
}

#[tokio::test]
async fn test_ping_answered_by_peer() {
    let (_dir, transport, _peer) = connected("dbot").await;

    assert!(transport.ping(CONNECT_TIMEOUT).await);
}

#[tokio::test]
async fn test_messages_delivered_in_order() {
    let (_dir, transport, peer) = connected("dbot").await;
    let mut events = transport.subscribe();

    for name in ["a", "b", "c"] {
        assert!(peer.send(&Message::new("speaking", name).unwrap()).await);
    }

    let mut received = Vec::new();
    while received.len() < 3 {
        match tokio::time::timeout(CONNECT_TIMEOUT, events.recv()).await {
            Ok(Ok(TransportEvent::Message(message))) => received.push(message.payload().to_string()),
            Ok(Ok(TransportEvent::ConnectionError(e))) => panic!("unexpected error event: {e}"),
            other => panic!("no event: {other:?}"),
        }
    }
    assert_eq!(received, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_malformed_frames_are_dropped() {
    let (_dir, transport) = listening("vrelay").await;
    let mut events = transport.subscribe();

    let mut raw = UnixStream::connect(transport.endpoint().inbound_path()).await.unwrap();
    raw.write_all(b";no command\n\xff\xfe\n\ninfo;1,2\n").await.unwrap();

    let event = tokio::time::timeout(CONNECT_TIMEOUT, events.recv()).await.unwrap().unwrap();
    match event {
        TransportEvent::Message(message) => {
            assert_eq!(message.command(), "info");
            assert_eq!(message.payload(), "1,2");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn test_oversized_frames_are_dropped() {
    let (_dir, transport) = listening("vrelay").await;
    let mut events = transport.subscribe();

    let mut raw = UnixStream::connect(transport.endpoint().inbound_path()).await.unwrap();
    let mut bytes = b"speaking;".to_vec();
    bytes.extend(std::iter::repeat(b'a').take(MAX_FRAME_LEN * 2));
    bytes.extend_from_slice(b"\ninfo;1,2\n");
    raw.write_all(&bytes).await.unwrap();

    let event = tokio::time::timeout(CONNECT_TIMEOUT, events.recv()).await.unwrap().unwrap();
    match event {
        TransportEvent::Message(message) => assert_eq!(message.command(), "info"),
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn test_one_pong_per_ping() {
    let (_dir, transport) = listening("vrelay").await;

    let reader = UnixStream::connect(transport.endpoint().outbound_path()).await.unwrap();
    assert!(transport.wait_for_peer(CONNECT_TIMEOUT).await);
    let mut writer = UnixStream::connect(transport.endpoint().inbound_path()).await.unwrap();

    writer.write_all(&b"ping;\n".repeat(5)).await.unwrap();

    let mut lines = BufReader::new(reader).lines();
    for _ in 0..5 {
        let line = tokio::time::timeout(CONNECT_TIMEOUT, lines.next_line())
            .await
            .expect("pong in time")
            .unwrap()
            .unwrap();
        assert_eq!(line, "pong;");
    }

    let extra = tokio::time::timeout(Duration::from_millis(200), lines.next_line()).await;
    assert!(extra.is_err(), "more pongs than pings");
}

#[tokio::test]
async fn test_send_for_reply_matches_command() {
    let (_dir, transport, mut peer) = connected("dbot").await;

    let child = tokio::spawn(async move {
        let request = peer.recv_timeout(CONNECT_TIMEOUT).await.expect("info request");
        assert_eq!(request, Message::info_request());
        peer.send(&Message::new("speaking", "_").unwrap()).await;
        peer.send(&Message::new("info", "1,2").unwrap()).await;
        peer
    });

    let reply = transport
        .send_for_reply(&Message::info_request(), "info", CONNECT_TIMEOUT)
        .await
        .expect("reply");
    assert_eq!(reply.payload(), "1,2");
    assert_eq!(reply.parse(), shared::Command::Info(ChannelIdentity::new("1", "2")));

    child.await.unwrap();
}

#[tokio::test]
async fn test_send_for_reply_times_out() {
    let (_dir, transport, _peer) = connected("dbot").await;

    let reply = transport
        .send_for_reply(&Message::info_request(), "info", Duration::from_millis(100))
        .await;

    assert!(reply.is_none());
}

#[tokio::test]
async fn test_reconnect_replaces_peer() {
    let (_dir, transport, mut first) = connected("dbot").await;
    let mut second = PipePeer::connect(transport.endpoint()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(transport.send(&Message::leave()).await);

    assert_eq!(second.recv_timeout(CONNECT_TIMEOUT).await, Some(Message::leave()));
    assert_eq!(first.recv_timeout(Duration::from_millis(100)).await, None);
}

#[tokio::test]
async fn test_peer_disconnect_fails_fast() {
    let (_dir, transport, peer) = connected("dbot").await;
    drop(peer);

    let started = Instant::now();
    let healthy = transport.ping(Duration::from_secs(5)).await;

    assert!(!healthy);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!transport.is_connected());
}
