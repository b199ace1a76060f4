//! End-to-end tests for WebSocket upgrade forwarding.

use std::time::Duration;

use dynamic_proxy::config::ProxyConfig;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

mod common;
use common::EchoEvent;

#[tokio::test]
async fn test_text_and_binary_frames_round_trip() {
    let (backend, mut events) = common::start_echo_backend().await;
    let proxy = common::spawn_proxy().await;

    let (mut socket, _) = tokio_tungstenite::connect_async(proxy.ws_url(&format!("/api/ws/{backend}/")))
        .await
        .unwrap();

    socket.send(Message::Text("hello".into())).await.unwrap();
    let reply = socket.next().await.unwrap().unwrap();
    assert_eq!(reply, Message::Text("hello".into()));

    socket.send(Message::Binary(vec![1u8, 2, 3].into())).await.unwrap();
    let reply = socket.next().await.unwrap().unwrap();
    assert_eq!(reply, Message::Binary(vec![1u8, 2, 3].into()));

    assert_eq!(
        events.recv().await.unwrap(),
        EchoEvent::Handshake {
            host: backend.to_string(),
            user_agent: "solace-browser-client".to_string(),
            protocol: String::new(),
        }
    );
}

#[tokio::test]
async fn test_client_close_reaches_upstream() {
    let (backend, mut events) = common::start_echo_backend().await;
    let proxy = common::spawn_proxy().await;

    let (mut socket, _) = tokio_tungstenite::connect_async(proxy.ws_url(&format!("/api/ws/{backend}/")))
        .await
        .unwrap();
    assert!(matches!(events.recv().await, Some(EchoEvent::Handshake { .. })));

    let sessions = proxy.sessions.clone();
    assert!(common::wait_until(Duration::from_secs(2), || sessions.active_count() == 1).await);

    socket.close(None).await.unwrap();

    let closed = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("upstream should see the close");
    assert_eq!(closed, Some(EchoEvent::Closed));
    assert!(common::wait_until(Duration::from_secs(2), || sessions.active_count() == 0).await);
}

#[tokio::test]
async fn test_http_scheme_segment_reaches_upstream_over_ws() {
    let (backend, _events) = common::start_echo_backend().await;
    let proxy = common::spawn_proxy().await;

    let (mut socket, _) = tokio_tungstenite::connect_async(proxy.ws_url(&format!("/api/http/{backend}")))
        .await
        .unwrap();

    socket.send(Message::Text("ping".into())).await.unwrap();
    assert_eq!(socket.next().await.unwrap().unwrap(), Message::Text("ping".into()));
}

#[tokio::test]
async fn test_upgrade_to_dead_upstream_is_rejected() {
    let dead = common::dead_address().await;
    let proxy = common::spawn_proxy().await;

    let result = tokio_tungstenite::connect_async(proxy.ws_url(&format!("/api/ws/{dead}/"))).await;

    match result.map(|_| ()) {
        Err(WsError::Http(response)) => assert_eq!(response.status().as_u16(), 500),
        other => panic!("expected HTTP rejection, got {other:?}"),
    }
    assert_eq!(proxy.sessions.active_count(), 0);
}

#[tokio::test]
async fn test_upgrade_with_malformed_path_is_rejected() {
    let proxy = common::spawn_proxy().await;

    let result = tokio_tungstenite::connect_async(proxy.ws_url("/api/ws/")).await;

    match result.map(|_| ()) {
        Err(WsError::Http(response)) => assert_eq!(response.status().as_u16(), 400),
        other => panic!("expected HTTP rejection, got {other:?}"),
    }
}

/// Read until the socket closes, returning the data frames seen on the way.
async fn drain_until_closed<S>(socket: &mut S) -> Vec<Message>
where
    S: futures_util::Stream<Item = Result<Message, WsError>> + Unpin,
{
    let mut frames = Vec::new();
    while let Some(Ok(message)) = socket.next().await {
        if message.is_close() {
            break;
        }
        frames.push(message);
    }
    frames
}

#[tokio::test]
async fn test_upstream_close_reaches_client() {
    let backend = common::start_closing_backend("hi").await;
    let proxy = common::spawn_proxy().await;

    let (mut socket, _) = tokio_tungstenite::connect_async(proxy.ws_url(&format!("/api/ws/{backend}/")))
        .await
        .unwrap();

    let frames = tokio::time::timeout(Duration::from_secs(5), drain_until_closed(&mut socket))
        .await
        .expect("client should see the upstream close");
    assert_eq!(frames, vec![Message::Text("hi".into())]);

    let sessions = proxy.sessions.clone();
    assert!(common::wait_until(Duration::from_secs(2), || sessions.active_count() == 0).await);
}

#[tokio::test]
async fn test_idle_session_is_closed_on_both_sides() {
    let (backend, mut events) = common::start_echo_backend().await;
    let mut config = ProxyConfig::default();
    config.timeouts.ws_idle_secs = 1;
    let proxy = common::spawn_proxy_with(config).await;

    let (mut socket, _) = tokio_tungstenite::connect_async(proxy.ws_url(&format!("/api/ws/{backend}/")))
        .await
        .unwrap();
    assert!(matches!(events.recv().await, Some(EchoEvent::Handshake { .. })));

    let frames = tokio::time::timeout(Duration::from_secs(5), drain_until_closed(&mut socket))
        .await
        .expect("idle session should be closed toward the client");
    assert!(frames.is_empty());

    let closed = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("idle session should be closed toward the upstream");
    assert_eq!(closed, Some(EchoEvent::Closed));
}

#[tokio::test]
async fn test_subprotocol_offer_and_selection_cross_the_proxy() {
    let (backend, mut events) = common::start_echo_backend().await;
    let proxy = common::spawn_proxy().await;

    let mut request = proxy
        .ws_url(&format!("/api/ws/{backend}/"))
        .into_client_request()
        .unwrap();
    request
        .headers_mut()
        .insert("sec-websocket-protocol", HeaderValue::from_static("mqtt, v12.stomp"));

    let (mut socket, response) = tokio_tungstenite::connect_async(request).await.unwrap();
    assert_eq!(response.headers()["sec-websocket-protocol"], "mqtt");

    match events.recv().await {
        Some(EchoEvent::Handshake { protocol, .. }) => assert_eq!(protocol, "mqtt, v12.stomp"),
        other => panic!("unexpected event: {other:?}"),
    }

    socket.send(Message::Text("over mqtt".into())).await.unwrap();
    assert_eq!(socket.next().await.unwrap().unwrap(), Message::Text("over mqtt".into()));
}

#[tokio::test]
async fn test_ping_is_answered_once() {
    let (backend, _events) = common::start_echo_backend().await;
    let proxy = common::spawn_proxy().await;

    let (mut socket, _) = tokio_tungstenite::connect_async(proxy.ws_url(&format!("/api/ws/{backend}/")))
        .await
        .unwrap();

    socket.send(Message::Ping(vec![7u8].into())).await.unwrap();
    socket.send(Message::Text("marker".into())).await.unwrap();

    let mut pongs = 0;
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("echo should arrive")
            .unwrap()
            .unwrap();
        match message {
            Message::Pong(_) => pongs += 1,
            Message::Text(text) if text.as_str() == "marker" => break,
            other => panic!("unexpected message: {other:?}"),
        }
    }
    // The echoed marker trails the upstream round trip, so a forwarded
    // upstream Pong would already have arrived.
    assert_eq!(pongs, 1);
}
