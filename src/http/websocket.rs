//! WebSocket proxy handling.
//!
//! # Responsibilities
//! - Establish the upstream WebSocket before accepting the client upgrade
//! - Complete upgrade handshake with client
//! - Bidirectional frame forwarding
//! - Close both sockets when either side ends or the session goes idle
//!
//! # Data Flow
//! ```text
//! Client ←──── WebSocket frames ────→ Proxy ←──── WebSocket frames ────→ Broker
//! ```
//!
//! # Design Decisions
//! - Upstream handshake first: a failure rejects the upgrade before any
//!   bytes are spliced
//! - Frame-level forwarding (no message buffering), text/binary type kept
//! - Both directions copy concurrently so one slow side cannot stall the other
//! - Close frames propagated in both directions
//! - Pings cross the proxy; Pongs do not. Each socket already answers its
//!   own peer's Ping, so a forwarded Pong would be a duplicate

use axum::extract::ws::{self, Message, WebSocket, WebSocketUpgrade};
use axum::http::header::{self, HeaderName};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame as UpstreamCloseFrame;
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream};

use crate::config::{TimeoutConfig, UpstreamConfig};
use crate::http::response::ProxyError;
use crate::net::session::{SessionGuard, SessionTracker};
use crate::resilience::timeouts::with_deadline;
use crate::routing::Route;

type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Client handshake headers carried over to the upstream handshake.
const FORWARDED_HANDSHAKE_HEADERS: [HeaderName; 3] = [
    header::SEC_WEBSOCKET_PROTOCOL,
    header::AUTHORIZATION,
    header::COOKIE,
];

/// Opens upstream WebSockets and splices them to accepted client sockets.
#[derive(Debug, Clone)]
pub struct WebSocketForwarder {
    user_agent: HeaderValue,
    connect_timeout: Duration,
    idle_timeout: Duration,
    accept_invalid_certs: bool,
    sessions: SessionTracker,
}

impl WebSocketForwarder {
    pub fn new(upstream: &UpstreamConfig, timeouts: &TimeoutConfig, sessions: SessionTracker) -> Self {
        Self {
            user_agent: HeaderValue::from_str(&upstream.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("dynamic-proxy")),
            connect_timeout: timeouts.connect(),
            idle_timeout: timeouts.ws_idle(),
            accept_invalid_certs: upstream.accept_invalid_certs,
            sessions,
        }
    }

    pub fn sessions(&self) -> &SessionTracker {
        &self.sessions
    }

    /// Connect upstream, then accept the client upgrade and splice.
    ///
    /// Returns the `101 Switching Protocols` response; the splice itself runs
    /// on the upgraded connection after this returns.
    pub async fn forward_upgrade(
        &self,
        route: Route,
        upgrade: WebSocketUpgrade,
        inbound: &HeaderMap,
    ) -> Result<Response, ProxyError> {
        let target = route.target();
        let (upstream, protocol) = self.connect(&route, inbound).await?;

        let upgrade = match protocol {
            Some(protocol) => upgrade.protocols([protocol]),
            None => upgrade,
        };

        let guard = self.sessions.track();
        let idle_timeout = self.idle_timeout;
        let failed_target = target.clone();

        Ok(upgrade
            .on_failed_upgrade(move |e| {
                tracing::warn!(target = %failed_target, error = %e, "Client upgrade failed after upstream connected");
            })
            .on_upgrade(move |client| splice(client, upstream, idle_timeout, guard, target)))
    }

    /// Open the upstream WebSocket within the connect timeout.
    ///
    /// Also returns the subprotocol the broker selected, if any.
    async fn connect(
        &self,
        route: &Route,
        inbound: &HeaderMap,
    ) -> Result<(UpstreamSocket, Option<String>), ProxyError> {
        let target = route.target();
        let url = route.upstream_url(None);

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| ProxyError::upgrade_rejected(&target, e))?;

        let headers = request.headers_mut();
        let host = HeaderValue::from_str(route.hostport())
            .map_err(|e| ProxyError::upgrade_rejected(&target, e))?;
        headers.insert(header::HOST, host);
        headers.insert(header::USER_AGENT, self.user_agent.clone());
        for name in FORWARDED_HANDSHAKE_HEADERS {
            for value in inbound.get_all(&name) {
                headers.append(name.clone(), value.clone());
            }
        }

        let connector = self
            .tls_connector(route)
            .map_err(|e| ProxyError::upgrade_rejected(&target, e))?;

        tracing::debug!(url = %url, "Opening upstream WebSocket");

        let (socket, response) = with_deadline(
            self.connect_timeout,
            tokio_tungstenite::connect_async_tls_with_config(request, None, false, connector),
        )
        .await
        .map_err(|e| ProxyError::upgrade_rejected(&target, e))?;

        let protocol = response
            .headers()
            .get(header::SEC_WEBSOCKET_PROTOCOL)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        Ok((socket, protocol))
    }

    /// A permissive TLS connector for `wss` targets when certificate
    /// checks are disabled; `None` means the library default.
    fn tls_connector(&self, route: &Route) -> Result<Option<Connector>, native_tls::Error> {
        if !(route.scheme().is_secure() && self.accept_invalid_certs) {
            return Ok(None);
        }
        let connector = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()?;
        Ok(Some(Connector::NativeTls(connector)))
    }
}

/// Why a spliced session ended.
#[derive(Debug)]
enum SessionEnd {
    ClientClosed,
    UpstreamClosed,
    ClientError(String),
    UpstreamError(String),
    Idle(Duration),
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEnd::ClientClosed => write!(f, "client closed"),
            SessionEnd::UpstreamClosed => write!(f, "upstream closed"),
            SessionEnd::ClientError(e) => write!(f, "client error: {e}"),
            SessionEnd::UpstreamError(e) => write!(f, "upstream error: {e}"),
            SessionEnd::Idle(after) => write!(f, "idle for {after:?}"),
        }
    }
}

async fn splice(
    client: WebSocket,
    upstream: UpstreamSocket,
    idle_timeout: Duration,
    guard: SessionGuard,
    target: String,
) {
    let session_id = guard.id();
    tracing::info!(session_id = %session_id, target = %target, "WebSocket session established");

    let (mut client_tx, mut client_rx) = client.split();
    let (mut upstream_tx, mut upstream_rx) = upstream.split();

    // Milliseconds since `started` at which the last frame was seen.
    let started = Instant::now();
    let last_activity = AtomicU64::new(0);
    let touch = || last_activity.store(started.elapsed().as_millis() as u64, Ordering::Relaxed);

    let client_to_upstream = async {
        while let Some(message) = client_rx.next().await {
            let message = match message {
                Ok(message) => message,
                Err(e) => return SessionEnd::ClientError(e.to_string()),
            };
            touch();
            let Some(message) = to_upstream(message) else {
                continue;
            };
            if let Err(e) = upstream_tx.send(message).await {
                return SessionEnd::UpstreamError(e.to_string());
            }
        }
        SessionEnd::ClientClosed
    };

    let upstream_to_client = async {
        while let Some(message) = upstream_rx.next().await {
            let message = match message {
                Ok(message) => message,
                Err(e) => return SessionEnd::UpstreamError(e.to_string()),
            };
            touch();
            let Some(message) = to_client(message) else {
                continue;
            };
            if let Err(e) = client_tx.send(message).await {
                return SessionEnd::ClientError(e.to_string());
            }
        }
        SessionEnd::UpstreamClosed
    };

    let idle = async {
        loop {
            let last = Duration::from_millis(last_activity.load(Ordering::Relaxed));
            let deadline = started + last + idle_timeout;
            if Instant::now() >= deadline {
                return SessionEnd::Idle(idle_timeout);
            }
            tokio::time::sleep_until(deadline).await;
        }
    };

    let end = tokio::select! {
        end = client_to_upstream => end,
        end = upstream_to_client => end,
        end = idle => end,
    };

    // Either side may already be gone; closing is best effort.
    let _ = upstream_tx.close().await;
    let _ = client_tx.close().await;

    match &end {
        SessionEnd::ClientError(_) | SessionEnd::UpstreamError(_) => {
            tracing::warn!(session_id = %session_id, target = %target, reason = %end, "WebSocket session aborted");
        }
        _ => {
            tracing::info!(session_id = %session_id, target = %target, reason = %end, "WebSocket session closed");
        }
    }
    drop(guard);
}

/// Pong frames map to `None`.
fn to_upstream(message: Message) -> Option<UpstreamMessage> {
    let message = match message {
        Message::Text(text) => UpstreamMessage::Text(text.to_string().into()),
        Message::Binary(data) => UpstreamMessage::Binary(data),
        Message::Ping(data) => UpstreamMessage::Ping(data),
        Message::Pong(_) => return None,
        Message::Close(frame) => UpstreamMessage::Close(frame.map(|frame| UpstreamCloseFrame {
            code: CloseCode::from(frame.code),
            reason: frame.reason.to_string().into(),
        })),
    };
    Some(message)
}

/// Pong frames and raw frames (never surfaced by a reading socket) map to
/// `None`.
fn to_client(message: UpstreamMessage) -> Option<Message> {
    let message = match message {
        UpstreamMessage::Text(text) => Message::Text(text.to_string().into()),
        UpstreamMessage::Binary(data) => Message::Binary(data),
        UpstreamMessage::Ping(data) => Message::Ping(data),
        UpstreamMessage::Pong(_) => return None,
        UpstreamMessage::Close(frame) => Message::Close(frame.map(|frame| ws::CloseFrame {
            code: u16::from(frame.code),
            reason: frame.reason.to_string().into(),
        })),
        UpstreamMessage::Frame(_) => return None,
    };
    Some(message)
}
