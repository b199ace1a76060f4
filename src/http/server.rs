//! HTTP server setup and dispatch.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all dispatcher
//! - Wire up middleware (CORS, request ID, tracing)
//! - Bind server to listener with graceful shutdown
//! - Classify each request and hand it to the matching forwarder
//! - Log and count every failure

use axum::{
    body::Body,
    extract::{FromRequestParts, State, ws::WebSocketUpgrade},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::CorsLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::forward::HttpForwarder;
use crate::http::request::{MakeRequestUuid, RequestIdExt, X_REQUEST_ID};
use crate::http::response::ProxyError;
use crate::http::websocket::WebSocketForwarder;
use crate::net::session::SessionTracker;
use crate::observability::metrics;
use crate::routing::{Dispatch, RouteDecoder, RouteTable};

/// Body of the liveness response.
pub const LIVENESS_BODY: &str = "Dynamic proxy is running!";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub table: Arc<RouteTable>,
    pub decoder: Arc<RouteDecoder>,
    pub http: HttpForwarder,
    pub websocket: WebSocketForwarder,
}

/// HTTP server for the dynamic proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    sessions: SessionTracker,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, reqwest::Error> {
        let sessions = SessionTracker::new();

        let state = AppState {
            table: Arc::new(RouteTable::from_config(&config.routing)),
            decoder: Arc::new(RouteDecoder::new(config.routing.anchor.clone())),
            http: HttpForwarder::new(&config.upstream, &config.timeouts)?,
            websocket: WebSocketForwarder::new(&config.upstream, &config.timeouts, sessions.clone()),
        };

        let router = Self::build_router(state);
        Ok(Self {
            router,
            config,
            sessions,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
            .layer(CorsLayer::permissive())
    }

    /// The router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            api_mount = %self.config.routing.api_mount,
            ws_mount = %self.config.routing.ws_mount,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!(
            open_sessions = self.sessions.active_count(),
            "HTTP server stopped"
        );
        Ok(())
    }

    /// Spliced WebSocket sessions, shared with the forwarder.
    pub fn sessions(&self) -> &SessionTracker {
        &self.sessions
    }
}

/// Main proxy handler.
/// Classifies the request, decodes its route and forwards it.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request.request_id().to_string();
    let path = request.uri().path().to_string();
    let dispatch = state.table.classify(&request);

    tracing::debug!(
        request_id = %request_id,
        method = %request.method(),
        path = %path,
        dispatch = dispatch.as_str(),
        "Dispatching request"
    );

    let result = match dispatch {
        Dispatch::Liveness => Ok((StatusCode::OK, LIVENESS_BODY).into_response()),
        Dispatch::Management => forward_management(&state, request).await,
        Dispatch::Messaging => forward_messaging(&state, request).await,
    };

    let response = match result {
        Ok(response) => response,
        Err(err) => {
            match &err {
                ProxyError::Decode(_) => {
                    tracing::warn!(request_id = %request_id, path = %path, error = %err, "Rejected malformed proxy path");
                }
                _ => {
                    tracing::error!(request_id = %request_id, path = %path, error = %err, "Upstream failure");
                }
            }
            metrics::record_failure(err.kind());
            err.into_response()
        }
    };

    metrics::record_request(dispatch.as_str(), response.status().as_u16(), start_time);
    response
}

async fn forward_management(state: &AppState, request: Request<Body>) -> Result<Response, ProxyError> {
    let route = state.decoder.decode(request.uri().path())?.into_http();
    state.http.forward(&route, request).await
}

async fn forward_messaging(state: &AppState, request: Request<Body>) -> Result<Response, ProxyError> {
    let route = state.decoder.decode_upgrade(request.uri().path())?;

    let (mut parts, _body) = request.into_parts();
    let upgrade = match WebSocketUpgrade::from_request_parts(&mut parts, state).await {
        Ok(upgrade) => upgrade,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    state
        .websocket
        .forward_upgrade(route, upgrade, &parts.headers)
        .await
}
