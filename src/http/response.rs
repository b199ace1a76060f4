//! Response handling and error mapping.
//!
//! # Responsibilities
//! - Map decode and upstream failures to fixed client-visible responses
//! - Prepare upstream response headers for the client
//!
//! # Design Decisions
//! - Upstream statuses (including 4xx/5xx) are not proxy errors and pass
//!   through untouched
//! - Error bodies are fixed text; internal error detail only goes to logs
//! - Hop-by-hop headers stripped automatically

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::http::request::is_hop_by_hop;
use crate::routing::DecodeError;

/// Failures the proxy itself is responsible for.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The request path does not encode a usable destination.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Connection refused, DNS, TLS or connect timeout on the upstream call.
    #[error("upstream {target} unreachable: {reason}")]
    UpstreamUnreachable { target: String, reason: String },

    /// The upstream WebSocket handshake failed; nothing was spliced.
    #[error("upgrade to {target} rejected: {reason}")]
    UpgradeRejected { target: String, reason: String },
}

impl ProxyError {
    pub fn unreachable(target: impl Into<String>, reason: impl ToString) -> Self {
        ProxyError::UpstreamUnreachable {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    pub fn upgrade_rejected(target: impl Into<String>, reason: impl ToString) -> Self {
        ProxyError::UpgradeRejected {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Decode(_) => StatusCode::BAD_REQUEST,
            ProxyError::UpstreamUnreachable { .. } | ProxyError::UpgradeRejected { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Decode(DecodeError::MalformedRoute(_)) => "malformed_route",
            ProxyError::Decode(DecodeError::AnchorNotFound { .. }) => "anchor_not_found",
            ProxyError::UpstreamUnreachable { .. } => "upstream_unreachable",
            ProxyError::UpgradeRejected { .. } => "upgrade_rejected",
        }
    }

    /// Fixed text returned to the caller.
    fn client_message(&self) -> String {
        match self {
            ProxyError::Decode(DecodeError::MalformedRoute(_)) => {
                "Bad Request: Invalid URL format for proxy. \
                 Expected /<mount>/<scheme>/<host>:<port>/<path>."
                    .to_string()
            }
            ProxyError::Decode(DecodeError::AnchorNotFound { anchor }) => {
                format!("Bad Request: Broker API path {anchor} not found in URL.")
            }
            ProxyError::UpstreamUnreachable { target, .. } => {
                format!("Proxy Error: Could not connect to the target server {target}.")
            }
            ProxyError::UpgradeRejected { target, .. } => {
                format!("Proxy Error: Could not connect to the target WebSocket server {target}.")
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), self.client_message()).into_response();
        if matches!(self, ProxyError::UpgradeRejected { .. }) {
            response
                .headers_mut()
                .insert(header::CONNECTION, HeaderValue::from_static("close"));
        }
        response
    }
}

/// Copy upstream response headers for the client, minus hop-by-hop ones.
pub fn client_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        if !is_hop_by_hop(name) {
            headers.append(name.clone(), value.clone());
        }
    }
    headers
}
