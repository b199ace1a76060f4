//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for every inbound request
//! - Prepare inbound headers for forwarding to the upstream broker
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - `Host` and `User-Agent` are always overwritten, never inherited
//! - Original request preserved for logging; modified copy forwarded

use axum::http::header::{self, HeaderName, InvalidHeaderValue};
use axum::http::{HeaderMap, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Correlation header set on every request and echoed on every response.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates `x-request-id` values for requests that arrive without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Read the request ID assigned by the request-id layer.
pub trait RequestIdExt {
    fn request_id(&self) -> &str;
}

impl RequestIdExt for HeaderMap {
    fn request_id(&self) -> &str {
        self.get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> &str {
        self.headers().request_id()
    }
}

/// Connection-scoped headers that must not cross the proxy.
pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-connection"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    )
}

/// Build the header set for an upstream HTTP call.
///
/// Copies the inbound headers except hop-by-hop ones (including any named
/// in `Connection`) and the inbound `Host`, then pins `Host` to the route's
/// host:port and `User-Agent` to the proxy identity.
pub fn upstream_headers(
    inbound: &HeaderMap,
    hostport: &str,
    user_agent: &HeaderValue,
) -> Result<HeaderMap, InvalidHeaderValue> {
    let connection_tokens: Vec<String> = inbound
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect();

    let mut headers = HeaderMap::with_capacity(inbound.len() + 2);
    for (name, value) in inbound {
        if *name == header::HOST
            || is_hop_by_hop(name)
            || connection_tokens.iter().any(|t| t == name.as_str())
        {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    headers.insert(header::HOST, HeaderValue::from_str(hostport)?);
    headers.insert(header::USER_AGENT, user_agent.clone());
    Ok(headers)
}
