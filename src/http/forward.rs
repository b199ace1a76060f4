//! HTTP forwarding to the decoded upstream.
//!
//! # Responsibilities
//! - Issue the inbound method/headers/body to `<scheme>://<hostport><path>`
//! - Stream the upstream status, headers and body back untouched
//! - Turn network-layer failures into `ProxyError::UpstreamUnreachable`
//! - Bound the wait for upstream response headers
//!
//! # Design Decisions
//! - Request and response bodies are streamed, never buffered
//! - Redirects are not followed; a 3xx is an upstream answer like any other
//! - Stateless per request; the client's internal pool is the only sharing

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Request};
use axum::response::Response;
use std::time::Duration;

use crate::config::{TimeoutConfig, UpstreamConfig};
use crate::http::request::upstream_headers;
use crate::http::response::{client_headers, ProxyError};
use crate::resilience::timeouts::{with_deadline, DeadlineError};
use crate::routing::Route;

/// Forwards management-API calls to whatever broker the route names.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: reqwest::Client,
    user_agent: HeaderValue,
    request_timeout: Duration,
}

impl HttpForwarder {
    pub fn new(upstream: &UpstreamConfig, timeouts: &TimeoutConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeouts.connect())
            .pool_idle_timeout(Duration::from_secs(90))
            .danger_accept_invalid_certs(upstream.accept_invalid_certs)
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()?;

        let user_agent = HeaderValue::from_str(&upstream.user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static("dynamic-proxy"));

        Ok(Self {
            client,
            user_agent,
            request_timeout: timeouts.request(),
        })
    }

    /// Forward `request` to `route`, returning the upstream response.
    ///
    /// Any upstream status is a success here; only failing to get a
    /// response at all is an error.
    pub async fn forward(&self, route: &Route, request: Request<Body>) -> Result<Response, ProxyError> {
        let target = route.target();
        let (parts, body) = request.into_parts();
        let url = route.upstream_url(parts.uri.query());

        let headers = upstream_headers(&parts.headers, route.hostport(), &self.user_agent)
            .map_err(|e| ProxyError::unreachable(&target, e))?;

        tracing::debug!(
            method = %parts.method,
            url = %url,
            "Forwarding to upstream"
        );

        let mut outbound = self.client.request(parts.method.clone(), url).headers(headers);
        if carries_body(&parts.headers) {
            outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        // The deadline covers connect plus response headers; the body streams unbounded.
        let upstream = with_deadline(self.request_timeout, outbound.send())
            .await
            .map_err(|e| match e {
                DeadlineError::Elapsed(after) => {
                    ProxyError::unreachable(&target, format!("no response headers within {after:?}"))
                }
                DeadlineError::Inner(e) => ProxyError::unreachable(&target, describe(&e)),
            })?;

        let status = upstream.status();
        let headers = client_headers(upstream.headers());

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

/// Whether the inbound request framed a body at all. Bodiless requests
/// must not go out chunked.
fn carries_body(headers: &HeaderMap) -> bool {
    if headers.contains_key(header::TRANSFER_ENCODING) {
        return true;
    }
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .is_some_and(|len| len > 0)
}

/// Flatten a reqwest error and its sources into one log-friendly line.
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
