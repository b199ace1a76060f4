//! Request matching logic.
//!
//! # Responsibilities
//! - Match a mount prefix on segment boundaries (case-sensitive)
//! - Detect WebSocket upgrade handshakes
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - `/api` matches `/api` and `/api/...` but never `/apix`
//! - Header tokens are compared case-insensitively (RFC 9110)
//! - No regex to guarantee O(n) matching

use axum::body::Body;
use axum::http::{header, HeaderMap, Request};

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &Request<Body>) -> bool;
}

/// Matches requests under a mount prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher. A trailing slash is ignored.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        match req.uri().path().strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

/// Matches WebSocket upgrade handshakes (`Connection: upgrade` plus
/// `Upgrade: websocket`).
#[derive(Debug, Clone, Default)]
pub struct UpgradeMatcher;

impl Matcher for UpgradeMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        is_websocket_upgrade(req.headers())
    }
}

/// True when the headers request a protocol switch to WebSocket.
pub fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    let connection_upgrade = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));

    let upgrade_websocket = headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().eq_ignore_ascii_case("websocket"))
        .unwrap_or(false);

    connection_upgrade && upgrade_websocket
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        self.matchers.iter().all(|m| m.matches(req))
    }
}
