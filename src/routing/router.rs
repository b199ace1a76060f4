//! Dispatch table.
//!
//! # Responsibilities
//! - Hold the ordered mount entries built at startup
//! - Classify each request as messaging upgrade, management call or liveness
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - First match wins; no match falls through to liveness
//! - Classification only; decoding and forwarding live elsewhere

use axum::body::Body;
use axum::http::Request;

use crate::config::RoutingConfig;
use crate::routing::matcher::{AndMatcher, Matcher, PathPrefixMatcher, UpgradeMatcher};

/// Where a request is sent after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// WebSocket upgrade forwarded to the broker's messaging endpoint.
    Messaging,
    /// Plain HTTP forwarded to the broker's management API.
    Management,
    /// Health check response.
    Liveness,
}

impl Dispatch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dispatch::Messaging => "messaging",
            Dispatch::Management => "management",
            Dispatch::Liveness => "liveness",
        }
    }
}

#[derive(Debug)]
struct TableEntry {
    matcher: Box<dyn Matcher>,
    dispatch: Dispatch,
}

/// Ordered, immutable prefix table.
#[derive(Debug)]
pub struct RouteTable {
    entries: Vec<TableEntry>,
}

impl RouteTable {
    /// Build the table from the routing config.
    ///
    /// The upgrade entry comes first so a shared mount still sends
    /// handshakes to the WebSocket forwarder.
    pub fn from_config(config: &RoutingConfig) -> Self {
        let entries = vec![
            TableEntry {
                matcher: Box::new(AndMatcher::new(vec![
                    Box::new(UpgradeMatcher),
                    Box::new(PathPrefixMatcher::new(config.ws_mount.clone())),
                ])),
                dispatch: Dispatch::Messaging,
            },
            TableEntry {
                matcher: Box::new(PathPrefixMatcher::new(config.api_mount.clone())),
                dispatch: Dispatch::Management,
            },
        ];

        tracing::debug!(
            api_mount = %config.api_mount,
            ws_mount = %config.ws_mount,
            entries = entries.len(),
            "Dispatch table built"
        );

        Self { entries }
    }

    /// Classify a request.
    pub fn classify(&self, req: &Request<Body>) -> Dispatch {
        self.entries
            .iter()
            .find(|entry| entry.matcher.matches(req))
            .map(|entry| entry.dispatch)
            .unwrap_or(Dispatch::Liveness)
    }
}
