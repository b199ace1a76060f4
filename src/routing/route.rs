//! Route decoding.
//!
//! The upstream destination travels inside the request path:
//!
//! ```text
//! /<mount>/<scheme>/<host:port>/<anything>/SEMP/v2/monitor/<rest>
//!             │         │                  └──────── upstream path ───────┘
//!             │         └── Host header + connection target
//!             └── http | https | ws | wss
//! ```
//!
//! # Design Decisions
//! - Pure and request-scoped: no I/O, same input always yields the same Route
//! - Host:port is taken verbatim; a bad host surfaces as a connect failure
//! - The upstream path is located by anchor search rather than a fixed
//!   segment offset, so proxy-internal segments never leak upstream

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Reasons a path cannot be turned into a [`Route`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Too few segments, an empty scheme/host segment, or an unknown scheme.
    #[error("malformed route: {0}")]
    MalformedRoute(String),

    /// The broker API marker does not occur after the host segment.
    #[error("anchor `{anchor}` not found in path")]
    AnchorNotFound { anchor: String },
}

/// Upstream protocol named by the scheme segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
    Ws,
    Wss,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
            Scheme::Ws => "ws",
            Scheme::Wss => "wss",
        }
    }

    pub fn is_secure(&self) -> bool {
        matches!(self, Scheme::Https | Scheme::Wss)
    }

    /// Scheme to use when the target is reached over plain HTTP.
    pub fn http_equivalent(&self) -> Scheme {
        if self.is_secure() {
            Scheme::Https
        } else {
            Scheme::Http
        }
    }

    /// Scheme to use when the target is reached over WebSocket.
    pub fn ws_equivalent(&self) -> Scheme {
        if self.is_secure() {
            Scheme::Wss
        } else {
            Scheme::Ws
        }
    }
}

impl FromStr for Scheme {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            "ws" => Ok(Scheme::Ws),
            "wss" => Ok(Scheme::Wss),
            _ => Err(DecodeError::MalformedRoute(format!("unsupported scheme `{s}`"))),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully decoded upstream destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    scheme: Scheme,
    hostport: String,
    upstream_path: String,
}

impl Route {
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn hostport(&self) -> &str {
        &self.hostport
    }

    pub fn upstream_path(&self) -> &str {
        &self.upstream_path
    }

    /// `<scheme>://<hostport>`, used in logs and error bodies.
    pub fn target(&self) -> String {
        format!("{}://{}", self.scheme, self.hostport)
    }

    /// Full upstream URL, optionally carrying the inbound query string.
    pub fn upstream_url(&self, query: Option<&str>) -> String {
        match query {
            Some(q) if !q.is_empty() => format!("{}{}?{}", self.target(), self.upstream_path, q),
            _ => format!("{}{}", self.target(), self.upstream_path),
        }
    }

    /// Same destination reached over plain HTTP(S).
    pub fn into_http(self) -> Route {
        Route {
            scheme: self.scheme.http_equivalent(),
            ..self
        }
    }
}

/// Decodes request paths into routes, anchoring on the broker API root.
#[derive(Debug, Clone)]
pub struct RouteDecoder {
    anchor: String,
}

impl RouteDecoder {
    pub fn new(anchor: impl Into<String>) -> Self {
        Self {
            anchor: anchor.into(),
        }
    }

    pub fn anchor(&self) -> &str {
        &self.anchor
    }

    /// Decode a management-API path.
    ///
    /// Needs mount, scheme, host and at least one resource segment, all
    /// non-empty, and the anchor somewhere after the host segment.
    pub fn decode(&self, path: &str) -> Result<Route, DecodeError> {
        let (scheme, hostport, remainder) = split_leading(path)?;

        match remainder.split('/').nth(1) {
            Some(segment) if !segment.is_empty() => {}
            _ => {
                return Err(DecodeError::MalformedRoute(
                    "missing resource path after host".to_string(),
                ))
            }
        }

        let start = remainder
            .find(self.anchor.as_str())
            .ok_or_else(|| DecodeError::AnchorNotFound {
                anchor: self.anchor.clone(),
            })?;

        Ok(Route {
            scheme,
            hostport: hostport.to_string(),
            upstream_path: remainder[start..].to_string(),
        })
    }

    /// Decode a messaging (WebSocket) path.
    ///
    /// Only mount, scheme and host are required. The scheme is forced to
    /// `ws`/`wss` and the upstream path is always the root.
    pub fn decode_upgrade(&self, path: &str) -> Result<Route, DecodeError> {
        let (scheme, hostport, _) = split_leading(path)?;

        Ok(Route {
            scheme: scheme.ws_equivalent(),
            hostport: hostport.to_string(),
            upstream_path: "/".to_string(),
        })
    }
}

/// Split `/<mount>/<scheme>/<hostport><remainder>`.
///
/// `remainder` keeps its leading `/` (or is empty).
fn split_leading(path: &str) -> Result<(Scheme, &str, &str), DecodeError> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let mut parts = trimmed.splitn(4, '/');

    let mount = parts.next().unwrap_or_default();
    let scheme = parts.next().unwrap_or_default();
    let hostport = parts.next().unwrap_or_default();
    let rest = parts.next();

    if mount.is_empty() {
        return Err(DecodeError::MalformedRoute("missing mount segment".to_string()));
    }
    if scheme.is_empty() {
        return Err(DecodeError::MalformedRoute("missing scheme segment".to_string()));
    }
    if hostport.is_empty() {
        return Err(DecodeError::MalformedRoute("missing host segment".to_string()));
    }

    let scheme: Scheme = scheme.parse()?;
    // `rest` is a suffix of `path`; step back one byte to keep its slash.
    let remainder = rest.map_or("", |rest| &path[path.len() - rest.len() - 1..]);

    Ok((scheme, hostport, remainder))
}
