//! Dynamic-target proxy library.
//!
//! Forwards management-API calls and WebSocket messaging sessions to a
//! broker named inside the request path itself.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{Route, RouteDecoder};
