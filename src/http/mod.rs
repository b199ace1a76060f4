//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, dispatch table lookup)
//!     → request.rs (request ID, outbound header rewrite)
//!     → forward.rs (management API, streamed HTTP)
//!       or websocket.rs (messaging, upgrade + splice)
//!     → response.rs (error mapping, response header cleanup)
//!     → Send to client
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use forward::HttpForwarder;
pub use request::{MakeRequestUuid, RequestIdExt, X_REQUEST_ID};
pub use response::ProxyError;
pub use server::HttpServer;
pub use websocket::WebSocketForwarder;
