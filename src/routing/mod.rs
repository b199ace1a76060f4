//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, upgrade headers)
//!     → router.rs (dispatch table lookup)
//!     → matcher.rs (evaluate mount prefix / upgrade conditions)
//!     → Dispatch::{Messaging, Management, Liveness}
//!
//! Messaging / Management:
//!     → route.rs (decode scheme, host:port, upstream path from the path)
//!     → Route or DecodeError
//! ```
//!
//! # Design Decisions
//! - Table compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always yields the same dispatch and route

pub mod matcher;
pub mod route;
pub mod router;

pub use route::{DecodeError, Route, RouteDecoder, Scheme};
pub use router::{Dispatch, RouteTable};
