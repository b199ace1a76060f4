//! Network session bookkeeping.
//!
//! # Data Flow
//! ```text
//! Accepted WebSocket upgrade
//!     → session.rs (assign session ID, count as active)
//!     → splice runs
//!     → guard dropped, slot released
//! ```

pub mod session;
