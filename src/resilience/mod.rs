//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Connection to upstream:
//!     → timeouts.rs (enforce connect and response-header deadlines)
//!     → On failure: error mapped once, never retried internally
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream connect has a deadline
//! - Retry policy belongs to the calling client, not the proxy

pub mod timeouts;
