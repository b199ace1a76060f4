//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! process environment (PORT, LOG_FORMAT, METRICS_ADDR)
//!     → loader.rs (clap parse, overlay on defaults)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → handed to HttpServer at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow a zero-setting start
//! - Validation separates syntactic (clap/serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::ProxyConfig;
pub use schema::ListenerConfig;
pub use schema::RoutingConfig;
pub use schema::TimeoutConfig;
pub use schema::UpstreamConfig;
pub use schema::ObservabilityConfig;
