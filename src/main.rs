//! Dynamic-target proxy
//!
//! Browser clients cannot reach arbitrary brokers directly, so they talk to
//! this proxy and name the broker inside the request path.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌─────────────────────────────────────────────────┐
//!                          │                 DYNAMIC PROXY                   │
//!                          │                                                 │
//!     Client Request       │  ┌─────────┐    ┌──────────┐    ┌───────────┐   │
//!     ─────────────────────┼─▶│  http   │───▶│ routing  │───▶│  route    │   │
//!                          │  │ server  │    │  table   │    │  decoder  │   │
//!                          │  └─────────┘    └────┬─────┘    └─────┬─────┘   │
//!                          │                      │                │         │
//!                          │         ┌────────────┴──────┐         │         │
//!                          │         ▼                   ▼         ▼         │
//!                          │  ┌─────────────┐     ┌──────────────────────┐   │
//!                          │  │  liveness   │     │ http forwarder /     │───┼──▶ Broker
//!                          │  │  text       │     │ websocket forwarder  │◀──┼─── (from path)
//!                          │  └─────────────┘     └──────────────────────┘   │
//!                          │                                                 │
//!                          │  config · observability · lifecycle · timeouts  │
//!                          └─────────────────────────────────────────────────┘
//! ```

use clap::Parser;

use dynamic_proxy::config::loader::{load_config, CliArgs};
use dynamic_proxy::lifecycle::startup;
use dynamic_proxy::observability::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let config = load_config(args)?;

    logging::init_tracing(config.observability.log_format);

    tracing::info!("Dynamic proxy starting");
    tracing::debug!(config = %serde_json::to_string(&config)?, "Effective configuration");

    startup::start(config).await?;

    tracing::info!("Dynamic proxy stopped");
    Ok(())
}
