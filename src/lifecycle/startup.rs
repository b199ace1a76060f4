//! Startup orchestration.
//!
//! # Responsibilities
//! - Start optional background services (metrics exporter)
//! - Bind the listener and begin accepting traffic
//! - Hook termination signals to graceful shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when ready)

use tokio::net::TcpListener;

use crate::config::ProxyConfig;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;

/// Bring the proxy up and serve until a termination signal arrives.
pub async fn start(config: ProxyConfig) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(addr) = config.observability.metrics_address {
        metrics::init_metrics(addr)?;
    }

    let bind_address = config.listener.bind_address();
    let server = HttpServer::new(config)?;

    let listener = TcpListener::bind(&bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");
    tracing::info!("Access it at http://localhost:{}", local_addr.port());

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(signals::forward_termination(shutdown));

    server.run(listener, server_shutdown).await?;
    Ok(())
}
