//! Configuration loading from the process environment.
//!
//! The listen port is the only proxy setting exposed at runtime; everything
//! else keeps its compiled-in default. Logging and metrics knobs ride along
//! as ambient settings.

use clap::Parser;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{LogFormat, ProxyConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Command-line arguments, each backed by an environment variable.
#[derive(Debug, Clone, Parser)]
#[command(name = "dynamic-proxy")]
#[command(about = "Dynamic-target proxy for broker management and messaging endpoints", long_about = None)]
pub struct CliArgs {
    /// Port to listen on.
    #[arg(short, long, env = "PORT", default_value_t = 3001)]
    pub port: u16,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Serve Prometheus metrics on this address.
    #[arg(long, env = "METRICS_ADDR")]
    pub metrics_address: Option<SocketAddr>,
}

/// Build and validate the configuration from parsed arguments.
pub fn load_config(args: CliArgs) -> Result<ProxyConfig, ConfigError> {
    let mut config = ProxyConfig::default();
    config.listener.port = args.port;
    config.observability.log_format = args.log_format;
    config.observability.metrics_address = args.metrics_address;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
