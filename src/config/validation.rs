//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Mounts are single path segments so the route decoder can rely on
//!   fixed segment positions
//! - Validate value ranges (timeouts > 0, request deadline not shorter
//!   than the connect deadline)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>

use axum::http::HeaderValue;
use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be a single path segment like `/api`, got `{value}`")]
    InvalidMount { field: &'static str, value: String },

    #[error("routing.anchor must start with `/`, got `{0}`")]
    InvalidAnchor(String),

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("timeouts.request_secs ({request}) must not be shorter than timeouts.connect_secs ({connect})")]
    RequestShorterThanConnect { request: u64, connect: u64 },

    #[error("upstream.user_agent is not a valid header value")]
    InvalidUserAgent,
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (field, value) in [
        ("routing.api_mount", &config.routing.api_mount),
        ("routing.ws_mount", &config.routing.ws_mount),
    ] {
        if !is_single_segment(value) {
            errors.push(ValidationError::InvalidMount {
                field,
                value: value.clone(),
            });
        }
    }

    if !config.routing.anchor.starts_with('/') || config.routing.anchor.len() < 2 {
        errors.push(ValidationError::InvalidAnchor(config.routing.anchor.clone()));
    }

    let timeouts = &config.timeouts;
    for (field, secs) in [
        ("timeouts.connect_secs", timeouts.connect_secs),
        ("timeouts.request_secs", timeouts.request_secs),
        ("timeouts.ws_idle_secs", timeouts.ws_idle_secs),
    ] {
        if secs == 0 {
            errors.push(ValidationError::ZeroTimeout(field));
        }
    }

    if timeouts.request_secs < timeouts.connect_secs {
        errors.push(ValidationError::RequestShorterThanConnect {
            request: timeouts.request_secs,
            connect: timeouts.connect_secs,
        });
    }

    if HeaderValue::from_str(&config.upstream.user_agent).is_err() {
        errors.push(ValidationError::InvalidUserAgent);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_single_segment(mount: &str) -> bool {
    match mount.strip_prefix('/') {
        Some(segment) => !segment.is_empty() && !segment.contains('/'),
        None => false,
    }
}
