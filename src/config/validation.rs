//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Reject empty policy entries that would match everything
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue};
use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("upstream.timeout_ms must be greater than zero")]
    ZeroTimeout,

    #[error("upstream.user_agent must be a non-empty header value")]
    UserAgent,

    #[error("upstream.{field} `{value}` is not a valid header value")]
    AcceptValue { field: &'static str, value: String },

    #[error("upstream.api_path_markers must contain at least one non-empty marker")]
    NoApiMarkers,

    #[error("{field} contains an empty entry")]
    EmptyEntry { field: &'static str },

    #[error("security.stripped_response_headers entry `{0}` is not a header name")]
    HeaderName(String),

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Check a parsed configuration, collecting every problem.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.upstream.timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    let ua = config.upstream.user_agent.trim();
    if ua.is_empty() || HeaderValue::from_str(ua).is_err() {
        errors.push(ValidationError::UserAgent);
    }

    for (field, value) in [
        ("json_accept", &config.upstream.json_accept),
        ("stream_accept", &config.upstream.stream_accept),
    ] {
        if value.trim().is_empty() || HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::AcceptValue {
                field,
                value: value.clone(),
            });
        }
    }

    if !config
        .upstream
        .api_path_markers
        .iter()
        .any(|m| !m.is_empty())
    {
        errors.push(ValidationError::NoApiMarkers);
    }

    let security = &config.security;
    for (field, entries) in [
        ("security.denied_hosts", &security.denied_hosts),
        ("security.denied_host_prefixes", &security.denied_host_prefixes),
        (
            "security.stripped_response_headers",
            &security.stripped_response_headers,
        ),
    ] {
        if entries.iter().any(|e| e.trim().is_empty()) {
            errors.push(ValidationError::EmptyEntry { field });
        }
    }

    for name in &security.stripped_response_headers {
        if !name.trim().is_empty() && HeaderName::from_bytes(name.trim().as_bytes()).is_err() {
            errors.push(ValidationError::HeaderName(name.clone()));
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
