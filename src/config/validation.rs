//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses (bind address, upstream `host:port`)
//! - Validate value ranges (limits and timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::uri::Authority;
use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("{field} `{value}` must be host:port with a non-zero port")]
    Upstream { field: &'static str, value: String },

    #[error("limits.max_body_size must be greater than zero")]
    ZeroBodyLimit,

    #[error("static_files.root must not be empty")]
    EmptyStaticRoot,

    #[error("static_files.prefix `{0}` must start and end with `/`")]
    StaticPrefix(String),

    #[error("static_files.max_age_secs must be greater than zero")]
    ZeroMaxAge,

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

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

    for (field, value) in [
        ("upstream.default", &config.upstream.default),
        ("upstream.fallback", &config.upstream.fallback),
    ] {
        if !is_host_port(value) {
            errors.push(ValidationError::Upstream {
                field,
                value: value.clone(),
            });
        }
    }

    if config.limits.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    let statics = &config.static_files;
    if statics.root.trim().is_empty() {
        errors.push(ValidationError::EmptyStaticRoot);
    }
    if !(statics.prefix.starts_with('/') && statics.prefix.ends_with('/')) {
        errors.push(ValidationError::StaticPrefix(statics.prefix.clone()));
    }
    if statics.max_age_secs == 0 {
        errors.push(ValidationError::ZeroMaxAge);
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
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

/// True when `value` is an authority with an explicit, non-zero port and no userinfo.
pub(crate) fn is_host_port(value: &str) -> bool {
    match value.parse::<Authority>() {
        Ok(authority) => {
            !authority.as_str().contains('@')
                && !authority.host().is_empty()
                && authority.port_u16().is_some_and(|port| port != 0)
        }
        Err(_) => false,
    }
}
