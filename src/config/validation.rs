//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Detect routes shadowed by the static prefix
//! - Refuse retained inputs without a reaper to remove them
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ServiceConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const RESERVED_PATHS: &[&str] = &["/upload", "/health"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("storage.directory must not be empty")]
    EmptyDirectory,

    #[error("storage.public_prefix '{0}' must start with '/' and name a path segment")]
    InvalidPrefix(String),

    #[error("storage.public_prefix '{0}' collides with a service route")]
    ReservedPrefix(String),

    #[error("timeouts.request_secs ({request}) must exceed renderer.render_timeout_secs ({render})")]
    RequestShorterThanRender { request: u64, render: u64 },

    #[error("storage.retain_failed_inputs requires storage.reaper.enabled")]
    RetentionWithoutReaper,

    #[error("storage.reaper.max_age_secs ({max_age}) must exceed timeouts.request_secs ({request})")]
    ReaperAgeTooShort { max_age: u64, request: u64 },

    #[error("observability.log_level '{0}' is not one of trace, debug, info, warn, error")]
    InvalidLogLevel(String),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    let storage = &config.storage;
    if storage.directory.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyDirectory);
    }
    let prefix = storage.public_prefix.trim_end_matches('/');
    if !prefix.starts_with('/') || prefix.len() < 2 {
        errors.push(ValidationError::InvalidPrefix(storage.public_prefix.clone()));
    } else if RESERVED_PATHS.contains(&prefix) {
        errors.push(ValidationError::ReservedPrefix(storage.public_prefix.clone()));
    }
    if storage.max_upload_bytes == 0 {
        errors.push(ValidationError::Zero { field: "storage.max_upload_bytes" });
    }
    if storage.reaper.enabled {
        if storage.reaper.interval_secs == 0 {
            errors.push(ValidationError::Zero { field: "storage.reaper.interval_secs" });
        }
        if storage.reaper.max_age_secs == 0 {
            errors.push(ValidationError::Zero { field: "storage.reaper.max_age_secs" });
        } else if storage.reaper.max_age_secs <= config.timeouts.request_secs {
            errors.push(ValidationError::ReaperAgeTooShort {
                max_age: storage.reaper.max_age_secs,
                request: config.timeouts.request_secs,
            });
        }
    } else if storage.retain_failed_inputs {
        errors.push(ValidationError::RetentionWithoutReaper);
    }

    let renderer = &config.renderer;
    if renderer.max_concurrent == 0 {
        errors.push(ValidationError::Zero { field: "renderer.max_concurrent" });
    }
    if renderer.render_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "renderer.render_timeout_secs" });
    } else if config.timeouts.request_secs <= renderer.render_timeout_secs {
        errors.push(ValidationError::RequestShorterThanRender {
            request: config.timeouts.request_secs,
            render: renderer.render_timeout_secs,
        });
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.as_str()) {
        errors.push(ValidationError::InvalidLogLevel(observability.log_level.clone()));
    }
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
