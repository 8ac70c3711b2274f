//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacity ≥ 1, finite refill, reset > 0)
//! - Check the log level parses as a filter directive
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use tracing_subscriber::filter::LevelFilter;

use crate::config::schema::{EndpointConfig, ServiceConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_endpoint("endpoints.sum", &config.endpoints.sum, &mut errors);
    validate_endpoint("endpoints.concat", &config.endpoints.concat, &mut errors);

    if config.observability.log_level.parse::<LevelFilter>().is_err() {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_endpoint(prefix: &str, config: &EndpointConfig, errors: &mut Vec<ValidationError>) {
    let rate = &config.rate_limit;
    if rate.capacity == 0 {
        errors.push(ValidationError::new(
            format!("{prefix}.rate_limit.capacity"),
            "must be at least 1",
        ));
    }
    if !rate.refill_per_second.is_finite() || rate.refill_per_second < 0.0 {
        errors.push(ValidationError::new(
            format!("{prefix}.rate_limit.refill_per_second"),
            "must be a finite, non-negative number",
        ));
    }

    let breaker = &config.circuit_breaker;
    if breaker.failure_threshold == 0 {
        errors.push(ValidationError::new(
            format!("{prefix}.circuit_breaker.failure_threshold"),
            "must be at least 1",
        ));
    }
    if breaker.reset_timeout_ms == 0 {
        errors.push(ValidationError::new(
            format!("{prefix}.circuit_breaker.reset_timeout_ms"),
            "must be greater than 0",
        ));
    }
}
