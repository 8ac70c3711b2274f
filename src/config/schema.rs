//! Configuration schema definitions.
//!
//! Every table and field has a default, so an empty file is a valid config.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the add service.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Per-endpoint middleware settings.
    pub endpoints: EndpointsConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct EndpointsConfig {
    pub sum: EndpointConfig,
    pub concat: EndpointConfig,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            // One sum per second, bursts of one.
            sum: EndpointConfig {
                rate_limit: RateLimitConfig {
                    capacity: 1,
                    refill_per_second: 1.0,
                },
                circuit_breaker: CircuitBreakerConfig::default(),
            },
            concat: EndpointConfig {
                rate_limit: RateLimitConfig {
                    capacity: 100,
                    refill_per_second: 100.0,
                },
                circuit_breaker: CircuitBreakerConfig::default(),
            },
        }
    }
}

/// Middleware settings for one endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct EndpointConfig {
    pub rate_limit: RateLimitConfig,
    pub circuit_breaker: CircuitBreakerConfig,
}

/// Token bucket settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum burst; the bucket starts full.
    pub capacity: u32,

    /// Tokens added per second.
    pub refill_per_second: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 1,
            refill_per_second: 1.0,
        }
    }
}

/// Circuit breaker settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive transport failures that open the circuit.
    pub failure_threshold: u32,

    /// Time spent open before a trial call is admitted, in milliseconds.
    pub reset_timeout_ms: u64,
}

impl CircuitBreakerConfig {
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Install the Prometheus recorder.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
        }
    }
}
