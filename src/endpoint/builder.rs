//! Endpoint factory: composes the middleware chain in its fixed order.
//!
//! Outermost first:
//!
//! ```text
//! Logging → Instrumenting → Tracing → RateLimiting → CircuitBreaking → adapter
//! ```
//!
//! Logging and instrumenting sit outside both gates so rejected calls are
//! logged and measured like any other. Tracing spans the gated call so a
//! rejection still shows up in the trace. The limiter sits outside the
//! breaker so calls shed for rate never reach the breaker's state machine.

use std::sync::Arc;

use tower::util::BoxCloneService;
use tower::ServiceBuilder;

use super::{BoxEndpoint, Endpoint, Failer};
use crate::config::EndpointConfig;
use crate::observability::{DurationRecorder, InstrumentingLayer, LoggingLayer, Redact, TracingLayer};
use crate::resilience::{CircuitBreaker, CircuitBreakerLayer, RateLimitLayer, TokenBucket};

/// Builds one fully decorated endpoint for a business operation.
pub struct EndpointBuilder {
    method: &'static str,
    durations: Arc<dyn DurationRecorder>,
    bucket: Arc<TokenBucket>,
    breaker: Arc<CircuitBreaker>,
}

impl EndpointBuilder {
    /// Start from the per-operation settings in `config`.
    pub fn new(
        method: &'static str,
        config: &EndpointConfig,
        durations: Arc<dyn DurationRecorder>,
    ) -> Self {
        Self {
            method,
            durations,
            bucket: Arc::new(TokenBucket::from_config(&config.rate_limit)),
            breaker: Arc::new(CircuitBreaker::from_config(method, &config.circuit_breaker)),
        }
    }

    /// Use an existing bucket, typically to observe it from outside.
    pub fn token_bucket(mut self, bucket: Arc<TokenBucket>) -> Self {
        self.bucket = bucket;
        self
    }

    /// Use an existing breaker, typically to observe it from outside.
    pub fn circuit_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn bucket(&self) -> &Arc<TokenBucket> {
        &self.bucket
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Wrap `adapter` and erase the resulting type.
    pub fn build<S, Req>(self, adapter: S) -> BoxEndpoint<Req, S::Response>
    where
        S: Endpoint<Req>,
        S::Future: Send + 'static,
        S::Response: Failer + Send + 'static,
        Req: Redact + Send + 'static,
    {
        let endpoint = ServiceBuilder::new()
            .layer(LoggingLayer::new(self.method))
            .layer(InstrumentingLayer::new(self.method, self.durations))
            .layer(TracingLayer::new(self.method))
            .layer(RateLimitLayer::new(self.method, self.bucket))
            .layer(CircuitBreakerLayer::new(self.breaker))
            .service(adapter);

        BoxCloneService::new(endpoint)
    }
}
