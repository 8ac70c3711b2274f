//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Instrument endpoint latency through an injected [`DurationRecorder`]
//! - Count gate rejections and export circuit breaker state
//! - Install the Prometheus recorder for the binary
//!
//! # Metrics
//! - `addsvc_request_duration_seconds` (histogram): latency by `method`,
//!   `success` (no transport error) and `business_failed`
//! - `addsvc_rejections_total` (counter): gate rejections by `method`, `reason`
//! - `addsvc_circuit_state` (gauge): 0=closed, 1=half-open, 2=open
//!
//! # Design Decisions
//! - Everything goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Business failure is its own label dimension, never folded into `success`

use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use std::time::Duration;

use futures_util::future::BoxFuture;
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use tokio::time::Instant;
use tower::{Layer, Service};

use crate::endpoint::{EndpointError, Failer, Outcome};
use crate::resilience::CircuitState;

pub const REQUEST_DURATION: &str = "addsvc_request_duration_seconds";
pub const REJECTIONS_TOTAL: &str = "addsvc_rejections_total";
pub const CIRCUIT_STATE: &str = "addsvc_circuit_state";

const LATENCY_BUCKETS: [f64; 10] = [
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.5, 1.0,
];

/// Sink for per-call latency observations.
pub trait DurationRecorder: Send + Sync + 'static {
    fn record(&self, method: &'static str, outcome: Outcome, elapsed: Duration);
}

/// Records into the `addsvc_request_duration_seconds` histogram.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsRecorder;

impl DurationRecorder for MetricsRecorder {
    fn record(&self, method: &'static str, outcome: Outcome, elapsed: Duration) {
        let success = outcome != Outcome::TransportError;
        let business_failed = outcome == Outcome::BusinessFailed;
        metrics::histogram!(
            REQUEST_DURATION,
            "method" => method,
            "success" => bool_label(success),
            "business_failed" => bool_label(business_failed)
        )
        .record(elapsed.as_secs_f64());
    }
}

fn bool_label(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

pub fn record_rejection(method: &'static str, reason: &'static str) {
    metrics::counter!(REJECTIONS_TOTAL, "method" => method, "reason" => reason).increment(1);
}

pub fn record_circuit_state(method: &'static str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    };
    metrics::gauge!(CIRCUIT_STATE, "method" => method).set(value);
}

/// Install the global Prometheus recorder and return a handle for rendering.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION.to_string()), &LATENCY_BUCKETS)?
        .install_recorder()
}

/// Middleware recording call latency, tagged by method and outcome.
#[derive(Clone)]
pub struct InstrumentingLayer {
    method: &'static str,
    recorder: Arc<dyn DurationRecorder>,
}

impl InstrumentingLayer {
    pub fn new(method: &'static str, recorder: Arc<dyn DurationRecorder>) -> Self {
        Self { method, recorder }
    }
}

impl<S> Layer<S> for InstrumentingLayer {
    type Service = Instrumenting<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Instrumenting {
            inner,
            method: self.method,
            recorder: self.recorder.clone(),
        }
    }
}

#[derive(Clone)]
pub struct Instrumenting<S> {
    inner: S,
    method: &'static str,
    recorder: Arc<dyn DurationRecorder>,
}

impl<S, Req> Service<Req> for Instrumenting<S>
where
    S: Service<Req, Error = EndpointError>,
    S::Future: Send + 'static,
    S::Response: Failer + Send + 'static,
{
    type Response = S::Response;
    type Error = EndpointError;
    type Future = BoxFuture<'static, Result<S::Response, EndpointError>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let start = Instant::now();
        let method = self.method;
        let recorder = self.recorder.clone();
        let fut = self.inner.call(req);

        Box::pin(async move {
            let result = fut.await;
            recorder.record(method, Outcome::of(&result), start.elapsed());
            result
        })
    }
}
