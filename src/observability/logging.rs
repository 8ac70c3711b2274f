//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the `tracing` subscriber (pretty or JSON)
//! - Emit one structured event per endpoint call
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level
//! - Logs go to stderr; stdout belongs to command output
//! - Request payloads are never logged verbatim; each request type
//!   decides what it exposes through [`Redact`]

use std::task::{Context as TaskContext, Poll};

use futures_util::future::BoxFuture;
use tokio::time::Instant;
use tower::{Layer, Service};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, ObservabilityConfig};
use crate::endpoint::{Context, EndpointError, Failer};

/// A loggable view of a request with sensitive content removed.
pub trait Redact {
    fn redacted(&self) -> String;
}

/// Install the global subscriber described by `config`.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    }
}

/// Middleware logging every call after it completes.
#[derive(Debug, Clone)]
pub struct LoggingLayer {
    method: &'static str,
}

impl LoggingLayer {
    pub fn new(method: &'static str) -> Self {
        Self { method }
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = Logging<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Logging {
            inner,
            method: self.method,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Logging<S> {
    inner: S,
    method: &'static str,
}

impl<S, Req> Service<(Context, Req)> for Logging<S>
where
    S: Service<(Context, Req), Error = EndpointError>,
    S::Future: Send + 'static,
    S::Response: Failer + Send + 'static,
    Req: Redact,
{
    type Response = S::Response;
    type Error = EndpointError;
    type Future = BoxFuture<'static, Result<S::Response, EndpointError>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, (ctx, req): (Context, Req)) -> Self::Future {
        let method = self.method;
        let request_id = ctx.request_id();
        let input = req.redacted();
        let start = Instant::now();
        let fut = self.inner.call((ctx, req));

        Box::pin(async move {
            let result = fut.await;
            let took_us = start.elapsed().as_micros() as u64;

            match &result {
                Ok(resp) => match resp.failed() {
                    None => tracing::info!(
                        method,
                        %request_id,
                        input = %input,
                        took_us,
                        outcome = "success",
                        "endpoint call"
                    ),
                    Some(failure) => tracing::info!(
                        method,
                        %request_id,
                        input = %input,
                        took_us,
                        outcome = "business_failed",
                        error = %failure,
                        "endpoint call"
                    ),
                },
                Err(err) => tracing::warn!(
                    method,
                    %request_id,
                    input = %input,
                    took_us,
                    outcome = "transport_error",
                    kind = err.kind(),
                    error = %err,
                    "endpoint call"
                ),
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::Reply;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tower::{service_fn, ServiceExt};

    struct Secret(&'static str);

    impl Redact for Secret {
        fn redacted(&self) -> String {
            format!("secret(len={})", self.0.len())
        }
    }

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_logs_outcome_without_payload() {
        let buffer = Buffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let inner = service_fn(|(_ctx, secret): (Context, Secret)| async move {
            if secret.0.is_empty() {
                Err(EndpointError::CircuitOpen)
            } else {
                Ok(Reply::<usize, String>::Failed("rejected".to_string()))
            }
        });
        let svc = LoggingLayer::new("concat").layer(inner);

        let reply = svc
            .clone()
            .oneshot((Context::background(), Secret("hunter2")))
            .await
            .unwrap();
        assert!(reply.is_failed());
        let err = svc
            .oneshot((Context::background(), Secret("")))
            .await
            .unwrap_err();
        assert!(matches!(err, EndpointError::CircuitOpen));

        let logs = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("secret(len=7)"));
        assert!(!logs.contains("hunter2"));
        assert!(logs.contains("business_failed"));
        assert!(logs.contains("rejected"));
        assert!(logs.contains("transport_error"));
        assert!(logs.contains("circuit breaker is open"));
    }
}
