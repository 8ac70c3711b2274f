//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use addsvc_endpoints::addsvc::SumRequest;
use addsvc_endpoints::config::{CircuitBreakerConfig, EndpointConfig, RateLimitConfig};
use addsvc_endpoints::endpoint::{Adapter, BoxEndpoint, Context, EndpointBuilder, Outcome, Reply};
use addsvc_endpoints::observability::DurationRecorder;
use addsvc_endpoints::resilience::{CircuitBreaker, TokenBucket};
use addsvc_endpoints::EndpointError;
use futures_util::future::BoxFuture;
use tokio::sync::Notify;
use tower::ServiceExt;
use tracing::subscriber::DefaultGuard;

pub type TestEndpoint = BoxEndpoint<SumRequest, Reply<i64, String>>;

/// What the scripted business operation does on its next call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    FailBusiness,
    Panic,
    /// Block until [`Backend::release`] is called.
    WaitForRelease,
}

/// A scripted business operation that counts its invocations.
#[derive(Clone)]
pub struct Backend {
    calls: Arc<AtomicUsize>,
    behavior: Arc<Mutex<Behavior>>,
    release: Arc<Notify>,
}

impl Backend {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            behavior: Arc::new(Mutex::new(behavior)),
            release: Arc::new(Notify::new()),
        }
    }

    pub fn set(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    /// Yield to other tasks until the operation has been invoked `n` times.
    pub async fn wait_for_calls(&self, n: usize) {
        while self.calls() < n {
            tokio::task::yield_now().await;
        }
    }

    pub fn adapter(
        &self,
    ) -> Adapter<
        impl Fn(Context, SumRequest) -> BoxFuture<'static, Result<i64, String>> + Clone + Send,
    > {
        let backend = self.clone();
        Adapter::new(move |_ctx: Context, req: SumRequest| {
            backend.calls.fetch_add(1, Ordering::SeqCst);
            tracing::info!(a = req.a, b = req.b, "business op invoked");
            let behavior = *backend.behavior.lock().unwrap();
            let release = backend.release.clone();
            let fut: BoxFuture<'static, Result<i64, String>> = Box::pin(async move {
                match behavior {
                    Behavior::Succeed => Ok(req.a + req.b),
                    Behavior::FailBusiness => Err("business rejected".to_string()),
                    Behavior::Panic => panic!("backend exploded"),
                    Behavior::WaitForRelease => {
                        release.notified().await;
                        Ok(req.a + req.b)
                    }
                }
            });
            fut
        })
    }
}

pub fn endpoint_config(
    capacity: u32,
    refill_per_second: f64,
    failure_threshold: u32,
    reset_timeout: Duration,
) -> EndpointConfig {
    EndpointConfig {
        rate_limit: RateLimitConfig {
            capacity,
            refill_per_second,
        },
        circuit_breaker: CircuitBreakerConfig {
            failure_threshold,
            reset_timeout_ms: reset_timeout.as_millis() as u64,
        },
    }
}

/// A decorated endpoint over `backend`, with handles on its gates.
pub struct Harness {
    pub endpoint: TestEndpoint,
    pub bucket: Arc<TokenBucket>,
    pub breaker: Arc<CircuitBreaker>,
}

impl Harness {
    pub fn new(
        backend: &Backend,
        config: &EndpointConfig,
        durations: Arc<dyn DurationRecorder>,
    ) -> Self {
        let builder = EndpointBuilder::new("sum", config, durations);
        let bucket = builder.bucket().clone();
        let breaker = builder.breaker().clone();
        Self {
            endpoint: builder.build(backend.adapter()),
            bucket,
            breaker,
        }
    }

    pub async fn call(&self, ctx: Context) -> Result<Reply<i64, String>, EndpointError> {
        self.endpoint
            .clone()
            .oneshot((ctx, SumRequest { a: 1, b: 2 }))
            .await
    }
}

/// Durations recorder keeping every observation in memory.
#[derive(Default)]
pub struct Recorded(Mutex<Vec<(&'static str, Outcome)>>);

impl Recorded {
    pub fn outcomes(&self) -> Vec<Outcome> {
        self.0.lock().unwrap().iter().map(|(_, o)| *o).collect()
    }
}

impl DurationRecorder for Recorded {
    fn record(&self, method: &'static str, outcome: Outcome, _elapsed: Duration) {
        self.0.lock().unwrap().push((method, outcome));
    }
}

/// In-memory sink for formatted log output.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Route this thread's log output into a buffer until the guard drops.
pub fn capture_logs() -> (LogBuffer, DefaultGuard) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (buffer, guard)
}
