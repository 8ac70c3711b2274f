//! Token-bucket rate limiting middleware.

use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context as TaskContext, Poll};

use futures_util::future::{Either, Ready};
use tokio::time::Instant;
use tower::{Layer, Service};

use crate::config::RateLimitConfig;
use crate::endpoint::EndpointError;
use crate::observability::metrics;

/// Token count as of `since`. Refill is derived from this fixed base, so
/// rejected calls never touch the state and accumulate no rounding error.
#[derive(Debug)]
struct BucketState {
    tokens: f64,
    since: Instant,
}

/// A token bucket shared by every clone of one endpoint.
///
/// Starts full. Each admitted call costs one token; tokens refill
/// continuously at `refill_per_second`, capped at `capacity`.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_per_second: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    pub fn new(capacity: u32, refill_per_second: f64) -> Self {
        let capacity = f64::from(capacity);
        Self {
            capacity,
            refill_per_second: refill_per_second.max(0.0),
            state: Mutex::new(BucketState {
                tokens: capacity,
                since: Instant::now(),
            }),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.capacity, config.refill_per_second)
    }

    /// Refill, then take one token if available.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let tokens = self.tokens_at(&state, now);

        if tokens >= 1.0 {
            state.tokens = tokens - 1.0;
            state.since = now;
            true
        } else {
            false
        }
    }

    /// Tokens currently available, after refilling.
    pub fn available(&self) -> f64 {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        self.tokens_at(&state, Instant::now())
    }

    fn tokens_at(&self, state: &BucketState, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(state.since).as_secs_f64();
        (state.tokens + elapsed * self.refill_per_second).min(self.capacity)
    }
}

/// Middleware gating calls on a [`TokenBucket`].
#[derive(Debug, Clone)]
pub struct RateLimitLayer {
    operation: &'static str,
    bucket: Arc<TokenBucket>,
}

impl RateLimitLayer {
    pub fn new(operation: &'static str, bucket: Arc<TokenBucket>) -> Self {
        Self { operation, bucket }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimit<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimit {
            inner,
            operation: self.operation,
            bucket: self.bucket.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimit<S> {
    inner: S,
    operation: &'static str,
    bucket: Arc<TokenBucket>,
}

impl<S, Req> Service<Req> for RateLimit<S>
where
    S: Service<Req, Error = EndpointError>,
{
    type Response = S::Response;
    type Error = EndpointError;
    type Future = Either<Ready<Result<S::Response, EndpointError>>, S::Future>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        if self.bucket.try_acquire() {
            Either::Right(self.inner.call(req))
        } else {
            tracing::debug!(method = self.operation, "rate limit exceeded");
            metrics::record_rejection(self.operation, "rate_limited");
            Either::Left(futures_util::future::ready(Err(EndpointError::RateLimited)))
        }
    }
}
