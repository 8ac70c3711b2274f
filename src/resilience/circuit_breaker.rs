//! Circuit breaker middleware.
//!
//! # States
//! - Closed: normal operation, calls pass through, failures counted
//! - Open: inner endpoint assumed down, calls fail fast with `CircuitOpen`
//! - Half-Open: one trial call allowed through, everything else rejected
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= failure_threshold
//! Open → Half-Open: first call arriving at or after opened_at + reset_timeout
//! Half-Open → Closed: trial call succeeds
//! Half-Open → Open: trial call fails (opened_at restarts)
//! ```
//!
//! Only transport errors count as failures. A response whose `Failer`
//! accessor reports a business failure is a success here.
//!
//! Every state change bumps a generation counter. Outcomes of calls admitted
//! under an older generation are ignored, so a slow call admitted while
//! Closed cannot reopen a breaker that has since moved on.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context as TaskContext, Poll};
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::time::Instant;
use tower::{Layer, Service};

use crate::config::CircuitBreakerConfig;
use crate::endpoint::EndpointError;
use crate::observability::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
    generation: u64,
}

/// Failure-triggered gate shared by every clone of one endpoint.
#[derive(Debug)]
pub struct CircuitBreaker {
    operation: &'static str,
    failure_threshold: u32,
    reset_timeout: Duration,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(operation: &'static str, failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            operation,
            failure_threshold: failure_threshold.max(1),
            reset_timeout,
            state: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_in_flight: false,
                generation: 0,
            }),
        }
    }

    pub fn from_config(operation: &'static str, config: &CircuitBreakerConfig) -> Self {
        Self::new(operation, config.failure_threshold, config.reset_timeout())
    }

    /// Current state. Reading never moves Open to Half-Open; only a call does.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    /// Decide synchronously whether a call may proceed.
    pub fn admit(self: &Arc<Self>) -> Result<Admission, EndpointError> {
        let mut st = self.lock();
        let trial = match st.state {
            CircuitState::Closed => false,
            CircuitState::Open => {
                let reopen_at = st.opened_at.map(|at| at + self.reset_timeout);
                match reopen_at {
                    Some(at) if Instant::now() >= at => {
                        self.transition(&mut st, CircuitState::HalfOpen);
                        st.trial_in_flight = true;
                        true
                    }
                    _ => return Err(self.reject()),
                }
            }
            CircuitState::HalfOpen => {
                if st.trial_in_flight {
                    return Err(self.reject());
                }
                st.trial_in_flight = true;
                true
            }
        };

        Ok(Admission {
            breaker: self.clone(),
            generation: st.generation,
            trial,
            settled: false,
        })
    }

    fn on_success(&self, generation: u64) {
        let mut st = self.lock();
        if st.generation != generation {
            return;
        }
        match st.state {
            CircuitState::Closed => st.consecutive_failures = 0,
            CircuitState::HalfOpen => {
                st.consecutive_failures = 0;
                st.trial_in_flight = false;
                self.transition(&mut st, CircuitState::Closed);
            }
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self, generation: u64) {
        let mut st = self.lock();
        if st.generation != generation {
            return;
        }
        match st.state {
            CircuitState::Closed => {
                st.consecutive_failures += 1;
                if st.consecutive_failures >= self.failure_threshold {
                    tracing::warn!(
                        method = self.operation,
                        failures = st.consecutive_failures,
                        "circuit breaker tripped"
                    );
                    st.consecutive_failures = 0;
                    st.opened_at = Some(Instant::now());
                    self.transition(&mut st, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                st.trial_in_flight = false;
                st.opened_at = Some(Instant::now());
                self.transition(&mut st, CircuitState::Open);
            }
            CircuitState::Open => {}
        }
    }

    fn on_abandoned(&self, generation: u64) {
        let mut st = self.lock();
        if st.generation == generation && st.state == CircuitState::HalfOpen {
            st.trial_in_flight = false;
        }
    }

    fn transition(&self, st: &mut BreakerState, to: CircuitState) {
        tracing::info!(method = self.operation, from = %st.state, to = %to, "circuit state change");
        st.state = to;
        st.generation += 1;
        metrics::record_circuit_state(self.operation, to);
    }

    fn reject(&self) -> EndpointError {
        tracing::debug!(method = self.operation, "circuit open, call rejected");
        metrics::record_rejection(self.operation, "circuit_open");
        EndpointError::CircuitOpen
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Permission for one call, settled with its outcome.
///
/// A Half-Open trial dropped before settling frees the trial slot and
/// leaves the breaker Half-Open.
#[derive(Debug)]
pub struct Admission {
    breaker: Arc<CircuitBreaker>,
    generation: u64,
    trial: bool,
    settled: bool,
}

impl Admission {
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn settle(mut self, success: bool) {
        self.settled = true;
        if success {
            self.breaker.on_success(self.generation);
        } else {
            self.breaker.on_failure(self.generation);
        }
    }
}

impl Drop for Admission {
    fn drop(&mut self) {
        if !self.settled && self.trial {
            self.breaker.on_abandoned(self.generation);
        }
    }
}

/// Middleware gating calls on a [`CircuitBreaker`].
#[derive(Debug, Clone)]
pub struct CircuitBreakerLayer {
    breaker: Arc<CircuitBreaker>,
}

impl CircuitBreakerLayer {
    pub fn new(breaker: Arc<CircuitBreaker>) -> Self {
        Self { breaker }
    }
}

impl<S> Layer<S> for CircuitBreakerLayer {
    type Service = CircuitBreaking<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CircuitBreaking {
            inner,
            breaker: self.breaker.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreaking<S> {
    inner: S,
    breaker: Arc<CircuitBreaker>,
}

impl<S, Req> Service<Req> for CircuitBreaking<S>
where
    S: Service<Req, Error = EndpointError>,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
{
    type Response = S::Response;
    type Error = EndpointError;
    type Future = BoxFuture<'static, Result<S::Response, EndpointError>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let admission = match self.breaker.admit() {
            Ok(admission) => admission,
            Err(err) => return Box::pin(futures_util::future::ready(Err(err))),
        };
        let fut = self.inner.call(req);

        Box::pin(async move {
            let result = fut.await;
            admission.settle(result.is_ok());
            result
        })
    }
}
