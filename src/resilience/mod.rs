//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call into an endpoint:
//!     → rate_limit.rs (take a token or reject with RateLimited)
//!     → circuit_breaker.rs (admit, or reject with CircuitOpen)
//!     → business adapter
//!         → timeouts.rs (race the operation against cancellation/deadline)
//!     ← circuit_breaker.rs (settle admission with the transport outcome)
//! ```
//!
//! # Design Decisions
//! - Rate limiting sits outside the breaker: calls shed by the limiter
//!   never touch the breaker's state machine
//! - Gates decide synchronously inside `call`; a rejected call never
//!   reaches the inner endpoint
//! - Nothing here retries; rejections are distinct errors the caller can act on
//! - One bucket and one breaker per operation, shared through `Arc`

pub mod circuit_breaker;
pub mod rate_limit;
pub mod timeouts;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerLayer, CircuitState};
pub use rate_limit::{RateLimitLayer, TokenBucket};
