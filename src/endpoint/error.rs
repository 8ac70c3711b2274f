//! Transport-level endpoint errors.

use thiserror::Error;
use tower::BoxError;

/// Errors surfaced through the endpoint's own error channel.
///
/// These are infrastructure failures. Business failures never show up here;
/// they travel inside an `Ok` response via [`Failer`](super::Failer).
#[derive(Debug, Error)]
pub enum EndpointError {
    /// The token bucket had no token for this call.
    #[error("rate limit exceeded")]
    RateLimited,

    /// The circuit breaker rejected the call without invoking the endpoint.
    #[error("circuit breaker is open")]
    CircuitOpen,

    /// The call context was cancelled.
    #[error("context cancelled")]
    Cancelled,

    /// The call context's deadline elapsed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// The business operation panicked.
    #[error("business operation panicked: {0}")]
    Panicked(String),

    /// Any other infrastructure failure reported by an inner endpoint.
    #[error("transport failure: {0}")]
    Transport(BoxError),
}

impl EndpointError {
    /// Wrap an arbitrary error as a transport failure.
    pub fn transport(err: impl Into<BoxError>) -> Self {
        Self::Transport(err.into())
    }

    /// True for rejections produced by a gate (rate limiter or breaker).
    ///
    /// Callers may back off and retry these; the core never does.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::RateLimited | Self::CircuitOpen)
    }

    /// True when the call context ended the call.
    pub fn is_context_error(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    /// Stable short name, used as a log field and metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::CircuitOpen => "circuit_open",
            Self::Cancelled => "cancelled",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::Panicked(_) => "panicked",
            Self::Transport(_) => "transport",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(EndpointError::RateLimited.to_string(), "rate limit exceeded");
        assert_eq!(EndpointError::CircuitOpen.to_string(), "circuit breaker is open");

        let err = EndpointError::transport("backend down");
        assert_eq!(err.to_string(), "transport failure: backend down");
        assert_eq!(err.kind(), "transport");
    }

    #[test]
    fn test_classification() {
        assert!(EndpointError::RateLimited.is_rejection());
        assert!(EndpointError::CircuitOpen.is_rejection());
        assert!(!EndpointError::Cancelled.is_rejection());

        assert!(EndpointError::Cancelled.is_context_error());
        assert!(EndpointError::DeadlineExceeded.is_context_error());
        assert!(!EndpointError::Panicked("boom".into()).is_context_error());
    }
}
