//! Response typing: the Failer contract and call outcomes.

use std::fmt;

use super::EndpointError;

/// Implemented by response types that can carry a business failure.
///
/// A call that ran to completion but failed for a business reason returns
/// `Ok(response)` with `failed()` returning `Some`. Transport encoders branch
/// on this; the rate limiter and circuit breaker never look at it.
pub trait Failer {
    type Failure: fmt::Display;

    fn failed(&self) -> Option<&Self::Failure>;
}

/// Result of a business operation as seen by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<T, E> {
    Success(T),
    Failed(E),
}

impl<T, E> Reply<T, E> {
    pub fn is_failed(&self) -> bool {
        matches!(self, Reply::Failed(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Reply::Success(v) => Some(v),
            Reply::Failed(_) => None,
        }
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            Reply::Success(v) => Ok(v),
            Reply::Failed(e) => Err(e),
        }
    }
}

impl<T, E> From<Result<T, E>> for Reply<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(v) => Reply::Success(v),
            Err(e) => Reply::Failed(e),
        }
    }
}

impl<T, E: fmt::Display> Failer for Reply<T, E> {
    type Failure = E;

    fn failed(&self) -> Option<&E> {
        match self {
            Reply::Success(_) => None,
            Reply::Failed(e) => Some(e),
        }
    }
}

/// How a single endpoint call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    BusinessFailed,
    TransportError,
}

impl Outcome {
    /// Classify an endpoint result.
    pub fn of<R: Failer>(result: &Result<R, EndpointError>) -> Self {
        match result {
            Ok(resp) if resp.failed().is_some() => Outcome::BusinessFailed,
            Ok(_) => Outcome::Success,
            Err(_) => Outcome::TransportError,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::BusinessFailed => "business_failed",
            Outcome::TransportError => "transport_error",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failer_accessor() {
        let ok: Reply<i64, String> = Reply::Success(3);
        assert!(ok.failed().is_none());
        assert_eq!(ok.value(), Some(&3));

        let failed: Reply<i64, String> = Err("two zeroes".to_string()).into();
        assert_eq!(failed.failed().map(String::as_str), Some("two zeroes"));
        assert!(failed.is_failed());
        assert_eq!(failed.into_result(), Err("two zeroes".to_string()));
    }

    #[test]
    fn test_outcome_classification() {
        let ok: Result<Reply<i64, String>, EndpointError> = Ok(Reply::Success(1));
        assert_eq!(Outcome::of(&ok), Outcome::Success);

        let business: Result<Reply<i64, String>, EndpointError> =
            Ok(Reply::Failed("nope".into()));
        assert_eq!(Outcome::of(&business), Outcome::BusinessFailed);

        let transport: Result<Reply<i64, String>, EndpointError> =
            Err(EndpointError::RateLimited);
        assert_eq!(Outcome::of(&transport), Outcome::TransportError);
        assert_eq!(Outcome::of(&transport).to_string(), "transport_error");
    }
}
