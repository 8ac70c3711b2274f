//! Reference business service: integer sum and bounded string concat.

use thiserror::Error;

/// Longest string `concat` will produce, in bytes.
pub const MAX_CONCAT_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("can't sum two zeroes")]
    TwoZeroes,

    #[error("integer overflow")]
    IntOverflow,

    #[error("result exceeds maximum size")]
    MaxSizeExceeded,
}

/// Operations exposed through the add service endpoints.
pub trait AddService: Send + Sync + 'static {
    fn sum(&self, a: i64, b: i64) -> Result<i64, ServiceError>;
    fn concat(&self, a: &str, b: &str) -> Result<String, ServiceError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BasicService;

impl AddService for BasicService {
    fn sum(&self, a: i64, b: i64) -> Result<i64, ServiceError> {
        if a == 0 && b == 0 {
            return Err(ServiceError::TwoZeroes);
        }
        a.checked_add(b).ok_or(ServiceError::IntOverflow)
    }

    fn concat(&self, a: &str, b: &str) -> Result<String, ServiceError> {
        if a.len() + b.len() > MAX_CONCAT_LEN {
            return Err(ServiceError::MaxSizeExceeded);
        }
        Ok(format!("{a}{b}"))
    }
}
