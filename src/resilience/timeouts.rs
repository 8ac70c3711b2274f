//! Deadline and cancellation enforcement.
//!
//! # Responsibilities
//! - Race a call against its context's cancellation signal and deadline
//! - Fail fast when the context is already done
//!
//! # Design Decisions
//! - Uses Tokio's timer facilities through `Context::done`
//! - Context errors are distinct from other transport errors

use std::future::Future;

use crate::endpoint::{Context, EndpointError};

/// Run `fut` until it completes or `ctx` is cancelled or expires.
///
/// The future is dropped as soon as the context ends.
pub async fn enforce<F: Future>(ctx: &Context, fut: F) -> Result<F::Output, EndpointError> {
    if let Some(err) = ctx.err() {
        return Err(err);
    }
    tokio::select! {
        biased;
        err = ctx.done() => Err(err),
        out = fut => Ok(out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_completes_before_deadline() {
        let ctx = Context::background().with_timeout(Duration::from_secs(5));
        let out = enforce(&ctx, async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            7
        })
        .await
        .unwrap();
        assert_eq!(out, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_wins() {
        let ctx = Context::background().with_timeout(Duration::from_millis(100));
        let err = enforce(&ctx, tokio::time::sleep(Duration::from_secs(10)))
            .await
            .unwrap_err();
        assert!(matches!(err, EndpointError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_cancel_wins() {
        let (ctx, handle) = Context::background().with_cancel();
        let pending = enforce(&ctx, std::future::pending::<()>());
        handle.cancel();
        assert!(matches!(pending.await, Err(EndpointError::Cancelled)));
    }
}
