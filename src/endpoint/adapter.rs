//! Business adapter: the innermost endpoint of every chain.
//!
//! Turns an async business operation returning `Result<T, E>` into an
//! endpoint returning `Reply<T, E>`. Business errors land in the reply;
//! the transport error channel is reserved for cancellation, deadlines and
//! panics.

use std::any::Any;
use std::future::{self, Future};
use std::panic::{self, AssertUnwindSafe};
use std::task::{Context as TaskContext, Poll};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tower::Service;

use super::{Context, EndpointError, Reply};
use crate::resilience::timeouts;

/// Endpoint wrapping a business operation `Fn(Context, Req) -> Future`.
#[derive(Debug, Clone)]
pub struct Adapter<F> {
    op: F,
}

impl<F> Adapter<F> {
    pub fn new(op: F) -> Self {
        Self { op }
    }
}

impl<F, Fut, Req, T, E> Service<(Context, Req)> for Adapter<F>
where
    F: Fn(Context, Req) -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    type Response = Reply<T, E>;
    type Error = EndpointError;
    type Future = BoxFuture<'static, Result<Reply<T, E>, EndpointError>>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, (ctx, req): (Context, Req)) -> Self::Future {
        if let Some(err) = ctx.err() {
            return Box::pin(future::ready(Err(err)));
        }

        let op = &self.op;
        let fut = match panic::catch_unwind(AssertUnwindSafe(|| op(ctx.clone(), req))) {
            Ok(fut) => fut,
            Err(payload) => {
                return Box::pin(future::ready(Err(panicked(payload))));
            }
        };

        Box::pin(async move {
            match timeouts::enforce(&ctx, AssertUnwindSafe(fut).catch_unwind()).await? {
                Ok(result) => Ok(Reply::from(result)),
                Err(payload) => Err(panicked(payload)),
            }
        })
    }
}

fn panicked(payload: Box<dyn Any + Send>) -> EndpointError {
    let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!(panic = %message, "business operation panicked");
    EndpointError::Panicked(message)
}
