//! Distributed tracing support.
//!
//! # Responsibilities
//! - Open a span per endpoint call, child of the span in the call context
//! - Propagate the new span to inner endpoints through a derived context
//! - Record the transport error and elapsed time when the call ends
//!
//! # Design Decisions
//! - Spans come from the `tracing` crate; the installed subscriber is the
//!   injected tracer
//! - A context without a span yields a root span

use std::task::{Context as TaskContext, Poll};

use futures_util::future::BoxFuture;
use tokio::time::Instant;
use tower::{Layer, Service};
use tracing::field::{self, Empty};
use tracing::Instrument;

use crate::endpoint::{Context, EndpointError};

#[derive(Debug, Clone)]
pub struct TracingLayer {
    method: &'static str,
}

impl TracingLayer {
    pub fn new(method: &'static str) -> Self {
        Self { method }
    }
}

impl<S> Layer<S> for TracingLayer {
    type Service = Tracing<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Tracing {
            inner,
            method: self.method,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tracing<S> {
    inner: S,
    method: &'static str,
}

impl<S, Req> Service<(Context, Req)> for Tracing<S>
where
    S: Service<(Context, Req), Error = EndpointError>,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
{
    type Response = S::Response;
    type Error = EndpointError;
    type Future = BoxFuture<'static, Result<S::Response, EndpointError>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, (ctx, req): (Context, Req)) -> Self::Future {
        let span = tracing::info_span!(
            parent: ctx.span().id(),
            "endpoint",
            method = self.method,
            request_id = %ctx.request_id(),
            error = Empty,
            elapsed_ms = Empty
        );
        let derived = ctx.with_span(span.clone());
        let start = Instant::now();
        // Gates and the adapter do work inside `call`; run it in the span too.
        let fut = span
            .in_scope(|| self.inner.call((derived, req)))
            .instrument(span.clone());

        Box::pin(async move {
            let result = fut.await;
            if let Err(err) = &result {
                span.record("error", field::display(err));
            }
            span.record("elapsed_ms", start.elapsed().as_secs_f64() * 1000.0);
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::Reply;
    use std::sync::{Arc, Mutex};
    use tower::{service_fn, ServiceExt};
    use tracing::Span;
    use tracing_subscriber::registry::{LookupSpan, Registry};

    #[tokio::test]
    async fn test_child_span_reaches_inner_endpoint() {
        let _guard = tracing::subscriber::set_default(Registry::default());

        let seen: Arc<Mutex<Option<Span>>> = Arc::default();
        let slot = seen.clone();
        let inner = service_fn(move |(ctx, n): (Context, i64)| {
            *slot.lock().unwrap() = Some(ctx.span().clone());
            async move { Ok::<_, EndpointError>(Reply::<i64, String>::Success(n)) }
        });
        let svc = TracingLayer::new("sum").layer(inner);

        let parent = tracing::info_span!("transport");
        let ctx = Context::background().with_span(parent.clone());
        svc.oneshot((ctx, 1)).await.unwrap();

        let child = seen.lock().unwrap().clone().unwrap();
        let child_id = child.id().expect("endpoint span enabled");
        assert_ne!(Some(child_id.clone()), parent.id());
        assert_eq!(child.metadata().map(|m| m.name()), Some("endpoint"));

        tracing::dispatcher::get_default(|dispatch| {
            let registry = dispatch.downcast_ref::<Registry>().unwrap();
            let span = registry.span(&child_id).unwrap();
            assert_eq!(span.parent().map(|p| p.id()), parent.id());
        });
    }

    #[tokio::test]
    async fn test_root_span_without_parent() {
        let _guard = tracing::subscriber::set_default(Registry::default());

        let seen: Arc<Mutex<Option<Span>>> = Arc::default();
        let slot = seen.clone();
        let inner = service_fn(move |(ctx, _n): (Context, i64)| {
            *slot.lock().unwrap() = Some(ctx.span().clone());
            async move { Err::<Reply<i64, String>, _>(EndpointError::RateLimited) }
        });
        let svc = TracingLayer::new("sum").layer(inner);

        let err = svc.oneshot((Context::background(), 1)).await.unwrap_err();
        assert!(matches!(err, EndpointError::RateLimited));

        let child = seen.lock().unwrap().clone().unwrap();
        let child_id = child.id().unwrap();
        tracing::dispatcher::get_default(|dispatch| {
            let registry = dispatch.downcast_ref::<Registry>().unwrap();
            assert!(registry.span(&child_id).unwrap().parent().is_none());
        });
    }
}
