//! Per-call context carried through the middleware chain.
//!
//! A `Context` is never mutated once built. Every `with_*` method returns a
//! derived copy, so a middleware can hand its inner endpoint a richer context
//! (for example one carrying a child span) without the caller noticing.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::select_all;
use http::Extensions;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::Span;
use uuid::Uuid;

use super::EndpointError;

/// Per-call carrier of request id, deadline, cancellation, span and values.
#[derive(Debug, Clone)]
pub struct Context {
    request_id: Uuid,
    deadline: Option<Instant>,
    /// One receiver per cancellation scope, outermost first.
    cancellation: Vec<watch::Receiver<bool>>,
    span: Span,
    values: Arc<Extensions>,
}

/// Cancels the scope created by [`Context::with_cancel`].
///
/// Dropping the handle without calling `cancel` leaves the scope running.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Context {
    /// A fresh root context: new request id, no deadline, no span.
    pub fn background() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            deadline: None,
            cancellation: Vec::new(),
            span: Span::none(),
            values: Arc::new(Extensions::new()),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn with_request_id(&self, request_id: Uuid) -> Self {
        Self {
            request_id,
            ..self.clone()
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Derive a context that expires at `at`, or earlier if the parent does.
    pub fn with_deadline(&self, at: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current <= at => current,
            _ => at,
        };
        Self {
            deadline: Some(deadline),
            ..self.clone()
        }
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a cancellable context.
    ///
    /// The child also observes every cancellation scope of its parent;
    /// cancelling the child leaves the parent untouched.
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let mut child = self.clone();
        child.cancellation.push(rx);
        (child, CancelHandle { tx: Arc::new(tx) })
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn with_span(&self, span: Span) -> Self {
        Self {
            span,
            ..self.clone()
        }
    }

    pub fn value<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.values.get::<T>()
    }

    /// Derive a context carrying `value`, replacing any value of the same type.
    pub fn with_value<T: Clone + Send + Sync + 'static>(&self, value: T) -> Self {
        let mut values = (*self.values).clone();
        values.insert(value);
        Self {
            values: Arc::new(values),
            ..self.clone()
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.iter().any(|rx| *rx.borrow())
    }

    /// The error this context would end a call with right now, if any.
    pub fn err(&self) -> Option<EndpointError> {
        if self.is_cancelled() {
            return Some(EndpointError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(EndpointError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> EndpointError {
        let cancelled = self.cancelled();
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = cancelled => EndpointError::Cancelled,
                _ = tokio::time::sleep_until(deadline) => EndpointError::DeadlineExceeded,
            },
            None => {
                cancelled.await;
                EndpointError::Cancelled
            }
        }
    }

    async fn cancelled(&self) {
        if self.cancellation.is_empty() {
            return std::future::pending().await;
        }
        let waits = self.cancellation.iter().cloned().map(|mut rx| {
            Box::pin(async move {
                let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
                if closed {
                    // handle dropped without cancelling
                    std::future::pending::<()>().await;
                }
            })
        });
        select_all(waits).await;
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}
