//! Endpoint abstraction and composition.
//!
//! # Data Flow
//! ```text
//! (Context, Request)
//!     → Logging → Instrumenting → Tracing
//!     → RateLimiting → CircuitBreaking
//!     → Adapter → business operation
//!     → Result<Reply<T, E>, EndpointError>
//! ```
//!
//! # Design Decisions
//! - An endpoint is a `tower::Service` over `(Context, Request)`; middlewares
//!   are `tower::Layer`s and compose with `ServiceBuilder`
//! - Business failures travel inside the response ([`Failer`]); the error
//!   channel carries only transport errors ([`EndpointError`])
//! - Contexts are immutable; middlewares hand inner endpoints derived copies

pub mod adapter;
pub mod builder;
pub mod context;
pub mod error;
pub mod reply;

pub use adapter::Adapter;
pub use builder::EndpointBuilder;
pub use context::{CancelHandle, Context};
pub use error::EndpointError;
pub use reply::{Failer, Outcome, Reply};

use tower::util::BoxCloneService;
use tower::Service;

/// Type-erased endpoint, cheap to clone and share across tasks.
pub type BoxEndpoint<Req, Resp> = BoxCloneService<(Context, Req), Resp, EndpointError>;

/// Any service usable as an endpoint for requests of type `Req`.
pub trait Endpoint<Req>:
    Service<(Context, Req), Error = EndpointError> + Clone + Send + 'static
{
}

impl<S, Req> Endpoint<Req> for S where
    S: Service<(Context, Req), Error = EndpointError> + Clone + Send + 'static
{
}
