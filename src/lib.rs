//! Endpoint middleware core for the add service.
//!
//! An endpoint is a `tower::Service` over `(Context, Request)`. Cross-cutting
//! behavior (rate limiting, circuit breaking, tracing, logging and latency
//! instrumentation) is layered around a business adapter in a fixed order
//! by [`endpoint::EndpointBuilder`].

pub mod addsvc;
pub mod config;
pub mod endpoint;
pub mod observability;
pub mod resilience;

pub use config::ServiceConfig;
pub use endpoint::{BoxEndpoint, Context, EndpointBuilder, EndpointError, Failer, Reply};
