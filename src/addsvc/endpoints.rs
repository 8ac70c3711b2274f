//! Add service endpoints, each wrapped in the full middleware chain.

use std::future::{self, Ready};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tower::ServiceExt;

use super::service::{AddService, ServiceError};
use crate::config::EndpointsConfig;
use crate::endpoint::{Adapter, BoxEndpoint, Context, EndpointBuilder, EndpointError, Reply};
use crate::observability::{DurationRecorder, Redact};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SumRequest {
    pub a: i64,
    pub b: i64,
}

impl Redact for SumRequest {
    fn redacted(&self) -> String {
        format!("a={} b={}", self.a, self.b)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcatRequest {
    pub a: String,
    pub b: String,
}

// Strings may carry user data; only their sizes are logged.
impl Redact for ConcatRequest {
    fn redacted(&self) -> String {
        format!("a.len={} b.len={}", self.a.len(), self.b.len())
    }
}

pub type SumResponse = Reply<i64, ServiceError>;
pub type ConcatResponse = Reply<String, ServiceError>;

pub fn make_sum_endpoint<S: AddService>(
    service: Arc<S>,
) -> Adapter<impl Fn(Context, SumRequest) -> Ready<Result<i64, ServiceError>> + Clone + Send> {
    Adapter::new(move |_ctx: Context, req: SumRequest| future::ready(service.sum(req.a, req.b)))
}

pub fn make_concat_endpoint<S: AddService>(
    service: Arc<S>,
) -> Adapter<impl Fn(Context, ConcatRequest) -> Ready<Result<String, ServiceError>> + Clone + Send>
{
    Adapter::new(move |_ctx: Context, req: ConcatRequest| {
        future::ready(service.concat(&req.a, &req.b))
    })
}

/// One decorated endpoint per add service operation.
#[derive(Clone)]
pub struct Endpoints {
    pub sum_endpoint: BoxEndpoint<SumRequest, SumResponse>,
    pub concat_endpoint: BoxEndpoint<ConcatRequest, ConcatResponse>,
}

impl Endpoints {
    pub fn new<S: AddService>(
        service: Arc<S>,
        config: &EndpointsConfig,
        durations: Arc<dyn DurationRecorder>,
    ) -> Self {
        let sum_endpoint = EndpointBuilder::new("sum", &config.sum, durations.clone())
            .build(make_sum_endpoint(service.clone()));
        let concat_endpoint = EndpointBuilder::new("concat", &config.concat, durations)
            .build(make_concat_endpoint(service));

        Self {
            sum_endpoint,
            concat_endpoint,
        }
    }

    pub async fn sum(&self, ctx: Context, a: i64, b: i64) -> Result<SumResponse, EndpointError> {
        self.sum_endpoint
            .clone()
            .oneshot((ctx, SumRequest { a, b }))
            .await
    }

    pub async fn concat(
        &self,
        ctx: Context,
        a: impl Into<String>,
        b: impl Into<String>,
    ) -> Result<ConcatResponse, EndpointError> {
        let req = ConcatRequest {
            a: a.into(),
            b: b.into(),
        };
        self.concat_endpoint.clone().oneshot((ctx, req)).await
    }
}
