//! Reference add service and its decorated endpoints.

pub mod endpoints;
pub mod service;

pub use endpoints::{
    make_concat_endpoint, make_sum_endpoint, ConcatRequest, ConcatResponse, Endpoints, SumRequest,
    SumResponse,
};
pub use service::{AddService, BasicService, ServiceError, MAX_CONCAT_LEN};
