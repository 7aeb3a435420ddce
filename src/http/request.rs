//! Request correlation.
//!
//! # Design Decisions
//! - IDs come from `tower_http::request_id`: a client-supplied `x-request-id`
//!   is kept, otherwise a UUID is generated
//! - The same value is echoed on the response
//! - Handlers read it through the `CurrentRequestId` extractor for logging

use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;
use std::fmt;
use tower_http::request_id::{
    MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};

pub const X_REQUEST_ID: &str = "x-request-id";

pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// The correlation id of the request being handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentRequestId(pub String);

impl fmt::Display for CurrentRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S> FromRequestParts<S> for CurrentRequestId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .extensions
            .get::<RequestId>()
            .and_then(|id| id.header_value().to_str().ok())
            .or_else(|| parts.headers.get(X_REQUEST_ID).and_then(|v| v.to_str().ok()))
            .unwrap_or("unknown");
        Ok(CurrentRequestId(id.to_string()))
    }
}
