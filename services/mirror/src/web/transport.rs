//! services/mirror/src/web/transport.rs
//!
//! The outbound-request seam. Anything that can turn a request into a
//! response is a `Transport`: the real backend, an in-process router, a test
//! fake, or an interceptor wrapping any of those.

use crate::error::ApiError;
use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::Request,
    response::Response,
};
use std::sync::Arc;

/// Request bodies larger than this are rejected before dispatch.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request<Body>) -> Result<Response, ApiError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: Request<Body>) -> Result<Response, ApiError> {
        (**self).send(request).await
    }
}

/// Buffers a request body so it can be both inspected and forwarded.
pub async fn buffer_body(body: Body) -> Result<Bytes, ApiError> {
    axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ApiError::MalformedRequest(format!("Could not read request body: {}", e)))
}
