//! services/mirror/src/adapters/upstream.rs
//!
//! Transports that reach a real backend: a remote one over HTTP, or the local
//! trick CRUD router served in-process.

use crate::error::ApiError;
use crate::web::transport::{buffer_body, Transport};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    Router,
};
use tower::ServiceExt;
use tracing::{debug, error};

//=========================================================================================
// Remote backend over HTTP
//=========================================================================================

/// Forwards requests to `base_url`, keeping method, path, query, headers and body.
/// The response body is streamed back as it arrives.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request<Body>) -> Result<Response, ApiError> {
        let (parts, body) = request.into_parts();
        let bytes = buffer_body(body).await?;

        let path = parts.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %parts.method, %url, "Forwarding to upstream.");

        let mut headers = parts.headers;
        headers.remove(header::HOST);

        let upstream = self
            .client
            .request(parts.method, &url)
            .headers(headers)
            .body(bytes)
            .send()
            .await
            .map_err(|e| {
                error!(%url, error = %e, "Upstream request failed.");
                ApiError::Upstream(e.to_string())
            })?;

        let mut response = Response::builder().status(upstream.status());
        if let Some(out) = response.headers_mut() {
            *out = upstream.headers().clone();
            out.remove(header::TRANSFER_ENCODING);
            out.remove(header::CONNECTION);
        }
        response
            .body(Body::from_stream(upstream.bytes_stream()))
            .map_err(|e| ApiError::Internal(e.to_string()))
    }
}

//=========================================================================================
// In-process router
//=========================================================================================

/// Serves requests with an axum `Router` without touching the network.
#[derive(Clone)]
pub struct RouterTransport {
    router: Router,
}

impl RouterTransport {
    pub fn new(router: Router) -> Self {
        Self { router }
    }
}

#[async_trait]
impl Transport for RouterTransport {
    async fn send(&self, request: Request<Body>) -> Result<Response, ApiError> {
        match self.router.clone().oneshot(request).await {
            Ok(response) => Ok(response),
            Err(never) => match never {},
        }
    }
}
