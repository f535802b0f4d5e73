//! services/mirror/src/web/interceptor.rs
//!
//! The request interceptor: a `Transport` that answers recognised routes
//! locally and forwards everything else, untouched, to the transport it wraps.

use crate::error::ApiError;
use crate::session::SessionContext;
use crate::web::routes::{route_table, InterceptedRequest, Outcome, Route, RouteContext};
use crate::web::state::AppState;
use crate::web::transport::{buffer_body, Transport};
use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{Request, State},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct Interceptor<T> {
    inner: T,
    context: RouteContext,
    routes: Vec<Route>,
}

impl<T: Transport> Interceptor<T> {
    pub fn new(inner: T, session: SessionContext, stream_delay: Duration) -> Self {
        Self {
            inner,
            context: RouteContext {
                session,
                stream_delay,
            },
            routes: route_table(),
        }
    }

    /// Always yields a response: route failures and forwarding failures are
    /// rendered, never returned.
    pub async fn dispatch(&self, request: Request) -> Response {
        let (parts, body) = request.into_parts();
        let bytes = match buffer_body(body).await {
            Ok(bytes) => bytes,
            Err(e) => return e.into_response(),
        };

        let intercepted = InterceptedRequest::new(parts.method.clone(), parts.uri.path(), bytes.clone());
        match self.route(&intercepted) {
            Ok(Outcome::Respond(response)) => response,
            Ok(Outcome::Forward) => {
                let request = Request::from_parts(parts, Body::from(bytes));
                self.inner
                    .send(request)
                    .await
                    .unwrap_or_else(IntoResponse::into_response)
            }
            Err(e) => e.into_response(),
        }
    }

    fn route(&self, req: &InterceptedRequest) -> Result<Outcome, ApiError> {
        match self.routes.iter().find(|r| (r.matches)(&req.method, &req.path)) {
            Some(route) => {
                debug!(route = route.name, method = %req.method, path = %req.path, "Intercepted.");
                (route.handler)(req, &self.context)
            }
            None => {
                debug!(method = %req.method, path = %req.path, "Passing through.");
                Ok(Outcome::Forward)
            }
        }
    }
}

#[async_trait]
impl<T: Transport> Transport for Interceptor<T> {
    async fn send(&self, request: Request) -> Result<Response, ApiError> {
        Ok(self.dispatch(request).await)
    }
}

/// Axum fallback handing every incoming request to the configured transport.
pub async fn proxy_handler(State(state): State<Arc<AppState>>, request: Request) -> Response {
    state
        .transport
        .send(request)
        .await
        .unwrap_or_else(IntoResponse::into_response)
}
