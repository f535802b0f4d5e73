pub mod auth;
pub mod coach;
pub mod feedback;
pub mod interceptor;
pub mod me;
pub mod protocol;
pub mod random;
pub mod rest;
pub mod routes;
pub mod state;
pub mod stream;
pub mod transport;

// Re-export the pieces the binaries and integration tests assemble.
pub use interceptor::{proxy_handler, Interceptor};
pub use rest::{trick_router, ApiDoc};
pub use transport::Transport;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Method,
};
use axum::Router;
use state::AppState;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// The public router: Swagger UI plus a fallback that sends every other
/// request through the state's transport.
pub fn mirror_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(proxy_handler)
        .layer(cors)
        .with_state(app_state)
}
