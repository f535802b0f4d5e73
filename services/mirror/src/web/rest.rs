//! services/mirror/src/web/rest.rs
//!
//! Contains the Axum handlers for the trick management API and the master
//! definition for the OpenAPI specification.
//!
//! This is the backend the interceptor forwards to when no remote upstream is
//! configured. It performs no authorization of its own: writes are gated by
//! the interceptor in front of it.

use crate::error::ApiError;
use crate::web::protocol::parse_json_body;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tricklist_core::domain::{Trick, TrickDraft, TrickPatch};
use tricklist_core::ports::{PortError, TrickRepository};
use utoipa::{OpenApi, ToSchema};

pub type TrickRepo = Arc<dyn TrickRepository>;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_tricks_handler,
        get_trick_handler,
        create_trick_handler,
        update_trick_handler,
        delete_trick_handler,
        import_tricks_handler,
        export_tricks_handler,
    ),
    components(
        schemas(TrickInput, ImportRequest, TrickListResponse, TrickResponse, DeletedResponse, ImportResponse)
    ),
    tags(
        (name = "Trick List API", description = "Trick management endpoints behind the mirror.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Payload and Response Structs
//=========================================================================================

/// Documents the accepted trick fields. Bodies are parsed leniently, so this
/// type is only used for the OpenAPI description.
#[allow(dead_code)]
#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct TrickInput {
    pub id: Option<u64>,
    pub name: Option<String>,
    /// Beginner, Novice, Intermediate, Advanced or Elite. Other values sort last.
    pub level: Option<String>,
    pub description: Option<String>,
    pub tips: Option<String>,
    pub order_index: Option<f64>,
    pub score: Option<f64>,
}

#[allow(dead_code)]
#[derive(ToSchema)]
pub struct ImportRequest {
    pub tricks: Vec<TrickInput>,
}

#[derive(Serialize, ToSchema)]
pub struct TrickListResponse {
    pub success: bool,
    #[schema(value_type = Vec<Object>)]
    pub tricks: Vec<Trick>,
}

#[derive(Serialize, ToSchema)]
pub struct TrickResponse {
    pub success: bool,
    #[schema(value_type = Object)]
    pub trick: Trick,
}

#[derive(Serialize, ToSchema)]
pub struct DeletedResponse {
    pub success: bool,
    #[schema(value_type = Object)]
    pub deleted: Trick,
}

#[derive(Serialize, ToSchema)]
pub struct ImportResponse {
    pub success: bool,
    pub imported: usize,
    #[schema(value_type = Vec<Object>)]
    pub tricks: Vec<Trick>,
}

//=========================================================================================
// Router
//=========================================================================================

/// The trick API under `/api/tricks`, optionally serving `static_dir` for every
/// other path.
pub fn trick_router(repo: TrickRepo, static_dir: Option<&std::path::Path>) -> Router {
    let router = Router::new()
        .route("/api/tricks", get(list_tricks_handler).post(create_trick_handler))
        .route("/api/tricks/import", axum::routing::post(import_tricks_handler))
        .route("/api/tricks/export", get(export_tricks_handler))
        .route(
            "/api/tricks/{id}",
            get(get_trick_handler)
                .put(update_trick_handler)
                .delete(delete_trick_handler),
        )
        .with_state(repo);

    match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    }
}

/// Ids that are not numbers cannot exist, so they are simply not found.
fn parse_id(raw: &str) -> Result<u64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::Port(PortError::NotFound("Trick not found".to_string())))
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List all tricks, sorted by level then order.
#[utoipa::path(
    get,
    path = "/api/tricks",
    responses((status = 200, description = "All tricks", body = TrickListResponse))
)]
pub async fn list_tricks_handler(State(repo): State<TrickRepo>) -> Result<Response, ApiError> {
    let tricks = repo.list_tricks().await?;
    Ok(Json(TrickListResponse { success: true, tricks }).into_response())
}

#[utoipa::path(
    get,
    path = "/api/tricks/{id}",
    params(("id" = u64, Path, description = "Trick id")),
    responses(
        (status = 200, description = "The trick", body = TrickResponse),
        (status = 404, description = "Trick not found")
    )
)]
pub async fn get_trick_handler(
    State(repo): State<TrickRepo>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let trick = repo.get_trick(parse_id(&id)?).await?;
    Ok(Json(TrickResponse { success: true, trick }).into_response())
}

/// Create a trick. Missing fields take defaults; any `id` in the body is ignored.
#[utoipa::path(
    post,
    path = "/api/tricks",
    request_body = TrickInput,
    responses(
        (status = 201, description = "Trick created", body = TrickResponse),
        (status = 400, description = "Invalid JSON")
    )
)]
pub async fn create_trick_handler(
    State(repo): State<TrickRepo>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let draft: TrickDraft = parse_json_body(&body)?;
    let trick = repo.create_trick(draft).await?;
    Ok((StatusCode::CREATED, Json(TrickResponse { success: true, trick })).into_response())
}

#[utoipa::path(
    put,
    path = "/api/tricks/{id}",
    params(("id" = u64, Path, description = "Trick id")),
    request_body = TrickInput,
    responses(
        (status = 200, description = "Trick updated", body = TrickResponse),
        (status = 400, description = "Invalid JSON"),
        (status = 404, description = "Trick not found")
    )
)]
pub async fn update_trick_handler(
    State(repo): State<TrickRepo>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let patch: TrickPatch = parse_json_body(&body)?;
    let trick = repo.update_trick(id, patch).await?;
    Ok(Json(TrickResponse { success: true, trick }).into_response())
}

#[utoipa::path(
    delete,
    path = "/api/tricks/{id}",
    params(("id" = u64, Path, description = "Trick id")),
    responses(
        (status = 200, description = "Trick deleted", body = DeletedResponse),
        (status = 404, description = "Trick not found")
    )
)]
pub async fn delete_trick_handler(
    State(repo): State<TrickRepo>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let deleted = repo.delete_trick(parse_id(&id)?).await?;
    Ok(Json(DeletedResponse { success: true, deleted }).into_response())
}

/// Import `{"tricks": [...]}`. Entries whose id already exists are skipped.
#[utoipa::path(
    post,
    path = "/api/tricks/import",
    request_body = ImportRequest,
    responses(
        (status = 200, description = "Tricks imported", body = ImportResponse),
        (status = 400, description = "Missing or malformed `tricks` array")
    )
)]
pub async fn import_tricks_handler(
    State(repo): State<TrickRepo>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let mut payload: Value = parse_json_body(&body)?;
    let entries = match payload.get_mut("tricks").map(Value::take) {
        Some(Value::Array(entries)) => entries,
        _ => {
            return Err(ApiError::InvalidInput(
                "Expected tricks to be an array".to_string(),
            ))
        }
    };
    let drafts = entries
        .into_iter()
        .map(serde_json::from_value::<TrickDraft>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::MalformedRequest(format!("Invalid trick: {}", e)))?;

    let tricks = repo.import_tricks(drafts).await?;
    Ok(Json(ImportResponse {
        success: true,
        imported: tricks.len(),
        tricks,
    })
    .into_response())
}

/// Download every trick as a dated JSON attachment.
#[utoipa::path(
    get,
    path = "/api/tricks/export",
    responses((status = 200, description = "A JSON array of all tricks"))
)]
pub async fn export_tricks_handler(State(repo): State<TrickRepo>) -> Result<Response, ApiError> {
    let tricks = repo.export_tricks().await?;
    let json = serde_json::to_string_pretty(&tricks).map_err(|e| ApiError::Internal(e.to_string()))?;
    let disposition = format!(
        "attachment; filename=\"tricks-{}.json\"",
        Utc::now().format("%Y-%m-%d")
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        json,
    )
        .into_response())
}
