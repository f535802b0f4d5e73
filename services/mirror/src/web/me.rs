//! services/mirror/src/web/me.rs
//!
//! Per-user routes: learned tricks, total score and AI settings. All of them
//! require a signed-in identity.

use crate::error::ApiError;
use crate::web::protocol::{json_ok, success, LearnedTricksResponse, TotalScoreResponse};
use crate::web::routes::{InterceptedRequest, Outcome, RouteContext};
use serde_json::Value;
use tracing::debug;

/// A trick id from the last path segment. Zero and non-numbers are rejected.
fn trick_id_from_path(req: &InterceptedRequest) -> Result<u64, ApiError> {
    req.last_segment()
        .parse::<u64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::MalformedRequest("Bad Request - Invalid ID".to_string()))
}

pub fn learned_tricks(_req: &InterceptedRequest, ctx: &RouteContext) -> Result<Outcome, ApiError> {
    ctx.session.require_identity()?;
    let learned_ids = ctx.session.store.learned();
    Ok(Outcome::Respond(json_ok(LearnedTricksResponse { learned_ids })))
}

/// Adding an id that is already learned is a no-op that still succeeds.
pub fn add_learned_trick(req: &InterceptedRequest, ctx: &RouteContext) -> Result<Outcome, ApiError> {
    let identity = ctx.session.require_identity()?;
    let id = trick_id_from_path(req)?;
    let added = ctx.session.store.add_learned(id)?;
    debug!(email = %identity.email, trick_id = id, added, "Learned trick.");
    Ok(Outcome::Respond(success()))
}

pub fn remove_learned_trick(req: &InterceptedRequest, ctx: &RouteContext) -> Result<Outcome, ApiError> {
    let identity = ctx.session.require_identity()?;
    let id = trick_id_from_path(req)?;
    let removed = ctx.session.store.remove_learned(id)?;
    debug!(email = %identity.email, trick_id = id, removed, "Unlearned trick.");
    Ok(Outcome::Respond(success()))
}

pub fn total_score(_req: &InterceptedRequest, ctx: &RouteContext) -> Result<Outcome, ApiError> {
    ctx.session.require_identity()?;
    let total_score = ctx.session.store.total_score();
    Ok(Outcome::Respond(json_ok(TotalScoreResponse { total_score })))
}

/// Stores the body verbatim; any JSON value is accepted.
pub fn save_ai_settings(req: &InterceptedRequest, ctx: &RouteContext) -> Result<Outcome, ApiError> {
    ctx.session.require_identity()?;
    let settings: Value = req.json()?;
    ctx.session.store.save_ai_settings(&settings)?;
    Ok(Outcome::Respond(success()))
}
