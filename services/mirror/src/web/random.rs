//! services/mirror/src/web/random.rs
//!
//! Session-scoped random trick history. No sign-in required.

use crate::error::ApiError;
use crate::web::protocol::{json_ok, success, RandomHistoryResponse, TrackRequest};
use crate::web::routes::{InterceptedRequest, Outcome, RouteContext};

/// Accepts `trickId`, `trickIds`, or both.
pub fn track(req: &InterceptedRequest, ctx: &RouteContext) -> Result<Outcome, ApiError> {
    let body: TrackRequest = req.json()?;
    let ids = body.trick_id.into_iter().chain(body.trick_ids.unwrap_or_default());
    for id in ids {
        ctx.session.store.track_random(id)?;
    }
    Ok(Outcome::Respond(success()))
}

pub fn history(_req: &InterceptedRequest, ctx: &RouteContext) -> Result<Outcome, ApiError> {
    let history = ctx.session.store.random_history();
    Ok(Outcome::Respond(json_ok(RandomHistoryResponse { history })))
}

pub fn clear(_req: &InterceptedRequest, ctx: &RouteContext) -> Result<Outcome, ApiError> {
    ctx.session.store.clear_random_history()?;
    Ok(Outcome::Respond(success()))
}
