//! services/mirror/src/web/feedback.rs
//!
//! Feedback routes. Anyone may submit; only the owner may read or delete.

use crate::error::ApiError;
use crate::web::protocol::{
    json_ok, success, success_with_message, FeedbackDeleteRequest, FeedbackSubmission,
};
use crate::web::routes::{InterceptedRequest, Outcome, RouteContext};
use chrono::Utc;
use tracing::info;
use tricklist_core::domain::FeedbackEntry;

pub const FEEDBACK_THANKS: &str = "Feedback received! Thanks for helping us improve.";

pub fn submit(req: &InterceptedRequest, ctx: &RouteContext) -> Result<Outcome, ApiError> {
    let body: FeedbackSubmission = req.json()?;
    let user_email = ctx
        .session
        .current_identity()
        .map(|identity| identity.email)
        .unwrap_or_else(|| "anonymous".to_string());

    let entry = FeedbackEntry {
        kind: body.kind.unwrap_or_default(),
        message: body.message.unwrap_or_default(),
        user_email,
        timestamp: Utc::now(),
    };
    info!(kind = ?entry.kind, from = %entry.user_email, "Feedback submitted.");
    ctx.session.store.append_feedback(entry)?;

    Ok(Outcome::Respond(success_with_message(FEEDBACK_THANKS)))
}

/// The full list, oldest first, as a bare JSON array.
pub fn list(_req: &InterceptedRequest, ctx: &RouteContext) -> Result<Outcome, ApiError> {
    ctx.session.require_owner("Owner only")?;
    Ok(Outcome::Respond(json_ok(ctx.session.store.feedback())))
}

pub fn delete(req: &InterceptedRequest, ctx: &RouteContext) -> Result<Outcome, ApiError> {
    ctx.session.require_owner("Unauthorized - Owner only")?;
    let body: FeedbackDeleteRequest = req.json()?;

    let index = body
        .index
        .ok_or_else(|| ApiError::InvalidInput("Index required".to_string()))?;
    let removed = usize::try_from(index)
        .ok()
        .map(|i| ctx.session.store.remove_feedback(i))
        .transpose()?
        .flatten();

    match removed {
        Some(entry) => {
            info!(index, from = %entry.user_email, "Feedback deleted.");
            Ok(Outcome::Respond(success()))
        }
        None => Err(ApiError::InvalidInput("Invalid index".to_string())),
    }
}
