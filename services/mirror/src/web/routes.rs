//! services/mirror/src/web/routes.rs
//!
//! The ordered dispatch table of fabricated routes.
//!
//! Each route is a pair of a predicate over (method, path) and a handler that
//! turns the buffered request plus the session context into an outcome. Routes
//! are evaluated top to bottom and the first match wins, so a route listed
//! earlier shadows any later route it overlaps with.

use crate::error::ApiError;
use crate::session::SessionContext;
use crate::web::protocol::parse_json_body;
use crate::web::{auth, coach, feedback, me, random};
use axum::{body::Bytes, http::Method, response::Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::warn;

pub const OWNER_GATE_MESSAGE: &str = "Owner only - authentication required";

/// A request as seen by a route handler: the body is already buffered.
#[derive(Debug, Clone)]
pub struct InterceptedRequest {
    pub method: Method,
    pub path: String,
    pub body: Bytes,
}

impl InterceptedRequest {
    pub fn new(method: Method, path: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            method,
            path: path.into(),
            body: body.into(),
        }
    }

    /// The body parsed as JSON; an empty body reads as `{}`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        parse_json_body(&self.body)
    }

    /// The final non-empty path segment, e.g. `42` in `/api/me/learned-tricks/42`.
    pub fn last_segment(&self) -> &str {
        self.path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }
}

/// What the interceptor should do with a request.
pub enum Outcome {
    /// Answer locally with this response.
    Respond(Response),
    /// Hand the original request to the wrapped transport.
    Forward,
}

impl std::fmt::Debug for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Respond(r) => f.debug_tuple("Respond").field(&r.status()).finish(),
            Self::Forward => f.write_str("Forward"),
        }
    }
}

/// Everything a handler may touch besides the request itself.
#[derive(Clone)]
pub struct RouteContext {
    pub session: SessionContext,
    pub stream_delay: Duration,
}

pub type Handler = fn(&InterceptedRequest, &RouteContext) -> Result<Outcome, ApiError>;

pub struct Route {
    pub name: &'static str,
    pub matches: fn(&Method, &str) -> bool,
    pub handler: Handler,
}

impl Route {
    const fn new(
        name: &'static str,
        matches: fn(&Method, &str) -> bool,
        handler: Handler,
    ) -> Self {
        Self {
            name,
            matches,
            handler,
        }
    }
}

/// The fabricated routes in priority order.
pub fn route_table() -> Vec<Route> {
    vec![
        Route::new("auth-user", |_, p| p.contains("/auth/user"), auth::current_user),
        Route::new("logout", |_, p| p.contains("/logout"), auth::logout),
        Route::new("is-owner", |_, p| p.contains("/auth/is-owner"), auth::is_owner),
        Route::new(
            "signup",
            |m, p| m == Method::POST && p.contains("/auth/signup"),
            auth::signup,
        ),
        Route::new(
            "login",
            |m, p| m == Method::POST && p.contains("/auth/login"),
            auth::login,
        ),
        Route::new(
            "google",
            |m, p| m == Method::POST && p.contains("/auth/google"),
            auth::google,
        ),
        Route::new(
            "recent-accounts",
            |m, p| m == Method::GET && p.contains("/auth/recent-accounts"),
            auth::recent_accounts,
        ),
        Route::new(
            "trick-ai",
            |m, p| m == Method::POST && p.contains("/trick-ai"),
            coach::trick_ai,
        ),
        Route::new(
            "feedback-submit",
            |m, p| m == Method::POST && p.contains("/feedback"),
            feedback::submit,
        ),
        Route::new(
            "feedback-list",
            |m, p| m == Method::GET && p.contains("/feedback"),
            feedback::list,
        ),
        Route::new(
            "feedback-delete",
            |m, p| m == Method::DELETE && p.contains("/feedback"),
            feedback::delete,
        ),
        Route::new(
            "ai-settings",
            |m, p| m == Method::PATCH && p.contains("/ai-settings"),
            me::save_ai_settings,
        ),
        Route::new(
            "learned-list",
            |m, p| m == Method::GET && p.contains("/me/learned-tricks"),
            me::learned_tricks,
        ),
        Route::new(
            "learned-add",
            |m, p| m == Method::POST && p.contains("/me/learned-tricks"),
            me::add_learned_trick,
        ),
        Route::new(
            "learned-remove",
            |m, p| m == Method::DELETE && p.contains("/me/learned-tricks"),
            me::remove_learned_trick,
        ),
        Route::new(
            "score",
            |m, p| m == Method::GET && p.contains("/me/score"),
            me::total_score,
        ),
        Route::new(
            "random-track",
            |m, p| m == Method::POST && p.contains("/random/track"),
            random::track,
        ),
        Route::new(
            "random-history",
            |m, p| m == Method::GET && p.contains("/random/history"),
            random::history,
        ),
        Route::new(
            "random-clear",
            |m, p| m == Method::DELETE && p.contains("/random/history"),
            random::clear,
        ),
        Route::new("trick-owner-gate", is_trick_mutation, owner_gate),
    ]
}

/// Writes to the trick collection, including import and export with any
/// method other than GET.
fn is_trick_mutation(method: &Method, path: &str) -> bool {
    if !path.contains("/tricks") {
        return false;
    }
    let transfer = path.contains("/tricks/import") || path.contains("/tricks/export");
    let write = method == Method::POST || method == Method::PUT || method == Method::DELETE;
    write || (transfer && method != Method::GET)
}

/// Lets the owner through to the real backend; everyone else gets a 401.
fn owner_gate(req: &InterceptedRequest, ctx: &RouteContext) -> Result<Outcome, ApiError> {
    ctx.session
        .require_owner(OWNER_GATE_MESSAGE)
        .inspect_err(|_| warn!(method = %req.method, path = %req.path, "Trick mutation rejected by owner gate."))?;
    Ok(Outcome::Forward)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_match(method: Method, path: &str) -> Option<&'static str> {
        route_table()
            .into_iter()
            .find(|r| (r.matches)(&method, path))
            .map(|r| r.name)
    }

    #[test]
    fn last_segment_ignores_trailing_slash() {
        let req = InterceptedRequest::new(Method::POST, "/api/me/learned-tricks/42/", "");
        assert_eq!(req.last_segment(), "42");
    }

    #[test]
    fn dispatch_order_is_first_match() {
        assert_eq!(first_match(Method::GET, "/api/auth/user"), Some("auth-user"));
        assert_eq!(first_match(Method::POST, "/api/logout"), Some("logout"));
        assert_eq!(first_match(Method::POST, "/api/trick-ai"), Some("trick-ai"));
        assert_eq!(first_match(Method::GET, "/api/trick-ai"), None);
        assert_eq!(first_match(Method::GET, "/api/me/learned-tricks"), Some("learned-list"));
        assert_eq!(first_match(Method::POST, "/api/me/learned-tricks/7"), Some("learned-add"));
        assert_eq!(first_match(Method::PUT, "/api/random/history"), None);
    }

    #[test]
    fn trick_reads_pass_and_writes_hit_the_gate() {
        assert_eq!(first_match(Method::GET, "/api/tricks"), None);
        assert_eq!(first_match(Method::GET, "/api/tricks/export"), None);
        assert_eq!(first_match(Method::POST, "/api/tricks"), Some("trick-owner-gate"));
        assert_eq!(first_match(Method::PUT, "/api/tricks/3"), Some("trick-owner-gate"));
        assert_eq!(first_match(Method::DELETE, "/api/tricks/3"), Some("trick-owner-gate"));
        assert_eq!(first_match(Method::PATCH, "/api/tricks/import"), Some("trick-owner-gate"));
        assert_eq!(first_match(Method::PATCH, "/api/tricks/3"), None);
    }
}
