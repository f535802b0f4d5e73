//! services/mirror/src/web/auth.rs
//!
//! Fabricated authentication routes: identity lookup, sign-up, login, Google
//! sign-in, logout and the recently-used accounts list.

use crate::error::ApiError;
use crate::session::identity_from_google_credential;
use crate::web::protocol::{
    json_ok, success, CredentialsRequest, GoogleSignInRequest, IsOwnerResponse,
    RecentAccountsResponse,
};
use crate::web::routes::{InterceptedRequest, Outcome, RouteContext};
use tracing::{info, warn};
use tricklist_core::domain::Identity;

//=========================================================================================
// Identity
//=========================================================================================

/// `/auth/user`: the signed-in identity, or 401.
pub fn current_user(_req: &InterceptedRequest, ctx: &RouteContext) -> Result<Outcome, ApiError> {
    let identity = ctx.session.require_identity()?;
    Ok(Outcome::Respond(json_ok(identity)))
}

/// `/auth/is-owner`: never fails, a signed-out caller is simply not the owner.
pub fn is_owner(_req: &InterceptedRequest, ctx: &RouteContext) -> Result<Outcome, ApiError> {
    let is_owner = ctx
        .session
        .current_identity()
        .map(|identity| ctx.session.accounts.is_owner(&identity))
        .unwrap_or(false);
    Ok(Outcome::Respond(json_ok(IsOwnerResponse { is_owner })))
}

/// `/logout`: signing out while signed out still succeeds.
pub fn logout(_req: &InterceptedRequest, ctx: &RouteContext) -> Result<Outcome, ApiError> {
    if let Some(identity) = ctx.session.current_identity() {
        info!(email = %identity.email, "Signed out.");
    }
    ctx.session.sessions.clear()?;
    Ok(Outcome::Respond(success()))
}

//=========================================================================================
// Sign-in flows
//=========================================================================================

pub fn signup(req: &InterceptedRequest, ctx: &RouteContext) -> Result<Outcome, ApiError> {
    let creds: CredentialsRequest = req.json()?;
    ctx.session.accounts.create_account(&creds.email, &creds.password)?;
    info!(email = %creds.email.trim(), "Account created.");

    let identity = ctx
        .session
        .sign_in(Identity::from_email(creds.email.trim(), false))?;
    Ok(Outcome::Respond(json_ok(identity)))
}

pub fn login(req: &InterceptedRequest, ctx: &RouteContext) -> Result<Outcome, ApiError> {
    let creds: CredentialsRequest = req.json()?;
    ctx.session
        .accounts
        .validate_login(&creds.email, &creds.password)
        .inspect_err(|_| warn!(email = %creds.email.trim(), "Login rejected."))?;

    let identity = ctx
        .session
        .sign_in(Identity::from_email(creds.email.trim(), false))?;
    Ok(Outcome::Respond(json_ok(identity)))
}

/// `/auth/google`: trusts the credential's payload as-is.
pub fn google(req: &InterceptedRequest, ctx: &RouteContext) -> Result<Outcome, ApiError> {
    let body: GoogleSignInRequest = req.json()?;
    let identity = identity_from_google_credential(&body.credential)?;
    let identity = ctx.session.sign_in(identity)?;
    Ok(Outcome::Respond(json_ok(identity)))
}

pub fn recent_accounts(_req: &InterceptedRequest, ctx: &RouteContext) -> Result<Outcome, ApiError> {
    let accounts = ctx.session.sessions.recent_accounts();
    Ok(Outcome::Respond(json_ok(RecentAccountsResponse { accounts })))
}
