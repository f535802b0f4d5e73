//! services/mirror/src/session/mod.rs
//!
//! The explicit session context: everything a browser context would have kept
//! in its storage scopes, bundled so route handlers receive it as an argument
//! instead of reaching for globals.

pub mod accounts;
pub mod identity;
pub mod store;

pub use accounts::AccountRegistry;
pub use identity::{identity_from_google_credential, SessionManager};
pub use store::AppStore;

use crate::config::Config;
use crate::error::ApiError;
use std::sync::Arc;
use tricklist_core::domain::Identity;
use tricklist_core::ports::{Clock, KeyValueStore};

#[derive(Clone)]
pub struct SessionContext {
    pub store: AppStore,
    pub accounts: AccountRegistry,
    pub sessions: SessionManager,
}

impl SessionContext {
    /// Wires the context over a durable and a session-scoped store and
    /// provisions the owner account.
    pub fn init(
        durable: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Result<Self, ApiError> {
        let store = AppStore::new(durable, session);
        let accounts = AccountRegistry::new(store.clone(), &config.owner_email, &config.owner_password);
        let sessions = SessionManager::new(store.clone(), clock, config.session_lifetime);
        accounts.init_owner_account()?;

        Ok(Self {
            store,
            accounts,
            sessions,
        })
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.sessions.current()
    }

    /// The signed-in identity, or `Unauthorized`.
    pub fn require_identity(&self) -> Result<Identity, ApiError> {
        self.current_identity().ok_or(ApiError::Unauthorized)
    }

    /// The signed-in owner, or `Forbidden` with the given message.
    pub fn require_owner(&self, message: &str) -> Result<Identity, ApiError> {
        match self.current_identity() {
            Some(identity) if self.accounts.is_owner(&identity) => Ok(identity),
            _ => Err(ApiError::Forbidden(message.to_string())),
        }
    }

    /// Signs in `identity`, deriving the owner flag from the canonical predicate.
    pub fn sign_in(&self, mut identity: Identity) -> Result<Identity, ApiError> {
        identity.is_owner = self.accounts.is_owner(&identity);
        Ok(self.sessions.set_current(identity)?)
    }

    /// Teardown for a browsing session: the session scope is dropped, the
    /// durable scope (including the signed-in identity) is kept.
    pub fn end_browsing_session(&self) -> Result<(), ApiError> {
        Ok(self.store.end_browsing_session()?)
    }
}
