//! services/mirror/src/session/identity.rs
//!
//! The current signed-in identity: creation, lazy expiry, sign-out, and the
//! recently-used accounts list.

use super::store::AppStore;
use crate::error::ApiError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use tricklist_core::domain::{AuthProvider, Identity};
use tricklist_core::ports::{Clock, PortResult};

/// At most this many emails are remembered as recently used.
pub const RECENT_ACCOUNTS_MAX: usize = 5;

/// The recently-used list is wiped when it is older than this.
pub fn recent_accounts_window() -> Duration {
    Duration::days(30)
}

#[derive(Clone)]
pub struct SessionManager {
    store: AppStore,
    clock: Arc<dyn Clock>,
    lifetime: Duration,
}

impl SessionManager {
    pub fn new(store: AppStore, clock: Arc<dyn Clock>, lifetime: Duration) -> Self {
        Self {
            store,
            clock,
            lifetime,
        }
    }

    /// The signed-in identity, if any.
    ///
    /// An expired record is erased as a side effect and reported as absent.
    /// Reading twice before expiry returns the same identity and writes nothing.
    pub fn current(&self) -> Option<Identity> {
        let identity = self.store.identity()?;
        if identity.is_expired_at(self.clock.now()) {
            info!(email = %identity.email, "Session expired.");
            if let Err(e) = self.store.remove_identity() {
                warn!(error = %e, "Failed to erase expired session.");
            }
            return None;
        }
        Some(identity)
    }

    /// Makes `identity` current, stamping its expiry, and returns the stored record.
    pub fn set_current(&self, mut identity: Identity) -> PortResult<Identity> {
        // Stored at millisecond precision; stamp at the same precision so the
        // returned record equals what later reads produce.
        let expires_at = self.clock.now() + self.lifetime;
        identity.expires_at = DateTime::from_timestamp_millis(expires_at.timestamp_millis());
        self.store.save_identity(&identity)?;
        self.remember_account(&identity.email)?;
        info!(email = %identity.email, provider = ?identity.provider, "Signed in.");
        Ok(identity)
    }

    /// Signs out. Signing out twice is fine.
    pub fn clear(&self) -> PortResult<()> {
        self.store.remove_identity()
    }

    pub fn recent_accounts(&self) -> Vec<String> {
        self.store.recent_accounts()
    }

    fn remember_account(&self, email: &str) -> PortResult<()> {
        self.store.transaction(|| -> PortResult<()> {
            let now = self.clock.now().timestamp_millis();
            let cleared_at = self.store.recent_accounts_cleared_at().unwrap_or(0);

            let mut recent = if now - cleared_at > recent_accounts_window().num_milliseconds() {
                self.store.save_recent_accounts_cleared_at(now)?;
                self.store.remove_recent_accounts()?;
                Vec::new()
            } else {
                self.store.recent_accounts()
            };

            if !recent.iter().any(|e| e == email) {
                recent.push(email.to_string());
            }
            if recent.len() > RECENT_ACCOUNTS_MAX {
                let excess = recent.len() - RECENT_ACCOUNTS_MAX;
                recent.drain(..excess);
            }
            self.store.save_recent_accounts(&recent)
        })
    }
}

//=========================================================================================
// Google credential
//=========================================================================================

#[derive(Deserialize)]
struct GoogleClaims {
    sub: String,
    email: String,
    name: Option<String>,
    picture: Option<String>,
}

/// Builds an identity from a Google ID token. Only the payload is decoded;
/// the signature is not checked.
pub fn identity_from_google_credential(credential: &str) -> Result<Identity, ApiError> {
    let payload = credential
        .split('.')
        .nth(1)
        .ok_or_else(|| ApiError::MalformedRequest("Credential is not a JWT".to_string()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ApiError::MalformedRequest(format!("Credential payload: {}", e)))?;
    let claims: GoogleClaims = serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::MalformedRequest(format!("Credential claims: {}", e)))?;

    let name = claims
        .name
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| claims.email.split('@').next().unwrap_or_default().to_string());

    Ok(Identity {
        id: format!("google_{}", claims.sub),
        name,
        email: claims.email,
        provider: AuthProvider::Google,
        is_owner: false,
        picture: claims.picture,
        expires_at: None,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use chrono::Utc;
    use std::sync::Mutex;

    /// A clock that only moves when told to.
    pub(crate) struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        pub(crate) fn new() -> Self {
            let start = DateTime::from_timestamp_millis(Utc::now().timestamp_millis()).unwrap();
            Self(Mutex::new(start))
        }

        pub(crate) fn advance(&self, by: Duration) {
            *self.0.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn manager() -> (SessionManager, Arc<ManualClock>, AppStore) {
        let store = AppStore::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()));
        let clock = Arc::new(ManualClock::new());
        (
            SessionManager::new(store.clone(), clock.clone(), Duration::days(30)),
            clock,
            store,
        )
    }

    #[test]
    fn identity_is_current_until_expiry_instant() {
        let (sessions, clock, store) = manager();
        let stored = sessions
            .set_current(Identity::from_email("alice@example.com", false))
            .unwrap();

        assert_eq!(sessions.current(), Some(stored.clone()));
        assert_eq!(sessions.current(), Some(stored.clone()));

        clock.advance(Duration::days(30));
        assert_eq!(sessions.current(), Some(stored));

        clock.advance(Duration::milliseconds(1));
        assert_eq!(sessions.current(), None);
        assert!(store.identity().is_none(), "expired record is erased");
    }

    #[test]
    fn clear_is_idempotent() {
        let (sessions, _, _) = manager();
        sessions
            .set_current(Identity::from_email("a@b.co", false))
            .unwrap();
        sessions.clear().unwrap();
        sessions.clear().unwrap();
        assert!(sessions.current().is_none());
    }

    #[test]
    fn recent_accounts_keep_last_five_unique() {
        let (sessions, _, _) = manager();
        for email in ["1@x", "2@x", "1@x", "3@x", "4@x", "5@x", "6@x"] {
            sessions.set_current(Identity::from_email(email, false)).unwrap();
        }
        assert_eq!(sessions.recent_accounts(), vec!["2@x", "3@x", "4@x", "5@x", "6@x"]);
    }

    #[test]
    fn recent_accounts_reset_after_thirty_days() {
        let (sessions, clock, _) = manager();
        sessions.set_current(Identity::from_email("old@x", false)).unwrap();
        clock.advance(Duration::days(31));
        sessions.set_current(Identity::from_email("new@x", false)).unwrap();
        assert_eq!(sessions.recent_accounts(), vec!["new@x"]);
    }

    #[test]
    fn google_credential_payload_is_decoded() {
        let claims = r#"{"sub":"123","email":"g@example.com","name":"Gee","picture":"http://p"}"#;
        let token = format!("h.{}.s", URL_SAFE_NO_PAD.encode(claims));
        let identity = identity_from_google_credential(&token).unwrap();
        assert_eq!(identity.id, "google_123");
        assert_eq!(identity.name, "Gee");
        assert_eq!(identity.provider, AuthProvider::Google);
        assert_eq!(identity.picture.as_deref(), Some("http://p"));
    }

    #[test]
    fn google_name_falls_back_to_email_local_part() {
        let token = format!("h.{}.s", URL_SAFE_NO_PAD.encode(r#"{"sub":"9","email":"kim@x.io"}"#));
        assert_eq!(identity_from_google_credential(&token).unwrap().name, "kim");
        assert!(identity_from_google_credential("garbage").is_err());
    }
}
