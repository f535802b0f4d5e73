//! services/mirror/src/session/accounts.rs
//!
//! The email/password account registry and the single owner predicate.
//!
//! Passwords are stored in plaintext: this registry only exists to simulate a
//! backend locally and never guards anything real.

use super::store::AppStore;
use crate::error::ApiError;
use tracing::info;
use tricklist_core::domain::Identity;

#[derive(Clone)]
pub struct AccountRegistry {
    store: AppStore,
    owner_email: String,
    owner_password: String,
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

impl AccountRegistry {
    pub fn new(store: AppStore, owner_email: &str, owner_password: &str) -> Self {
        Self {
            store,
            owner_email: normalize(owner_email),
            owner_password: owner_password.to_string(),
        }
    }

    /// Ensures the owner account exists. Never overwrites an existing password.
    pub fn init_owner_account(&self) -> Result<(), ApiError> {
        self.store.transaction(|| -> Result<(), ApiError> {
            let mut accounts = self.store.accounts();
            if !accounts.contains_key(&self.owner_email) {
                accounts.insert(self.owner_email.clone(), self.owner_password.clone());
                self.store.save_accounts(&accounts)?;
                info!(owner = %self.owner_email, "Provisioned owner account.");
            }
            Ok(())
        })
    }

    pub fn create_account(&self, email: &str, password: &str) -> Result<(), ApiError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ApiError::InvalidInput("Email and password required".to_string()));
        }

        let key = normalize(email);
        self.store.transaction(|| -> Result<(), ApiError> {
            let mut accounts = self.store.accounts();
            if accounts.contains_key(&key) {
                return Err(ApiError::DuplicateAccount);
            }
            accounts.insert(key, password.to_string());
            self.store.save_accounts(&accounts)?;
            Ok(())
        })
    }

    /// Succeeds only on an exact password match for the normalized email.
    pub fn validate_login(&self, email: &str, password: &str) -> Result<(), ApiError> {
        match self.store.accounts().get(&normalize(email)) {
            Some(stored) if stored == password => Ok(()),
            _ => Err(ApiError::InvalidCredentials),
        }
    }

    pub fn is_owner_email(&self, email: &str) -> bool {
        normalize(email) == self.owner_email
    }

    /// The one owner check: the reserved email (any case) or an explicit flag.
    pub fn is_owner(&self, identity: &Identity) -> bool {
        identity.is_owner || self.is_owner_email(&identity.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use std::sync::Arc;

    fn registry() -> AccountRegistry {
        let store = AppStore::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()));
        AccountRegistry::new(store, "Owner@Example.com", "change-me")
    }

    #[test]
    fn duplicate_signup_is_rejected_regardless_of_case() {
        let registry = registry();
        registry.create_account("alice@example.com", "pw1").unwrap();
        let err = registry.create_account("ALICE@Example.COM", "pw2").unwrap_err();
        assert!(matches!(err, ApiError::DuplicateAccount));
    }

    #[test]
    fn empty_fields_are_invalid_input() {
        let registry = registry();
        assert!(matches!(
            registry.create_account("", "pw"),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            registry.create_account("a@b.co", ""),
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[test]
    fn login_requires_exact_password() {
        let registry = registry();
        registry.create_account("Bob@Example.com", "Secret").unwrap();

        assert!(registry.validate_login("bob@example.com", "Secret").is_ok());
        assert!(matches!(
            registry.validate_login("bob@example.com", "secret"),
            Err(ApiError::InvalidCredentials)
        ));
        assert!(matches!(
            registry.validate_login("nobody@example.com", "Secret"),
            Err(ApiError::InvalidCredentials)
        ));
    }

    #[test]
    fn owner_account_is_provisioned_once() {
        let registry = registry();
        registry.init_owner_account().unwrap();
        assert!(registry.validate_login("owner@example.com", "change-me").is_ok());

        let mut accounts = registry.store.accounts();
        accounts.insert("owner@example.com".into(), "rotated".into());
        registry.store.save_accounts(&accounts).unwrap();
        registry.init_owner_account().unwrap();
        assert!(registry.validate_login("owner@example.com", "rotated").is_ok());
    }

    #[test]
    fn concurrent_signups_are_all_registered() {
        let registry = registry();
        let workers: Vec<_> = (0..32)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    registry
                        .create_account(&format!("user{}@example.com", i), "pw")
                        .unwrap();
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(registry.store.accounts().len(), 32);
    }

    #[test]
    fn owner_predicate_honours_email_and_flag() {
        let registry = registry();
        assert!(registry.is_owner(&Identity::from_email("OWNER@example.com", false)));
        assert!(registry.is_owner(&Identity::from_email("someone@else.com", true)));
        assert!(!registry.is_owner(&Identity::from_email("someone@else.com", false)));
    }
}
