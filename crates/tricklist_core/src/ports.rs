//! crates/tricklist_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of where state actually lives (memory, a JSON file, a browser).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::domain::{Trick, TrickDraft, TrickPatch};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Storage failure: {0}")]
    Storage(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// One storage scope (durable or session-scoped) holding string values by key.
///
/// Calls are synchronous and each one is atomic on its own; there are no
/// cross-call transactions.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: String) -> PortResult<()>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> PortResult<()>;

    /// Drops every key in the scope.
    fn clear(&self) -> PortResult<()>;
}

/// Source of "now", swappable so expiry can be tested.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[async_trait]
pub trait TrickRepository: Send + Sync {
    /// All tricks, in display order.
    async fn list_tricks(&self) -> PortResult<Vec<Trick>>;

    async fn get_trick(&self, id: u64) -> PortResult<Trick>;

    async fn create_trick(&self, draft: TrickDraft) -> PortResult<Trick>;

    async fn update_trick(&self, id: u64, patch: TrickPatch) -> PortResult<Trick>;

    /// Returns the removed trick.
    async fn delete_trick(&self, id: u64) -> PortResult<Trick>;

    /// Adds every draft whose id is not already taken; returns the ones added.
    async fn import_tricks(&self, drafts: Vec<TrickDraft>) -> PortResult<Vec<Trick>>;

    /// All tricks in stored order.
    async fn export_tricks(&self) -> PortResult<Vec<Trick>>;
}
