//! services/mirror/src/session/store.rs
//!
//! Typed accessors over the two storage scopes.
//!
//! Every value is stored as JSON under a fixed key. Reads never fail: a
//! missing or corrupt value is treated as absent/empty, and corruption is
//! only logged.
//!
//! Read-modify-write operations run under one mutation lock shared by every
//! clone of the store, so concurrent requests cannot drop each other's writes.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;
use tricklist_core::domain::{FeedbackEntry, Identity};
use tricklist_core::ports::{KeyValueStore, PortError, PortResult};

pub const USER_KEY: &str = "tricklist_user";
pub const LEARNED_KEY: &str = "tricklist_learned";
pub const SCORES_KEY: &str = "tricklist_scores";
pub const ACCOUNTS_KEY: &str = "tricklist_accounts";
pub const RECENT_ACCOUNTS_KEY: &str = "tricklist_recent_accounts";
pub const RECENT_ACCOUNTS_CLEARED_KEY: &str = "tricklist_recent_accounts_last_clear";
pub const FEEDBACK_KEY: &str = "tricklist_feedback";
pub const AI_SETTINGS_KEY: &str = "tricklist_ai_settings";
/// Session-scoped.
pub const RANDOM_HISTORY_KEY: &str = "tricklist_random_history";

/// Most recent feedback entries kept.
pub const FEEDBACK_CAP: usize = 100;

/// Email → plaintext password, keyed by the lower-cased email.
pub type AccountMap = BTreeMap<String, String>;

/// Trick id → score.
pub type ScoreMap = BTreeMap<u64, i64>;

#[derive(Clone)]
pub struct AppStore {
    durable: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
    mutations: Arc<Mutex<()>>,
}

impl AppStore {
    pub fn new(durable: Arc<dyn KeyValueStore>, session: Arc<dyn KeyValueStore>) -> Self {
        Self {
            durable,
            session,
            mutations: Arc::new(Mutex::new(())),
        }
    }

    /// Runs `f` while holding the mutation lock. `f` must not call another
    /// locking method of this store.
    pub fn transaction<R>(&self, f: impl FnOnce() -> R) -> R {
        // The guarded data is `()`, so a poisoned lock has nothing to repair.
        let _guard = self.mutations.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    //-------------------------------------------------------------------------------------
    // Identity
    //-------------------------------------------------------------------------------------

    /// The stored identity, without any expiry check.
    pub fn identity(&self) -> Option<Identity> {
        read_json(self.durable.as_ref(), USER_KEY)
    }

    pub fn save_identity(&self, identity: &Identity) -> PortResult<()> {
        write_json(self.durable.as_ref(), USER_KEY, identity)
    }

    pub fn remove_identity(&self) -> PortResult<()> {
        self.durable.remove(USER_KEY)
    }

    //-------------------------------------------------------------------------------------
    // Learned tricks and scores
    //-------------------------------------------------------------------------------------

    /// Learned trick ids in the order they were added.
    pub fn learned(&self) -> Vec<u64> {
        read_json(self.durable.as_ref(), LEARNED_KEY).unwrap_or_default()
    }

    /// Returns `false` when the id was already present.
    pub fn add_learned(&self, id: u64) -> PortResult<bool> {
        self.transaction(|| -> PortResult<bool> {
            let mut learned = self.learned();
            if learned.contains(&id) {
                return Ok(false);
            }
            learned.push(id);
            write_json(self.durable.as_ref(), LEARNED_KEY, &learned)?;
            Ok(true)
        })
    }

    /// Returns `false` when the id was not present.
    pub fn remove_learned(&self, id: u64) -> PortResult<bool> {
        self.transaction(|| -> PortResult<bool> {
            let mut learned = self.learned();
            let before = learned.len();
            learned.retain(|x| *x != id);
            write_json(self.durable.as_ref(), LEARNED_KEY, &learned)?;
            Ok(learned.len() != before)
        })
    }

    pub fn scores(&self) -> ScoreMap {
        read_json(self.durable.as_ref(), SCORES_KEY).unwrap_or_default()
    }

    pub fn save_scores(&self, scores: &ScoreMap) -> PortResult<()> {
        write_json(self.durable.as_ref(), SCORES_KEY, scores)
    }

    /// Sum of the scores of learned tricks; unscored tricks count as zero.
    pub fn total_score(&self) -> i64 {
        let scores = self.scores();
        self.learned()
            .iter()
            .map(|id| scores.get(id).copied().unwrap_or(0))
            .sum()
    }

    //-------------------------------------------------------------------------------------
    // Accounts
    //-------------------------------------------------------------------------------------

    pub fn accounts(&self) -> AccountMap {
        read_json(self.durable.as_ref(), ACCOUNTS_KEY).unwrap_or_default()
    }

    pub fn save_accounts(&self, accounts: &AccountMap) -> PortResult<()> {
        write_json(self.durable.as_ref(), ACCOUNTS_KEY, accounts)
    }

    pub fn recent_accounts(&self) -> Vec<String> {
        read_json(self.durable.as_ref(), RECENT_ACCOUNTS_KEY).unwrap_or_default()
    }

    pub fn save_recent_accounts(&self, emails: &[String]) -> PortResult<()> {
        write_json(self.durable.as_ref(), RECENT_ACCOUNTS_KEY, &emails)
    }

    pub fn remove_recent_accounts(&self) -> PortResult<()> {
        self.durable.remove(RECENT_ACCOUNTS_KEY)
    }

    /// Epoch milliseconds of the last reset of the recent-accounts list.
    pub fn recent_accounts_cleared_at(&self) -> Option<i64> {
        self.durable
            .get(RECENT_ACCOUNTS_CLEARED_KEY)
            .and_then(|raw| raw.trim().parse().ok())
    }

    pub fn save_recent_accounts_cleared_at(&self, millis: i64) -> PortResult<()> {
        self.durable.set(RECENT_ACCOUNTS_CLEARED_KEY, millis.to_string())
    }

    //-------------------------------------------------------------------------------------
    // Feedback
    //-------------------------------------------------------------------------------------

    pub fn feedback(&self) -> Vec<FeedbackEntry> {
        read_json(self.durable.as_ref(), FEEDBACK_KEY).unwrap_or_default()
    }

    /// Appends an entry, dropping the oldest so at most `FEEDBACK_CAP` remain.
    pub fn append_feedback(&self, entry: FeedbackEntry) -> PortResult<()> {
        self.transaction(|| -> PortResult<()> {
            let mut entries = self.feedback();
            entries.push(entry);
            if entries.len() > FEEDBACK_CAP {
                let excess = entries.len() - FEEDBACK_CAP;
                entries.drain(..excess);
            }
            write_json(self.durable.as_ref(), FEEDBACK_KEY, &entries)
        })
    }

    /// Removes the entry at `index`; `None` when the index is out of range.
    pub fn remove_feedback(&self, index: usize) -> PortResult<Option<FeedbackEntry>> {
        self.transaction(|| -> PortResult<Option<FeedbackEntry>> {
            let mut entries = self.feedback();
            if index >= entries.len() {
                return Ok(None);
            }
            let removed = entries.remove(index);
            write_json(self.durable.as_ref(), FEEDBACK_KEY, &entries)?;
            Ok(Some(removed))
        })
    }

    //-------------------------------------------------------------------------------------
    // AI settings
    //-------------------------------------------------------------------------------------

    pub fn ai_settings(&self) -> Option<Value> {
        read_json(self.durable.as_ref(), AI_SETTINGS_KEY)
    }

    pub fn save_ai_settings(&self, settings: &Value) -> PortResult<()> {
        write_json(self.durable.as_ref(), AI_SETTINGS_KEY, settings)
    }

    //-------------------------------------------------------------------------------------
    // Random history (session scope)
    //-------------------------------------------------------------------------------------

    pub fn random_history(&self) -> Vec<u64> {
        read_json(self.session.as_ref(), RANDOM_HISTORY_KEY).unwrap_or_default()
    }

    /// Returns `false` when the id was already tracked.
    pub fn track_random(&self, id: u64) -> PortResult<bool> {
        self.transaction(|| -> PortResult<bool> {
            let mut history = self.random_history();
            if history.contains(&id) {
                return Ok(false);
            }
            history.push(id);
            write_json(self.session.as_ref(), RANDOM_HISTORY_KEY, &history)?;
            Ok(true)
        })
    }

    pub fn clear_random_history(&self) -> PortResult<()> {
        self.session.remove(RANDOM_HISTORY_KEY)
    }

    /// Ends the browsing session: everything session-scoped is dropped.
    pub fn end_browsing_session(&self) -> PortResult<()> {
        self.session.clear()
    }
}

fn read_json<T: DeserializeOwned>(scope: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = scope.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, error = %e, "Ignoring corrupt stored value.");
            None
        }
    }
}

fn write_json<T: Serialize + ?Sized>(scope: &dyn KeyValueStore, key: &str, value: &T) -> PortResult<()> {
    let json = serde_json::to_string(value).map_err(|e| PortError::Storage(e.to_string()))?;
    scope.set(key, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use chrono::Utc;
    use tricklist_core::domain::FeedbackKind;

    fn store() -> (AppStore, Arc<MemoryStore>, Arc<MemoryStore>) {
        let durable = Arc::new(MemoryStore::new());
        let session = Arc::new(MemoryStore::new());
        (AppStore::new(durable.clone(), session.clone()), durable, session)
    }

    fn entry(message: &str) -> FeedbackEntry {
        FeedbackEntry {
            kind: FeedbackKind::Suggestion,
            message: message.to_string(),
            user_email: "anonymous".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn learned_add_is_idempotent() {
        let (store, _, _) = store();
        assert!(store.add_learned(42).unwrap());
        assert!(!store.add_learned(42).unwrap());
        assert_eq!(store.learned(), vec![42]);
        assert!(store.remove_learned(42).unwrap());
        assert!(store.learned().is_empty());
    }

    #[test]
    fn corrupt_values_read_as_empty() {
        let (store, durable, session) = store();
        durable.set(LEARNED_KEY, "not json".into()).unwrap();
        durable.set(USER_KEY, "{\"id\":".into()).unwrap();
        durable.set(ACCOUNTS_KEY, "[1,2]".into()).unwrap();
        session.set(RANDOM_HISTORY_KEY, "{}".into()).unwrap();

        assert!(store.learned().is_empty());
        assert!(store.identity().is_none());
        assert!(store.accounts().is_empty());
        assert!(store.random_history().is_empty());
    }

    #[test]
    fn feedback_is_capped_at_the_most_recent_hundred() {
        let (store, _, _) = store();
        for i in 0..FEEDBACK_CAP {
            store.append_feedback(entry(&format!("m{}", i))).unwrap();
        }
        assert_eq!(store.feedback().len(), FEEDBACK_CAP);

        store.append_feedback(entry("newest")).unwrap();
        let entries = store.feedback();
        assert_eq!(entries.len(), FEEDBACK_CAP);
        assert_eq!(entries[0].message, "m1");
        assert_eq!(entries[FEEDBACK_CAP - 1].message, "newest");
    }

    #[test]
    fn remove_feedback_out_of_range_is_none() {
        let (store, _, _) = store();
        store.append_feedback(entry("only")).unwrap();
        assert!(store.remove_feedback(1).unwrap().is_none());
        assert_eq!(store.remove_feedback(0).unwrap().unwrap().message, "only");
        assert!(store.feedback().is_empty());
    }

    #[test]
    fn random_history_dedupes_and_clears() {
        let (store, durable, _) = store();
        store.track_random(3).unwrap();
        store.track_random(3).unwrap();
        store.track_random(5).unwrap();
        assert_eq!(store.random_history(), vec![3, 5]);
        assert!(durable.get(RANDOM_HISTORY_KEY).is_none());

        store.clear_random_history().unwrap();
        assert!(store.random_history().is_empty());
    }

    #[test]
    fn ending_the_browsing_session_only_drops_session_scope() {
        let (store, _, _) = store();
        store.track_random(1).unwrap();
        store.add_learned(1).unwrap();
        store.end_browsing_session().unwrap();
        assert!(store.random_history().is_empty());
        assert_eq!(store.learned(), vec![1]);
    }

    #[test]
    fn total_score_sums_learned_tricks_only() {
        let (store, _, _) = store();
        let scores: ScoreMap = [(1, 10), (2, 25), (3, 100)].into_iter().collect();
        store.save_scores(&scores).unwrap();
        store.add_learned(1).unwrap();
        store.add_learned(2).unwrap();
        store.add_learned(9).unwrap();
        assert_eq!(store.total_score(), 35);
    }

    #[test]
    fn concurrent_adds_are_all_kept() {
        let (store, _, _) = store();
        let workers: Vec<_> = (1..=64u64)
            .map(|id| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store.add_learned(id).unwrap();
                    store.track_random(id).unwrap();
                    store.append_feedback(entry(&id.to_string())).unwrap();
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let mut learned = store.learned();
        learned.sort_unstable();
        assert_eq!(learned, (1..=64).collect::<Vec<u64>>());
        assert_eq!(store.random_history().len(), 64);
        assert_eq!(store.feedback().len(), 64);
    }

    #[test]
    fn score_map_reads_string_keys() {
        let (store, durable, _) = store();
        durable.set(SCORES_KEY, r#"{"4": 7, "8": 3}"#.into()).unwrap();
        assert_eq!(store.scores().get(&4), Some(&7));
    }
}
