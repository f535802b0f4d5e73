//! services/mirror/src/adapters/file_store.rs
//!
//! A `KeyValueStore` persisted as one JSON object file. Used for the durable
//! scope so accounts, learned tricks and feedback survive restarts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};
use tricklist_core::ports::{KeyValueStore, PortError, PortResult};

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens the store at `path`. A missing file starts empty; an unreadable
    /// or corrupt one is logged and also starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load(&path);
        info!(path = %path.display(), keys = entries.len(), "Opened durable store.");
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> PortResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| PortError::Storage(e.to_string()))?;
            }
        }
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| PortError::Storage(e.to_string()))?;
        std::fs::write(&self.path, json).map_err(|e| PortError::Storage(e.to_string()))
    }
}

fn load(path: &Path) -> BTreeMap<String, String> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read durable store; starting empty.");
            return BTreeMap::new();
        }
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "Durable store is corrupt; starting empty.");
        BTreeMap::new()
    })
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) -> PortResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value);
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }

    fn clear(&self) -> PortResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.clear();
        self.persist(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("durable.json");

        let store = FileStore::open(&path);
        store.set("tricklist_learned", "[1,2]".into()).unwrap();
        store.set("other", "x".into()).unwrap();
        store.remove("other").unwrap();
        drop(store);

        let reopened = FileStore::open(&path);
        assert_eq!(reopened.get("tricklist_learned").as_deref(), Some("[1,2]"));
        assert!(reopened.get("other").is_none());
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("durable.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileStore::open(&path);
        assert!(store.get("anything").is_none());
        store.set("k", "v".into()).unwrap();
        assert_eq!(FileStore::open(&path).get("k").as_deref(), Some("v"));
    }
}
