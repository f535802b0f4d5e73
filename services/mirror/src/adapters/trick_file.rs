//! services/mirror/src/adapters/trick_file.rs
//!
//! The flat-file trick store: one JSON array on disk, rewritten on every change.
//! Implements the `TrickRepository` port from the `core` crate.
//!
//! Writers in this process are serialized by a mutex; separate processes
//! writing the same file still race and the last write wins. A file that
//! exists but does not parse fails every operation and is never rewritten.

use async_trait::async_trait;
use serde_json::Number;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{error, info};
use tricklist_core::domain::{sort_for_display, Trick, TrickDraft, TrickLevel, TrickPatch};
use tricklist_core::ports::{PortError, PortResult, TrickRepository};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

pub struct JsonTrickStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonTrickStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Reads the file. A missing file is an empty list.
    async fn read(&self) -> PortResult<Vec<Trick>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Error reading tricks");
                return Err(PortError::Storage(e.to_string()));
            }
        };
        serde_json::from_str(&raw).map_err(|e| {
            error!(path = %self.path.display(), error = %e, "Error parsing tricks");
            PortError::Storage(format!("Tricks file is not a valid trick list: {}", e))
        })
    }

    async fn write(&self, tricks: &[Trick]) -> PortResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| PortError::Storage(e.to_string()))?;
            }
        }
        let json = serde_json::to_string_pretty(tricks)
            .map_err(|e| PortError::Storage(e.to_string()))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| PortError::Storage(e.to_string()))
    }
}

fn next_id(tricks: &[Trick]) -> u64 {
    tricks.iter().map(|t| t.id).max().unwrap_or(0) + 1
}

fn not_found() -> PortError {
    PortError::NotFound("Trick not found".to_string())
}

/// Fills in defaults for a new trick. `fallback_order` is the current count.
/// An empty name or level and an order index of zero count as not given.
fn materialize(id: u64, draft: TrickDraft, default_name: &str, fallback_order: usize) -> Trick {
    Trick {
        level: draft
            .level
            .filter(|level| !level.is_blank())
            .unwrap_or(TrickLevel::Beginner),
        description: draft.description.unwrap_or_default(),
        tips: draft.tips.unwrap_or_default(),
        order_index: draft
            .order_index
            .filter(|n| n.as_f64().is_some_and(|n| n != 0.0))
            .unwrap_or_else(|| Number::from(fallback_order)),
        score: draft.score.unwrap_or_else(|| Number::from(0u8)),
        ..Trick::new(
            id,
            draft
                .name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| default_name.to_string()),
        )
    }
}

//=========================================================================================
// `TrickRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl TrickRepository for JsonTrickStore {
    async fn list_tricks(&self) -> PortResult<Vec<Trick>> {
        let mut tricks = self.read().await?;
        sort_for_display(&mut tricks);
        Ok(tricks)
    }

    async fn get_trick(&self, id: u64) -> PortResult<Trick> {
        self.read()
            .await?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(not_found)
    }

    async fn create_trick(&self, draft: TrickDraft) -> PortResult<Trick> {
        let _guard = self.write_lock.lock().await;
        let mut tricks = self.read().await?;

        let trick = materialize(next_id(&tricks), draft, "Unnamed Trick", tricks.len());
        tricks.push(trick.clone());
        self.write(&tricks).await?;

        info!(id = trick.id, name = %trick.name, "Created trick.");
        Ok(trick)
    }

    async fn update_trick(&self, id: u64, patch: TrickPatch) -> PortResult<Trick> {
        let _guard = self.write_lock.lock().await;
        let mut tricks = self.read().await?;

        let trick = tricks.iter_mut().find(|t| t.id == id).ok_or_else(not_found)?;
        trick.apply(patch);
        let updated = trick.clone();
        self.write(&tricks).await?;

        info!(id, "Updated trick.");
        Ok(updated)
    }

    async fn delete_trick(&self, id: u64) -> PortResult<Trick> {
        let _guard = self.write_lock.lock().await;
        let mut tricks = self.read().await?;

        let index = tricks.iter().position(|t| t.id == id).ok_or_else(not_found)?;
        let deleted = tricks.remove(index);
        self.write(&tricks).await?;

        info!(id, "Deleted trick.");
        Ok(deleted)
    }

    async fn import_tricks(&self, drafts: Vec<TrickDraft>) -> PortResult<Vec<Trick>> {
        let _guard = self.write_lock.lock().await;
        let mut tricks = self.read().await?;
        let mut imported = Vec::new();

        for draft in drafts {
            let id = draft.id.filter(|id| *id > 0).unwrap_or_else(|| next_id(&tricks));
            if tricks.iter().any(|t| t.id == id) {
                continue;
            }
            let trick = materialize(id, draft, "Unnamed", tricks.len());
            tricks.push(trick.clone());
            imported.push(trick);
        }
        self.write(&tricks).await?;

        info!(count = imported.len(), "Imported tricks.");
        Ok(imported)
    }

    async fn export_tricks(&self) -> PortResult<Vec<Trick>> {
        self.read().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tricklist_core::domain::TrickLevel;

    fn draft(name: &str, level: TrickLevel) -> TrickDraft {
        TrickDraft {
            name: Some(name.to_string()),
            level: Some(level),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_assigns_monotonic_ids_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTrickStore::new(dir.path().join("tricks"));

        let first = store.create_trick(TrickDraft::default()).await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(first.name, "Unnamed Trick");
        assert_eq!(first.level, TrickLevel::Beginner);
        assert_eq!(first.order_index, Number::from(0u8));

        let second = store.create_trick(draft("Back flip", TrickLevel::Advanced)).await.unwrap();
        assert_eq!(second.id, 2);
        assert_eq!(second.order_index, Number::from(1u8));

        store.delete_trick(1).await.unwrap();
        let third = store.create_trick(draft("Seat drop", TrickLevel::Beginner)).await.unwrap();
        assert_eq!(third.id, 3);
    }

    #[tokio::test]
    async fn list_is_sorted_by_level_then_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTrickStore::new(dir.path().join("tricks"));
        store.create_trick(draft("Double back", TrickLevel::Elite)).await.unwrap();
        store.create_trick(draft("Tuck jump", TrickLevel::Beginner)).await.unwrap();
        store.create_trick(draft("Barani", TrickLevel::Intermediate)).await.unwrap();

        let names: Vec<String> = store
            .list_tricks()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Tuck jump", "Barani", "Double back"]);
    }

    #[tokio::test]
    async fn update_and_delete_missing_ids_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTrickStore::new(dir.path().join("tricks"));
        assert!(matches!(
            store.update_trick(9, TrickPatch::default()).await,
            Err(PortError::NotFound(_))
        ));
        assert!(matches!(store.delete_trick(9).await, Err(PortError::NotFound(_))));
    }

    #[tokio::test]
    async fn import_skips_existing_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTrickStore::new(dir.path().join("tricks"));
        store.create_trick(draft("Existing", TrickLevel::Novice)).await.unwrap();

        let imported = store
            .import_tricks(vec![
                TrickDraft { id: Some(1), ..draft("Clash", TrickLevel::Novice) },
                TrickDraft { id: Some(10), ..draft("Kept id", TrickLevel::Novice) },
                draft("Fresh", TrickLevel::Elite),
            ])
            .await
            .unwrap();

        let ids: Vec<u64> = imported.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![10, 11]);
        assert_eq!(store.export_tricks().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn corrupt_file_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tricks");
        std::fs::write(&path, "oops").unwrap();
        let store = JsonTrickStore::new(&path);

        assert!(matches!(store.list_tricks().await, Err(PortError::Storage(_))));
        assert!(matches!(
            store.create_trick(draft("New", TrickLevel::Beginner)).await,
            Err(PortError::Storage(_))
        ));
        assert!(matches!(
            store.import_tricks(vec![draft("New", TrickLevel::Beginner)]).await,
            Err(PortError::Storage(_))
        ));
        assert!(matches!(store.delete_trick(1).await, Err(PortError::Storage(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "oops");
    }

    #[tokio::test]
    async fn hand_edited_entries_survive_a_create() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tricks");
        std::fs::write(
            &path,
            r#"[
                {"id": 1, "name": "Seat drop", "level": "Beginner"},
                {"id": 2, "name": "Triffus", "level": "Pro", "score": 2.5}
            ]"#,
        )
        .unwrap();
        let store = JsonTrickStore::new(&path);

        let created = store.create_trick(draft("New", TrickLevel::Novice)).await.unwrap();
        assert_eq!(created.id, 3);

        let listed = store.list_tricks().await.unwrap();
        let ids: Vec<u64> = listed.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3, 2], "unknown level sorts last");
        assert_eq!(listed[2].level, TrickLevel::Other("Pro".to_string()));
        assert_eq!(listed[2].score.as_f64(), Some(2.5));
    }

    #[tokio::test]
    async fn update_keeps_fields_it_does_not_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tricks");
        std::fs::write(
            &path,
            r#"[{"id": 1, "name": "Barani", "videoUrl": "https://v/1"}]"#,
        )
        .unwrap();
        let store = JsonTrickStore::new(&path);

        let patch = TrickPatch {
            name: Some("Barani ball out".to_string()),
            ..Default::default()
        };
        let updated = store.update_trick(1, patch).await.unwrap();
        assert_eq!(updated.extra["videoUrl"], "https://v/1");

        let on_disk: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk[0]["videoUrl"], "https://v/1");
        assert_eq!(on_disk[0]["name"], "Barani ball out");
    }

    #[tokio::test]
    async fn empty_name_and_zero_order_take_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTrickStore::new(dir.path().join("tricks"));
        store.create_trick(draft("First", TrickLevel::Beginner)).await.unwrap();

        let created = store
            .create_trick(TrickDraft {
                name: Some(String::new()),
                level: Some(TrickLevel::Other(String::new())),
                order_index: Some(Number::from(0u8)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(created.name, "Unnamed Trick");
        assert_eq!(created.level, TrickLevel::Beginner);
        assert_eq!(created.order_index, Number::from(1u8));

        let imported = store
            .import_tricks(vec![TrickDraft {
                name: Some(String::new()),
                order_index: Some(Number::from(7u8)),
                ..Default::default()
            }])
            .await
            .unwrap();
        assert_eq!(imported[0].name, "Unnamed");
        assert_eq!(imported[0].order_index, Number::from(7u8));
    }
}
