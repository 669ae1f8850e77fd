use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, error};
use uuid::Uuid;

use crate::users::repo_types::UserRecord;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("user store {} unavailable: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("user store {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Whole-collection persistence for user records.
///
/// `load` returns every record in stored order; `save` replaces the stored
/// collection with `records`.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn load(&self) -> Result<Vec<UserRecord>, StoreError>;
    async fn save(&self, records: &[UserRecord]) -> Result<(), StoreError>;
}

/// Users kept as one pretty-printed JSON array on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Sibling of the store file, unique per call so concurrent writers never
    /// share a staging file.
    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "users.json".into());
        name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl UserRepository for JsonFileStore {
    async fn load(&self) -> Result<Vec<UserRecord>, StoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "user store absent; starting empty");
                return Ok(Vec::new());
            }
            Err(e) => {
                error!(error = %e, path = %self.path.display(), "read user store failed");
                return Err(self.io_err(e));
            }
        };

        serde_json::from_slice(&raw).map_err(|source| {
            error!(error = %source, path = %self.path.display(), "parse user store failed");
            StoreError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })
    }

    async fn save(&self, records: &[UserRecord]) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                error!(error = %e, dir = %dir.display(), "create user store dir failed");
                self.io_err(e)
            })?;
        }

        let body = serde_json::to_vec_pretty(records).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        // Readers see either the previous document or the new one, never a torn write.
        let tmp = self.tmp_path();
        let written = match tokio::fs::write(&tmp, &body).await {
            Ok(()) => tokio::fs::rename(&tmp, &self.path).await,
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            error!(error = %e, path = %self.path.display(), "write user store failed");
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(self.io_err(e));
        }

        debug!(path = %self.path.display(), count = records.len(), "user store saved");
        Ok(())
    }
}

/// Volatile store used by tests and [`crate::state::AppState::fake`].
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: tokio::sync::Mutex<Vec<UserRecord>>,
}

#[cfg(test)]
#[async_trait]
impl UserRepository for MemoryStore {
    async fn load(&self) -> Result<Vec<UserRecord>, StoreError> {
        Ok(self.records.lock().await.clone())
    }

    async fn save(&self, records: &[UserRecord]) -> Result<(), StoreError> {
        *self.records.lock().await = records.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo_types::{ReviewEntry, VisitEntry};

    fn record(id: &str, email: &str) -> UserRecord {
        UserRecord {
            id: id.into(),
            name: "Asha".into(),
            email: email.into(),
            password_hash: "$argon2id$fake".into(),
            points: 85,
            wishlist: vec![3],
            visited: vec![VisitEntry {
                museum_id: 3,
                date: "2024-01-01".into(),
            }],
            reviews: vec![ReviewEntry {
                museum_id: 3,
                date: "2024-01-02T10:00:00Z".into(),
                rating: 4,
                notes: "Nice".into(),
            }],
        }
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("users.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_creates_parent_dir_and_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/data/users.json"));
        store
            .save(&[record("b", "b@example.com"), record("a", "a@example.com")])
            .await
            .unwrap();

        let loaded = store.load().await.unwrap();
        let ids: Vec<_> = loaded.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
        assert_eq!(loaded[0].reviews[0].notes, "Nice");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("nested/data"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(leftovers, ["users.json"]);
    }

    #[test]
    fn staging_files_are_unique_per_save() {
        let store = JsonFileStore::new("data/users.json");
        let (a, b) = (store.tmp_path(), store.tmp_path());
        assert_ne!(a, b);
        assert_eq!(a.parent(), store.path().parent());
        assert!(a.to_string_lossy().ends_with(".tmp"));
    }

    #[tokio::test]
    async fn concurrent_saves_from_separate_stores_never_tear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let store = JsonFileStore::new(&path);
                tokio::spawn(async move {
                    let id = format!("u{i}");
                    store.save(&[record(&id, "a@example.com")]).await
                })
            })
            .collect();
        for t in tasks {
            t.await.unwrap().expect("every save lands");
        }

        let loaded = JsonFileStore::new(&path).load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn persisted_document_uses_camel_case_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("users.json"));
        store.save(&[record("a", "a@example.com")]).await.unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("\"passwordHash\""));
        assert!(text.contains("\"museumId\""));
        assert!(!text.contains("museum_id"));
    }

    #[tokio::test]
    async fn corrupt_file_is_reported_not_masked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let err = JsonFileStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn unreadable_path_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be cannot be read as a document.
        let err = JsonFileStore::new(dir.path()).load().await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }
}
