// shop-client/src/session/storage.rs
// Session persistence - JSON file or in-memory

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared::UserInfo;
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted form of a login session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    pub user: UserInfo,
    /// RFC 3339 time of the login
    #[serde(default)]
    pub logged_in_at: Option<String>,
}

impl StoredSession {
    pub fn new(token: String, user: UserInfo) -> Self {
        Self {
            token,
            user,
            logged_in_at: Some(chrono::Utc::now().to_rfc3339()),
        }
    }
}

/// Where the session outlives the process
pub trait SessionStorage: Send + Sync + std::fmt::Debug {
    fn load(&self) -> Option<StoredSession>;
    fn save(&self, session: &StoredSession) -> std::io::Result<()>;
    fn clear(&self) -> std::io::Result<()>;
}

/// JSON file storage
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ensure the parent directory exists
    fn ensure_dir(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileSessionStorage {
    fn load(&self) -> Option<StoredSession> {
        if !self.path.exists() {
            return None;
        }
        let json = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&json) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Discarding unreadable session file: {}", e);
                None
            }
        }
    }

    fn save(&self, session: &StoredSession) -> std::io::Result<()> {
        self.ensure_dir()?;
        let json = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, json)
    }

    fn clear(&self) -> std::io::Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// Process-lifetime storage, nothing touches disk
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    slot: Mutex<Option<StoredSession>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self) -> Option<StoredSession> {
        self.slot.lock().clone()
    }

    fn save(&self, session: &StoredSession) -> std::io::Result<()> {
        *self.slot.lock() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> std::io::Result<()> {
        *self.slot.lock() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_storage_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileSessionStorage::new(temp_dir.path().join("nested").join("session.json"));
        assert!(storage.load().is_none());

        let session = StoredSession::new("tok".into(), UserInfo::new("admin", "admin"));
        storage.save(&session).unwrap();
        assert!(storage.exists());
        assert_eq!(storage.load(), Some(session));

        storage.clear().unwrap();
        assert!(!storage.exists());
        assert!(storage.load().is_none());

        // clearing twice is fine
        storage.clear().unwrap();
    }

    #[test]
    fn test_corrupt_file_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        let storage = FileSessionStorage::new(&path);
        assert!(storage.load().is_none());
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemorySessionStorage::new();
        let session = StoredSession::new("t".into(), UserInfo::new("staff", "editor"));
        storage.save(&session).unwrap();
        assert_eq!(storage.load().map(|s| s.token), Some("t".to_string()));
        storage.clear().unwrap();
        assert!(storage.load().is_none());
    }
}
