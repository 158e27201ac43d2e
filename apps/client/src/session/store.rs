//! Credential Store: key/value persistence for the two opaque bearer strings.
//!
//! No structure or expiry checks happen here; an expired access credential is
//! only ever discovered by a rejected request.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::storage::{load_json, remove_json, save_json, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    Access,
    Refresh,
}

impl CredentialKind {
    pub fn storage_key(self) -> &'static str {
        match self {
            CredentialKind::Access => "access_token",
            CredentialKind::Refresh => "refresh_token",
        }
    }
}

pub trait CredentialStore: Send + Sync {
    fn get(&self, kind: CredentialKind) -> Option<String>;
    fn set(&self, kind: CredentialKind, value: &str) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct StoredCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

impl StoredCredentials {
    fn get(&self, kind: CredentialKind) -> Option<String> {
        match kind {
            CredentialKind::Access => self.access_token.clone(),
            CredentialKind::Refresh => self.refresh_token.clone(),
        }
    }

    fn slot(&mut self, kind: CredentialKind) -> &mut Option<String> {
        match kind {
            CredentialKind::Access => &mut self.access_token,
            CredentialKind::Refresh => &mut self.refresh_token,
        }
    }

    fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    inner: RwLock<StoredCredentials>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(access: Option<&str>, refresh: Option<&str>) -> Self {
        Self {
            inner: RwLock::new(StoredCredentials {
                access_token: access.map(str::to_string),
                refresh_token: refresh.map(str::to_string),
            }),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, kind: CredentialKind) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(kind)
    }

    fn set(&self, kind: CredentialKind, value: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *inner.slot(kind) = Some(value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = StoredCredentials::default();
        Ok(())
    }
}

/// JSON file store, so a session survives restarts of the client process.
///
/// Reads are served from an in-memory copy. Every write updates that copy
/// first and then persists it; a failed persist is reported but the process
/// keeps using the new value.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    cache: RwLock<StoredCredentials>,
}

impl FileCredentialStore {
    pub const FILE_NAME: &'static str = "credentials.json";

    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let cached: StoredCredentials = load_json(&path)?.unwrap_or_default();
        debug!(
            path = %path.display(),
            has_access = cached.access_token.is_some(),
            has_refresh = cached.refresh_token.is_some(),
            "credential store opened"
        );
        Ok(Self {
            path,
            cache: RwLock::new(cached),
        })
    }

    pub fn in_dir(dir: &Path) -> Result<Self, StoreError> {
        Self::open(dir.join(Self::FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, snapshot: &StoredCredentials) -> Result<(), StoreError> {
        if snapshot.is_empty() {
            remove_json(&self.path)
        } else {
            save_json(&self.path, snapshot)
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, kind: CredentialKind) -> Option<String> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(kind)
    }

    fn set(&self, kind: CredentialKind, value: &str) -> Result<(), StoreError> {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        *cache.slot(kind) = Some(value.to_string());
        self.persist(&cache)
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        *cache = StoredCredentials::default();
        self.persist(&cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_set_get_clear() {
        let store = MemoryCredentialStore::new();
        assert!(store.get(CredentialKind::Access).is_none());

        store.set(CredentialKind::Access, "a1").unwrap();
        store.set(CredentialKind::Refresh, "r1").unwrap();
        assert_eq!(store.get(CredentialKind::Access).as_deref(), Some("a1"));
        assert_eq!(store.get(CredentialKind::Refresh).as_deref(), Some("r1"));

        store.clear().unwrap();
        assert!(store.get(CredentialKind::Access).is_none());
        assert!(store.get(CredentialKind::Refresh).is_none());
    }

    #[test]
    fn test_memory_store_does_not_inspect_values() {
        let store = MemoryCredentialStore::new();
        store.set(CredentialKind::Access, "not-a-jwt").unwrap();
        assert_eq!(store.get(CredentialKind::Access).as_deref(), Some("not-a-jwt"));
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileCredentialStore::in_dir(dir.path()).unwrap();
            store.set(CredentialKind::Access, "a1").unwrap();
            store.set(CredentialKind::Refresh, "r1").unwrap();
        }

        let reopened = FileCredentialStore::in_dir(dir.path()).unwrap();
        assert_eq!(reopened.get(CredentialKind::Access).as_deref(), Some("a1"));
        assert_eq!(reopened.get(CredentialKind::Refresh).as_deref(), Some("r1"));
    }

    #[test]
    #[cfg(unix)]
    fn test_file_store_credentials_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::in_dir(dir.path()).unwrap();
        store.set(CredentialKind::Refresh, "secret-refresh").unwrap();
        store.set(CredentialKind::Access, "a1").unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_file_store_uses_backend_key_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::in_dir(dir.path()).unwrap();
        store.set(CredentialKind::Access, "a1").unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains(CredentialKind::Access.storage_key()));
        assert!(!raw.contains(CredentialKind::Refresh.storage_key()));
    }

    #[test]
    fn test_file_store_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::in_dir(dir.path()).unwrap();
        store.set(CredentialKind::Access, "a1").unwrap();
        assert!(store.path().exists());

        store.clear().unwrap();
        assert!(!store.path().exists());
        assert!(store.get(CredentialKind::Access).is_none());

        let reopened = FileCredentialStore::in_dir(dir.path()).unwrap();
        assert!(reopened.get(CredentialKind::Access).is_none());
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(FileCredentialStore::FILE_NAME), "garbage").unwrap();
        assert!(FileCredentialStore::in_dir(dir.path()).is_err());
    }
}
