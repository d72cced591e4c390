//! Where the client keeps its token between runs.

use std::{
    io::ErrorKind,
    path::PathBuf,
    sync::Mutex,
};

use serde::{Deserialize, Serialize};

use crate::{auth::dto::PublicUser, client::error::ClientError};

/// Token plus the identity it was issued for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    pub user: PublicUser,
}

pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<StoredSession>, ClientError>;
    fn save(&self, session: &StoredSession) -> Result<(), ClientError>;
    fn clear(&self) -> Result<(), ClientError>;
}

#[derive(Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<StoredSession>>,
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<StoredSession>, ClientError> {
        Ok(lock(&self.slot).clone())
    }

    fn save(&self, session: &StoredSession) -> Result<(), ClientError> {
        *lock(&self.slot) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        *lock(&self.slot) = None;
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// JSON file on disk. A missing file means no session.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<StoredSession>, ClientError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, session: &StoredSession) -> Result<(), ClientError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(session)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn session() -> StoredSession {
        StoredSession {
            token: "tok".into(),
            user: PublicUser {
                id: Uuid::new_v4(),
                name: "Ann".into(),
                email: "ann@x.com".into(),
                role: None,
            },
        }
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");
        let store = FileSessionStore::new(&path);
        assert_eq!(store.load().unwrap(), None);

        let s = session();
        store.save(&s).unwrap();
        assert_eq!(FileSessionStore::new(&path).load().unwrap(), Some(s));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_file_is_an_encoding_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            FileSessionStore::new(&path).load(),
            Err(ClientError::Encoding(_))
        ));
    }

    #[test]
    fn memory_store_clear() {
        let store = MemorySessionStore::default();
        store.save(&session()).unwrap();
        assert!(store.load().unwrap().is_some());
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
