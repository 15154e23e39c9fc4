//! Storage adapters for [`ProgressStorage`].
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::convert::Infallible;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use crate::ProgressStorage;
use crate::archetype::ArchetypeProfile;
use crate::constants::{ARCHETYPE_FILE, QUESTS_FILE, XP_FILE};
use crate::quests::QuestSnapshot;
use crate::session::SessionId;
use crate::xp::XpSnapshot;

#[derive(Debug, Clone, Default)]
struct StoredSession {
    quests: Option<QuestSnapshot>,
    xp: Option<XpSnapshot>,
    archetype: Option<ArchetypeProfile>,
}

/// In-process storage. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    sessions: Arc<Mutex<HashMap<SessionId, StoredSession>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, StoredSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions().contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }
}

impl ProgressStorage for MemoryStorage {
    type Error = Infallible;

    fn save_quests(&self, id: &SessionId, snapshot: &QuestSnapshot) -> Result<(), Self::Error> {
        self.sessions().entry(id.clone()).or_default().quests = Some(snapshot.clone());
        Ok(())
    }

    fn load_quests(&self, id: &SessionId) -> Result<Option<QuestSnapshot>, Self::Error> {
        Ok(self.sessions().get(id).and_then(|s| s.quests.clone()))
    }

    fn save_xp(&self, id: &SessionId, snapshot: &XpSnapshot) -> Result<(), Self::Error> {
        self.sessions().entry(id.clone()).or_default().xp = Some(*snapshot);
        Ok(())
    }

    fn load_xp(&self, id: &SessionId) -> Result<Option<XpSnapshot>, Self::Error> {
        Ok(self.sessions().get(id).and_then(|s| s.xp))
    }

    fn save_archetype(
        &self,
        id: &SessionId,
        profile: &ArchetypeProfile,
    ) -> Result<(), Self::Error> {
        self.sessions().entry(id.clone()).or_default().archetype = Some(profile.clone());
        Ok(())
    }

    fn load_archetype(&self, id: &SessionId) -> Result<Option<ArchetypeProfile>, Self::Error> {
        Ok(self.sessions().get(id).and_then(|s| s.archetype.clone()))
    }

    fn delete_session(&self, id: &SessionId) -> Result<(), Self::Error> {
        self.sessions().remove(id);
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid snapshot at {path}: {source}")]
    Serde {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One directory per session, one pretty-printed JSON file per container.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    root: PathBuf,
}

impl JsonFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_dir(&self, id: &SessionId) -> PathBuf {
        self.root.join(id.as_str())
    }

    fn write<T: Serialize>(&self, id: &SessionId, file: &str, value: &T) -> Result<(), StorageError> {
        let dir = self.session_dir(id);
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            path: dir.clone(),
            source,
        })?;
        let path = dir.join(file);
        let payload = serde_json::to_vec_pretty(value).map_err(|source| StorageError::Serde {
            path: path.clone(),
            source,
        })?;
        // write-then-rename so a crash never leaves a half-written snapshot
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, payload).map_err(|source| StorageError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StorageError::Io { path, source })
    }

    fn read<T: DeserializeOwned>(&self, id: &SessionId, file: &str) -> Result<Option<T>, StorageError> {
        let path = self.session_dir(id).join(file);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StorageError::Serde { path, source })
    }
}

impl ProgressStorage for JsonFileStorage {
    type Error = StorageError;

    fn save_quests(&self, id: &SessionId, snapshot: &QuestSnapshot) -> Result<(), Self::Error> {
        self.write(id, QUESTS_FILE, snapshot)
    }

    fn load_quests(&self, id: &SessionId) -> Result<Option<QuestSnapshot>, Self::Error> {
        self.read(id, QUESTS_FILE)
    }

    fn save_xp(&self, id: &SessionId, snapshot: &XpSnapshot) -> Result<(), Self::Error> {
        self.write(id, XP_FILE, snapshot)
    }

    fn load_xp(&self, id: &SessionId) -> Result<Option<XpSnapshot>, Self::Error> {
        self.read(id, XP_FILE)
    }

    fn save_archetype(
        &self,
        id: &SessionId,
        profile: &ArchetypeProfile,
    ) -> Result<(), Self::Error> {
        self.write(id, ARCHETYPE_FILE, profile)
    }

    fn load_archetype(&self, id: &SessionId) -> Result<Option<ArchetypeProfile>, Self::Error> {
        self.read(id, ARCHETYPE_FILE)
    }

    fn delete_session(&self, id: &SessionId) -> Result<(), Self::Error> {
        let dir = self.session_dir(id);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io { path: dir, source }),
        }
    }
}
