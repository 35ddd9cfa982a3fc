//! Where snapshots live between restarts.
//!
//! Store methods are blocking. The server calls them from
//! `spawn_blocking`, never while holding the registry lock.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::{PersistError, RegistrySnapshot};

/// Loads and saves registry snapshots.
pub trait SnapshotStore: Send + Sync + 'static {
    /// Reads the last saved snapshot. `Ok(None)` if nothing was saved yet.
    fn load(&self) -> Result<Option<RegistrySnapshot>, PersistError>;

    /// Replaces the saved snapshot.
    fn save(&self, snapshot: &RegistrySnapshot) -> Result<(), PersistError>;
}

/// Loads a snapshot, treating every failure as "start empty".
pub fn load_snapshot(store: &dyn SnapshotStore) -> RegistrySnapshot {
    match store.load() {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => RegistrySnapshot::default(),
        Err(e) => {
            tracing::warn!(error = %e, "could not load snapshot, starting empty");
            RegistrySnapshot::default()
        }
    }
}

// ---------------------------------------------------------------------------
// JsonFileStore
// ---------------------------------------------------------------------------

/// A JSON file on disk.
///
/// Saves go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous snapshot intact.
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

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<RegistrySnapshot>, PersistError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&text)?))
    }

    fn save(&self, snapshot: &RegistrySnapshot) -> Result<(), PersistError> {
        let json = serde_json::to_vec_pretty(snapshot)?;
        let temp = self.temp_path();
        std::fs::write(&temp, json)?;
        std::fs::rename(&temp, &self.path)?;
        tracing::debug!(path = %self.path.display(), rooms = snapshot.rooms.len(), "snapshot saved");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Keeps the encoded snapshot in memory. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    json: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rooms in the stored snapshot, if any was saved.
    pub fn saved_rooms(&self) -> Option<usize> {
        self.load().ok().flatten().map(|s| s.rooms.len())
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<RegistrySnapshot>, PersistError> {
        let guard = self.json.lock().unwrap_or_else(|p| p.into_inner());
        match guard.as_deref() {
            Some(text) => Ok(Some(serde_json::from_str(text)?)),
            None => Ok(None),
        }
    }

    fn save(&self, snapshot: &RegistrySnapshot) -> Result<(), PersistError> {
        let text = serde_json::to_string(snapshot)?;
        *self.json.lock().unwrap_or_else(|p| p.into_inner()) = Some(text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{ManualClock, PresenceConfig, RoomRegistry};

    use super::*;

    /// Whole-second timestamps survive the JSON round trip exactly.
    fn registry_with_room() -> RoomRegistry {
        let mut reg = RoomRegistry::with_clock(
            PresenceConfig::default(),
            Arc::new(ManualClock::new(1_000.0)),
        );
        reg.create_room();
        reg
    }

    #[test]
    fn test_json_file_store_missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("rooms.json"));

        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_json_file_store_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("rooms.json"));
        let reg = registry_with_room();

        store.save(&reg.snapshot()).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, reg.snapshot());
        assert!(!dir.path().join("rooms.json.tmp").exists());
    }

    #[test]
    fn test_load_snapshot_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rooms.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = JsonFileStore::new(&path);

        assert!(matches!(store.load(), Err(PersistError::Json(_))));
        assert!(load_snapshot(&store).rooms.is_empty());
    }

    #[test]
    fn test_memory_store_clones_share_storage() {
        let store = MemoryStore::new();
        let other = store.clone();
        let reg = registry_with_room();

        other.save(&reg.snapshot()).unwrap();

        assert_eq!(store.saved_rooms(), Some(1));
    }
}
