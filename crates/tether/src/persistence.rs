//! Coalesced, off-runtime snapshot writes.
//!
//! Mutations call [`SnapshotWriter::request`], which only sets a flag. The
//! server's writer task wakes up, snapshots the registry under its lock
//! and hands the blocking write to `spawn_blocking`. A burst of requests
//! while a write is in flight collapses into one follow-up write.

use std::sync::Arc;

use tether_room::{PersistError, RegistrySnapshot, SnapshotStore};
use tokio::sync::Notify;

/// Signals the writer task and performs the actual saves.
pub(crate) struct SnapshotWriter {
    notify: Notify,
    store: Option<Arc<dyn SnapshotStore>>,
}

impl SnapshotWriter {
    /// A writer for `store`. `None` turns persistence off entirely.
    pub(crate) fn new(store: Option<Arc<dyn SnapshotStore>>) -> Self {
        Self {
            notify: Notify::new(),
            store,
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Asks for a snapshot to be written soon. Never blocks.
    pub(crate) fn request(&self) {
        if self.is_enabled() {
            // notify_one keeps a single permit, so requests coalesce.
            self.notify.notify_one();
        }
    }

    /// Waits for the next [`request`](Self::request).
    pub(crate) async fn requested(&self) {
        self.notify.notified().await;
    }

    /// Writes `snapshot` on the blocking pool.
    pub(crate) async fn save(
        &self,
        snapshot: RegistrySnapshot,
    ) -> Result<(), PersistError> {
        let Some(store) = self.store.as_ref().map(Arc::clone) else {
            return Ok(());
        };
        let rooms = snapshot.rooms.len();
        tokio::task::spawn_blocking(move || store.save(&snapshot))
            .await
            .map_err(|e| PersistError::Io(std::io::Error::other(e)))??;
        tracing::debug!(rooms, "snapshot written");
        Ok(())
    }
}
