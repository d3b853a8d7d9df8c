//! Sled-backed snapshot store.
//!
//! Snapshots are stored as serde_json bytes under `snap:<id>` keys, with a
//! secondary title index under `title:<normalized>:<id>` for conflict
//! lookups. Values embed arbitrary theme trees, so the encoding must be
//! self-describing.

use crate::error::StoreError;
use crate::snapshot::Snapshot;
use crate::store::{normalize_title, StorageAdapter};
use crate::types::SnapshotId;
use std::path::Path;

const SNAPSHOT_PREFIX: &str = "snap:";
const TITLE_PREFIX: &str = "title:";

pub struct SledSnapshotStore {
    db: sled::Db,
}

impl SledSnapshotStore {
    /// Open (or create) a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)
            .map_err(|e| StoreError::Backend(format!("Failed to open sled database: {}", e)))?;
        Ok(Self { db })
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db
            .flush()
            .map_err(|e| StoreError::Backend(format!("Failed to flush database: {}", e)))?;
        Ok(())
    }

    fn snapshot_key(id: &str) -> String {
        format!("{}{}", SNAPSHOT_PREFIX, id)
    }

    fn title_key(title: &str, id: &str) -> String {
        format!("{}{}:{}", TITLE_PREFIX, normalize_title(title), id)
    }

    fn read(&self, key: &str) -> Result<Option<Snapshot>, StoreError> {
        match self
            .db
            .get(key.as_bytes())
            .map_err(|e| StoreError::Backend(format!("Failed to read snapshot: {}", e)))?
        {
            Some(bytes) => {
                let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    fn write(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(snapshot)?;
        self.db
            .insert(Self::snapshot_key(&snapshot.id).as_bytes(), bytes)
            .map_err(|e| StoreError::Backend(format!("Failed to write snapshot: {}", e)))?;
        self.db
            .insert(
                Self::title_key(&snapshot.title, &snapshot.id).as_bytes(),
                snapshot.id.as_bytes(),
            )
            .map_err(|e| StoreError::Backend(format!("Failed to write title index: {}", e)))?;
        Ok(())
    }

    fn remove_title_entry(&self, title: &str, id: &str) -> Result<(), StoreError> {
        self.db
            .remove(Self::title_key(title, id).as_bytes())
            .map_err(|e| StoreError::Backend(format!("Failed to remove title index: {}", e)))?;
        Ok(())
    }
}

impl StorageAdapter for SledSnapshotStore {
    fn get(&self, id: &str) -> Result<Option<Snapshot>, StoreError> {
        self.read(&Self::snapshot_key(id))
    }

    fn create(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        if self.exists(&snapshot.id)? {
            return Err(StoreError::Backend(format!(
                "Snapshot already exists: {}",
                snapshot.id
            )));
        }
        self.write(snapshot)
    }

    fn update(&self, id: &str, snapshot: &Snapshot) -> Result<(), StoreError> {
        let existing = self
            .get(id)?
            .ok_or_else(|| StoreError::SnapshotNotFound(id.to_string()))?;
        // Retitle moves the index entry.
        if normalize_title(&existing.title) != normalize_title(&snapshot.title) {
            self.remove_title_entry(&existing.title, id)?;
        }
        self.write(snapshot)
    }

    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        match self.get(id)? {
            Some(snapshot) => {
                self.db
                    .remove(Self::snapshot_key(id).as_bytes())
                    .map_err(|e| StoreError::Backend(format!("Failed to delete snapshot: {}", e)))?;
                self.remove_title_entry(&snapshot.title, id)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn list(&self) -> Result<Vec<Snapshot>, StoreError> {
        let mut snapshots = Vec::new();
        for item in self.db.scan_prefix(SNAPSHOT_PREFIX.as_bytes()) {
            let (_, bytes) =
                item.map_err(|e| StoreError::Backend(format!("Failed to iterate store: {}", e)))?;
            let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
            snapshots.push(snapshot);
        }
        Ok(snapshots)
    }

    fn exists(&self, id: &str) -> Result<bool, StoreError> {
        self.db
            .contains_key(Self::snapshot_key(id).as_bytes())
            .map_err(|e| StoreError::Backend(format!("Failed to check existence: {}", e)))
    }

    fn find_by_title(&self, title: &str) -> Result<Vec<Snapshot>, StoreError> {
        let prefix = format!("{}{}:", TITLE_PREFIX, normalize_title(title));
        let mut matches = Vec::new();
        for item in self.db.scan_prefix(prefix.as_bytes()) {
            let (_, id_bytes) =
                item.map_err(|e| StoreError::Backend(format!("Failed to scan titles: {}", e)))?;
            let id = String::from_utf8_lossy(&id_bytes).to_string();
            if let Some(snapshot) = self.get(&id)? {
                matches.push(snapshot);
            }
        }
        Ok(matches)
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.db.scan_prefix(SNAPSHOT_PREFIX.as_bytes()).count())
    }

    fn transaction(
        &self,
        ops: &mut dyn FnMut(&dyn StorageAdapter) -> Result<SnapshotId, StoreError>,
    ) -> Result<SnapshotId, StoreError> {
        // Single-snapshot writes are atomic in sled; the engine does not
        // rely on multi-key rollback.
        let id = ops(self)?;
        self.flush()?;
        Ok(id)
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.db
            .clear()
            .map_err(|e| StoreError::Backend(format!("Failed to clear store: {}", e)))?;
        Ok(())
    }
}
