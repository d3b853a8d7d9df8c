//! In-memory snapshot store for tests and ephemeral sessions.

use crate::error::StoreError;
use crate::snapshot::Snapshot;
use crate::store::{normalize_title, StorageAdapter};
use crate::types::SnapshotId;
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Default)]
pub struct MemorySnapshotStore {
    snapshots: RwLock<BTreeMap<SnapshotId, Snapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageAdapter for MemorySnapshotStore {
    fn get(&self, id: &str) -> Result<Option<Snapshot>, StoreError> {
        Ok(self.snapshots.read().get(id).cloned())
    }

    fn create(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let mut snapshots = self.snapshots.write();
        if snapshots.contains_key(&snapshot.id) {
            return Err(StoreError::Backend(format!(
                "Snapshot already exists: {}",
                snapshot.id
            )));
        }
        snapshots.insert(snapshot.id.clone(), snapshot.clone());
        Ok(())
    }

    fn update(&self, id: &str, snapshot: &Snapshot) -> Result<(), StoreError> {
        let mut snapshots = self.snapshots.write();
        if !snapshots.contains_key(id) {
            return Err(StoreError::SnapshotNotFound(id.to_string()));
        }
        snapshots.insert(id.to_string(), snapshot.clone());
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.snapshots.write().remove(id).is_some())
    }

    fn list(&self) -> Result<Vec<Snapshot>, StoreError> {
        Ok(self.snapshots.read().values().cloned().collect())
    }

    fn exists(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.snapshots.read().contains_key(id))
    }

    fn find_by_title(&self, title: &str) -> Result<Vec<Snapshot>, StoreError> {
        let wanted = normalize_title(title);
        Ok(self
            .snapshots
            .read()
            .values()
            .filter(|s| normalize_title(&s.title) == wanted)
            .cloned()
            .collect())
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.snapshots.read().len())
    }

    fn transaction(
        &self,
        ops: &mut dyn FnMut(&dyn StorageAdapter) -> Result<SnapshotId, StoreError>,
    ) -> Result<SnapshotId, StoreError> {
        ops(self)
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.snapshots.write().clear();
        Ok(())
    }
}
