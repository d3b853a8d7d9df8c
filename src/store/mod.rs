//! Snapshot storage adapters.
//!
//! The engine treats storage as a keyed object store with a queryable title
//! index. Title uniqueness is deliberately NOT enforced here; conflict
//! detection and resolution belong to the persistence engine.

pub mod memory;
pub mod sled_store;

pub use memory::MemorySnapshotStore;
pub use sled_store::SledSnapshotStore;

use crate::error::StoreError;
use crate::snapshot::Snapshot;
use crate::types::SnapshotId;

/// Keyed snapshot store consumed by the persistence engine.
pub trait StorageAdapter: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<Snapshot>, StoreError>;

    /// Insert a new snapshot. Fails if the id already exists.
    fn create(&self, snapshot: &Snapshot) -> Result<(), StoreError>;

    /// Replace an existing snapshot. Fails if the id is absent.
    fn update(&self, id: &str, snapshot: &Snapshot) -> Result<(), StoreError>;

    /// Remove a snapshot. Returns whether anything was removed.
    fn delete(&self, id: &str) -> Result<bool, StoreError>;

    fn list(&self) -> Result<Vec<Snapshot>, StoreError>;

    fn exists(&self, id: &str) -> Result<bool, StoreError>;

    /// All snapshots whose normalized title equals `normalize_title(title)`.
    fn find_by_title(&self, title: &str) -> Result<Vec<Snapshot>, StoreError>;

    fn count(&self) -> Result<usize, StoreError>;

    /// Run `ops` as a unit. Adapters without real transaction support run it
    /// directly; the engine only relies on single-snapshot atomicity.
    fn transaction(
        &self,
        ops: &mut dyn FnMut(&dyn StorageAdapter) -> Result<SnapshotId, StoreError>,
    ) -> Result<SnapshotId, StoreError>;

    /// Remove every snapshot.
    fn clear(&self) -> Result<(), StoreError>;
}

/// Title normalization used for conflict lookups and title indexing:
/// case-insensitive, surrounding-whitespace-insensitive.
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}
