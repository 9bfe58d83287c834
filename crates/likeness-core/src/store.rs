//! In-memory profile store with pluggable identifier allocation.
//!
//! Profiles live for the lifetime of the process only. Each id moves
//! `Absent -> Present` on create and back to `Absent` on delete.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use thiserror::Error;

use crate::profile::Profile;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("profile not found: {0}")]
    NotFound(String),
    #[error("id allocator returned live id {0}")]
    IdCollision(String),
}

/// Source of fresh profile identifiers.
pub trait IdAllocator: Send + Sync {
    fn allocate(&self) -> String;
}

/// Random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidAllocator;

impl IdAllocator for UuidAllocator {
    fn allocate(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Monotonic decimal counter starting at 1.
#[derive(Debug, Default)]
pub struct SequentialAllocator {
    next: AtomicU64,
}

impl IdAllocator for SequentialAllocator {
    fn allocate(&self) -> String {
        (self.next.fetch_add(1, Ordering::Relaxed) + 1).to_string()
    }
}

/// Thread-safe keyed store of [`Profile`]s.
///
/// Every operation holds the lock for its whole duration, so a delete racing
/// a get resolves to either the full profile or `NotFound`.
pub struct ProfileStore {
    profiles: RwLock<HashMap<String, Profile>>,
    ids: Box<dyn IdAllocator>,
}

impl ProfileStore {
    pub fn new(ids: Box<dyn IdAllocator>) -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
            ids,
        }
    }

    /// Store `profile` under a freshly allocated id and return the id.
    ///
    /// Allocation happens under the write lock; an allocator that hands out a
    /// live id is reported as [`StoreError::IdCollision`] instead of
    /// overwriting the existing entry.
    pub fn create(&self, profile: Profile) -> Result<String, StoreError> {
        let mut profiles = self.profiles.write().unwrap_or_else(PoisonError::into_inner);
        let id = self.ids.allocate();
        if profiles.contains_key(&id) {
            tracing::error!(id = %id, "id allocator collision");
            return Err(StoreError::IdCollision(id));
        }
        profiles.insert(id.clone(), profile);
        tracing::info!(id = %id, live = profiles.len(), "profile created");
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Result<Profile, StoreError> {
        let profiles = self.profiles.read().unwrap_or_else(PoisonError::into_inner);
        profiles
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut profiles = self.profiles.write().unwrap_or_else(PoisonError::into_inner);
        match profiles.remove(id) {
            Some(_) => {
                tracing::info!(id, live = profiles.len(), "profile deleted");
                Ok(())
            }
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.profiles.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self::new(Box::new(UuidAllocator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedding;
    use crate::landmarks::LandmarkDistances;
    use crate::texture::TextureHistogram;
    use std::collections::HashSet;

    fn dummy(seed: f64) -> Profile {
        let distances: LandmarkDistances = [("inter_eye".to_string(), seed)].into_iter().collect();
        Profile::new(
            distances,
            Embedding::new(vec![seed, 1.0]),
            TextureHistogram::from_bins(vec![0.5, 0.5]),
        )
    }

    /// Always returns the same id.
    struct StuckAllocator;

    impl IdAllocator for StuckAllocator {
        fn allocate(&self) -> String {
            "7".into()
        }
    }

    #[test]
    fn test_sequential_allocator_is_monotonic() {
        let ids = SequentialAllocator::default();
        assert_eq!(ids.allocate(), "1");
        assert_eq!(ids.allocate(), "2");
        assert_eq!(ids.allocate(), "3");
    }

    #[test]
    fn test_uuid_allocator_unique() {
        let ids = UuidAllocator;
        let seen: HashSet<String> = (0..1000).map(|_| ids.allocate()).collect();
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn test_create_get_delete() {
        let store = ProfileStore::new(Box::new(SequentialAllocator::default()));
        let p = dummy(3.0);
        let id = store.create(p.clone()).unwrap();
        assert_eq!(store.get(&id).unwrap(), p);
        assert_eq!(store.len(), 1);

        store.delete(&id).unwrap();
        assert_eq!(store.get(&id), Err(StoreError::NotFound(id.clone())));
        assert_eq!(store.delete(&id), Err(StoreError::NotFound(id)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_unknown_id() {
        let store = ProfileStore::default();
        assert!(matches!(store.get("nope"), Err(StoreError::NotFound(_))));
        assert!(matches!(store.delete("nope"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_collision_does_not_overwrite() {
        let store = ProfileStore::new(Box::new(StuckAllocator));
        let first = dummy(1.0);
        let id = store.create(first.clone()).unwrap();
        assert_eq!(
            store.create(dummy(2.0)),
            Err(StoreError::IdCollision("7".into()))
        );
        assert_eq!(store.get(&id).unwrap(), first);

        store.delete(&id).unwrap();
        assert_eq!(store.create(dummy(2.0)).unwrap(), "7");
    }
}
