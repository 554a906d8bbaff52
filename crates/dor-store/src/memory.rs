use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use dor_types::Pid;
use tracing::trace;

use crate::error::{StoreError, StoreResult};
use crate::traits::ObjectStore;

/// In-memory, `BTreeMap`-based object store.
///
/// Intended for tests and embedding. Bytes are held behind a `RwLock` and
/// cloned on read and write.
pub struct InMemoryObjectStore {
    objects: RwLock<BTreeMap<Pid, Vec<u8>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    fn read_lock(&self) -> StoreResult<RwLockReadGuard<'_, BTreeMap<Pid, Vec<u8>>>> {
        self.objects.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write_lock(&self) -> StoreResult<RwLockWriteGuard<'_, BTreeMap<Pid, Vec<u8>>>> {
        self.objects.write().map_err(|_| StoreError::LockPoisoned)
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read_lock()?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.read_lock()?.is_empty())
    }

    /// Total bytes across all stored objects.
    pub fn total_bytes(&self) -> StoreResult<u64> {
        Ok(self.read_lock()?.values().map(|b| b.len() as u64).sum())
    }

    pub fn clear(&self) -> StoreResult<()> {
        self.write_lock()?.clear();
        Ok(())
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn read(&self, pid: &Pid) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.read_lock()?.get(pid).cloned())
    }

    fn write(&self, pid: &Pid, bytes: &[u8]) -> StoreResult<()> {
        trace!(pid = %pid, bytes = bytes.len(), "store write");
        self.write_lock()?.insert(pid.clone(), bytes.to_vec());
        Ok(())
    }

    fn exists(&self, pid: &Pid) -> StoreResult<bool> {
        Ok(self.read_lock()?.contains_key(pid))
    }

    fn delete(&self, pid: &Pid) -> StoreResult<bool> {
        trace!(pid = %pid, "store delete");
        Ok(self.write_lock()?.remove(pid).is_some())
    }

    fn pids(&self) -> StoreResult<Vec<Pid>> {
        Ok(self.read_lock()?.keys().cloned().collect())
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.objects.read().map(|m| m.len()).ok();
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn pid(s: &str) -> Pid {
        Pid::new(s).unwrap()
    }

    #[test]
    fn write_and_read() {
        let store = InMemoryObjectStore::new();
        store.write(&pid("demo:1"), b"<object/>").unwrap();
        assert_eq!(store.read(&pid("demo:1")).unwrap(), Some(b"<object/>".to_vec()));
    }

    #[test]
    fn write_replaces_previous_bytes() {
        let store = InMemoryObjectStore::new();
        store.write(&pid("demo:1"), b"v1").unwrap();
        store.write(&pid("demo:1"), b"version two").unwrap();
        assert_eq!(store.read_existing(&pid("demo:1")).unwrap(), b"version two".to_vec());
        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(store.total_bytes().unwrap(), 11);
    }

    #[test]
    fn missing_object() {
        let store = InMemoryObjectStore::new();
        assert_eq!(store.read(&pid("demo:404")).unwrap(), None);
        assert!(!store.exists(&pid("demo:404")).unwrap());
        assert!(matches!(
            store.read_existing(&pid("demo:404")),
            Err(StoreError::NotFound(p)) if p.as_str() == "demo:404"
        ));
    }

    #[test]
    fn delete_present_and_missing() {
        let store = InMemoryObjectStore::new();
        store.write(&pid("demo:1"), b"x").unwrap();
        assert!(store.delete(&pid("demo:1")).unwrap());
        assert!(!store.delete(&pid("demo:1")).unwrap());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn pids_are_sorted() {
        let store = InMemoryObjectStore::new();
        for p in ["demo:3", "demo:1", "abc:9"] {
            store.write(&pid(p), b"x").unwrap();
        }
        let pids: Vec<String> = store.pids().unwrap().iter().map(|p| p.as_str().to_string()).collect();
        assert_eq!(pids, vec!["abc:9", "demo:1", "demo:3"]);
        store.clear().unwrap();
        assert!(store.pids().unwrap().is_empty());
    }

    #[test]
    fn concurrent_reads_are_safe() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.write(&pid("demo:1"), b"shared").unwrap();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.read_existing(&Pid::new("demo:1").unwrap()).unwrap())
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), b"shared".to_vec());
        }
    }

    #[test]
    fn debug_format() {
        let store = InMemoryObjectStore::default();
        assert!(format!("{store:?}").contains("object_count"));
    }
}
