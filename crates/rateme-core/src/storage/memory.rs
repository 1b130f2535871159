//! In-process key-value backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::kv::{Edit, KeyValueStore, StoreValue, UpdateFn};
use crate::error::StoreError;

/// `HashMap`-backed store. Nothing survives the process.
///
/// Can be flipped into an unavailable state to exercise the
/// `StoreUnavailable` paths of callers.
#[derive(Debug)]
pub struct MemoryStore {
    namespace: String,
    entries: Mutex<HashMap<String, StoreValue>>,
    available: AtomicBool,
}

impl MemoryStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Drop every key, including the sticky flags. Models an external data wipe.
    pub fn wipe(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::unavailable(
                &self.namespace,
                "backing medium not accessible",
            ))
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn get(&self, key: &str) -> Result<Option<StoreValue>, StoreError> {
        self.check_available()?;
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).copied())
    }

    fn apply(&self, edits: &[Edit]) -> Result<(), StoreError> {
        self.check_available()?;
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        apply_edits(&mut entries, edits);
        Ok(())
    }

    fn update(&self, keys: &[&str], f: &mut UpdateFn<'_>) -> Result<(), StoreError> {
        self.check_available()?;
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let read: Vec<_> = keys.iter().map(|k| entries.get(*k).copied()).collect();
        let edits = f(&read)?;
        apply_edits(&mut entries, &edits);
        Ok(())
    }
}

fn apply_edits(entries: &mut HashMap<String, StoreValue>, edits: &[Edit]) {
    for edit in edits {
        match edit {
            Edit::Put(key, value) => {
                entries.insert(key.clone(), *value);
            }
            Edit::Remove(key) => {
                entries.remove(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_is_idempotent() {
        let store = MemoryStore::new("ns");
        store.edit().put_int("a", 1).commit().unwrap();
        store.edit().remove("a").commit().unwrap();
        store.edit().remove("a").commit().unwrap();
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn unavailable_store_fails_reads_and_writes() {
        let store = MemoryStore::new("ns");
        store.set_available(false);
        assert!(store.get("a").is_err());
        assert!(store.edit().put_int("a", 1).commit().is_err());

        store.set_available(true);
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn concurrent_updates_are_serialized() {
        let store = std::sync::Arc::new(MemoryStore::new("ns"));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        store
                            .update(&["n"], &mut |read| {
                                let n = match read[0] {
                                    Some(StoreValue::Int(n)) => n,
                                    _ => 0,
                                };
                                Ok(vec![Edit::Put("n".into(), StoreValue::Int(n + 1))])
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.get_int("n").unwrap(), Some(1000));
    }

    #[test]
    fn wipe_clears_everything() {
        let store = MemoryStore::new("ns");
        store
            .edit()
            .put_int("a", 1)
            .put_bool("b", true)
            .commit()
            .unwrap();
        store.wipe();
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap(), None);
    }
}
