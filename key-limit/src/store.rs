use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;

use tracing::debug;

/// Lazily-populated map from caller key to per-key limiter state.
///
/// Two-level locking: the outer `RwLock` guards only the map's structure, the
/// `Mutex` inside each entry guards that key's fields. The structural lock is
/// held just long enough to look up or insert an entry, so calls for
/// unrelated keys never serialize against each other.
///
/// Entries live for the lifetime of the store. Unbounded key cardinality
/// therefore grows memory without bound; callers choose the key granularity.
#[derive(Debug, Default)]
pub(crate) struct KeyedStore<S> {
    entries: RwLock<HashMap<String, Arc<Mutex<S>>>>,
}

impl<S> KeyedStore<S> {
    pub(crate) fn new() -> Self {
        KeyedStore {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the entry for `key`, creating it with `init` on first sight.
    ///
    /// The existence check and the insert happen as one atomic section under
    /// the structural write lock. Splitting them would let two callers racing
    /// on a fresh key each install a rival record, silently doubling the
    /// key's effective quota. `init` runs at most once per key.
    pub(crate) fn entry(&self, key: &str, init: impl FnOnce() -> S) -> Arc<Mutex<S>> {
        if let Some(entry) = self.entries.read().unwrap().get(key) {
            return Arc::clone(entry);
        }

        let mut entries = self.entries.write().unwrap();
        let entry = entries.entry(key.to_owned()).or_insert_with(|| {
            debug!(key, "creating limiter state for new key");
            Arc::new(Mutex::new(init()))
        });
        Arc::clone(entry)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_created_lazily() {
        let store: KeyedStore<usize> = KeyedStore::new();
        assert_eq!(store.len(), 0);

        let _ = store.entry("a", || 1);
        let _ = store.entry("b", || 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_same_key_shares_one_entry() {
        let store: KeyedStore<usize> = KeyedStore::new();

        let first = store.entry("a", || 1);
        let second = store.entry("a", || 99);

        assert!(Arc::ptr_eq(&first, &second));
        // init only ran for the first caller
        assert_eq!(*second.lock().unwrap(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_racing_creators_share_one_entry() {
        use std::sync::Barrier;
        use std::thread;

        let store: Arc<KeyedStore<usize>> = Arc::new(KeyedStore::new());
        let threads = 16;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|i| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store.entry("contested", move || i)
                })
            })
            .collect();

        let entries: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(store.len(), 1);
        for entry in &entries[1..] {
            assert!(Arc::ptr_eq(&entries[0], entry));
        }
    }

    #[test]
    fn test_distinct_keys_lock_independently() {
        let store: KeyedStore<usize> = KeyedStore::new();

        let a = store.entry("a", || 0);
        let b = store.entry("b", || 0);

        // Holding one key's lock must not block another key's.
        let guard_a = a.lock().unwrap();
        let guard_b = b.try_lock();
        assert!(guard_b.is_ok());
        drop(guard_a);
    }
}
