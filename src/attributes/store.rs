//! # Shared Attribute Store
//!
//! A container-wide cache that lets several hosting units in one process share
//! a single environment and engine pipeline instead of bootstrapping twice.
//!
//! ## Concurrency Model
//!
//! The slot map lives behind an [`ArcSwap`] snapshot: readers load the current
//! snapshot without taking any lock. Populating an empty slot is serialized by a
//! mutex and re-checks the snapshot after acquiring it, so the factory runs at
//! most once per slot.
//!
//! ## Ownership
//!
//! Slots hold [`Weak`] references. The store never keeps a value alive; the
//! hosting units that created or fetched it do. A slot whose value has been
//! dropped reads as empty and is repopulated on the next request.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use arc_swap::ArcSwap;
use tracing::debug;

use super::error::AttributeError;

/// Slot holding the shared `RunningEnvironment`.
///
/// Other adapters in the same process may read this key. Not recommended
/// unless you are writing your own hosting adapter.
pub const ENVIRONMENT_ATTRIBUTE_KEY: &str = "_engine_host_application_environment_instance";

/// Slot holding the shared engine `ProcessingPipeline`.
pub const PIPELINE_ATTRIBUTE_KEY: &str = "_engine_host_application_pipeline_instance";

type Slot = Weak<dyn Any + Send + Sync>;

pub struct AttributeStore {
    slots: ArcSwap<HashMap<String, Slot>>,
    populate: Mutex<()>,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self {
            slots: ArcSwap::from_pointee(HashMap::new()),
            populate: Mutex::new(()),
        }
    }

    /// Returns the live value in `key`, if any.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Result<Option<Arc<T>>, AttributeError> {
        let Some(value) = self.slots.load().get(key).and_then(Weak::upgrade) else {
            return Ok(None);
        };
        value
            .downcast::<T>()
            .map(Some)
            .map_err(|_| AttributeError::TypeMismatch {
                key: key.to_owned(),
                expected: type_name::<T>(),
            })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.slots
            .load()
            .get(key)
            .is_some_and(|slot| slot.strong_count() > 0)
    }

    /// Number of slots holding a live value.
    pub fn len(&self) -> usize {
        self.slots
            .load()
            .values()
            .filter(|slot| slot.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the value in `key`, creating it with `factory` if the slot is empty.
    pub fn get_or_create<T, F>(&self, key: &str, factory: F) -> Result<Arc<T>, AttributeError>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        self.get_or_try_create(key, || Ok::<_, AttributeError>(Arc::new(factory())))
    }

    /// Fallible variant of [`get_or_create`](Self::get_or_create).
    ///
    /// The factory runs while the populate lock is held and must not call back
    /// into this store. If it fails nothing is stored and the error is returned.
    pub fn get_or_try_create<T, E, F>(&self, key: &str, factory: F) -> Result<Arc<T>, E>
    where
        T: Any + Send + Sync,
        E: From<AttributeError>,
        F: FnOnce() -> Result<Arc<T>, E>,
    {
        if let Some(existing) = self.get::<T>(key)? {
            return Ok(existing);
        }

        let _guard = self.populate.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = self.get::<T>(key)? {
            debug!(key, "Attribute populated concurrently");
            return Ok(existing);
        }

        let value = factory()?;
        let erased: Arc<dyn Any + Send + Sync> = value.clone();
        let mut next = HashMap::clone(&self.slots.load());
        next.insert(key.to_owned(), Arc::downgrade(&erased));
        self.slots.store(Arc::new(next));
        debug!(key, "Attribute populated");

        Ok(value)
    }
}

impl Default for AttributeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AttributeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeStore")
            .field("live_slots", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    #[test]
    fn test_first_factory_wins() {
        let store = AttributeStore::new();
        let second_called = AtomicUsize::new(0);

        let first = store.get_or_create("k", || String::from("first")).unwrap();
        let second = store
            .get_or_create("k", || {
                second_called.fetch_add(1, Ordering::SeqCst);
                String::from("second")
            })
            .unwrap();

        assert_eq!(*first, "first");
        assert_eq!(*second, "first");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second_called.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_type_mismatch() {
        let store = AttributeStore::new();
        let _held = store.get_or_create("k", || 42_u32).unwrap();

        let result = store.get::<String>("k");
        assert!(matches!(result, Err(AttributeError::TypeMismatch { .. })));
    }

    #[test]
    fn test_store_does_not_own_values() {
        let store = AttributeStore::new();
        let value = store.get_or_create("k", || 1_u8).unwrap();
        assert!(store.contains("k"));
        assert_eq!(store.len(), 1);

        drop(value);
        assert!(!store.contains("k"));
        assert!(store.get::<u8>("k").unwrap().is_none());

        let replaced = store.get_or_create("k", || 2_u8).unwrap();
        assert_eq!(*replaced, 2);
    }

    #[test]
    fn test_failed_factory_stores_nothing() {
        let store = AttributeStore::new();
        let result: Result<Arc<u8>, AttributeError> = store.get_or_try_create("k", || {
            Err(AttributeError::TypeMismatch {
                key: "k".into(),
                expected: "u8",
            })
        });
        assert!(result.is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_populate_runs_factory_once() {
        const THREADS: usize = 16;
        let store = Arc::new(AttributeStore::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let store = Arc::clone(&store);
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    store
                        .get_or_create("shared", || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            i
                        })
                        .unwrap()
                })
            })
            .collect();

        // Every thread holds its Arc until joined, so the slot stays live.
        let values: Vec<Arc<usize>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(values.iter().all(|v| Arc::ptr_eq(v, &values[0])));
    }
}
