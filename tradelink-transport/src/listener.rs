//! Multi-slot listener registry with disposers.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};
use tracing::{error, warn};

/// Callback stored in a [`ListenerRegistry`].
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registration<T> {
    callback: Listener<T>,
    owner: String,
    registered_at: DateTime<Utc>,
}

struct Inner<T> {
    next_id: u64,
    entries: BTreeMap<u64, Registration<T>>,
}

/// Registered listener counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerStats {
    /// All registrations.
    pub total: usize,
    /// Registrations per owner label.
    pub by_owner: BTreeMap<String, usize>,
    /// When the longest-lived registration was made.
    pub oldest: Option<DateTime<Utc>>,
}

/// Fan-out of one event category to many observers.
///
/// Every registration gets its own id, so registering the same callback
/// twice yields two independent registrations. Callbacks run in
/// registration order; a panicking callback is logged and skipped.
pub struct ListenerRegistry<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for ListenerRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for ListenerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for ListenerRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

impl<T> ListenerRegistry<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_id: 0,
                entries: BTreeMap::new(),
            })),
        }
    }

    /// Registers a callback under `owner`.
    ///
    /// A missing callback yields a disposer that does nothing.
    pub fn register(&self, callback: Option<Listener<T>>, owner: &str) -> Disposer<T> {
        let Some(callback) = callback else {
            warn!(owner, "ignoring registration without a callback");
            return Disposer::noop();
        };

        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.entries.insert(
            id,
            Registration {
                callback,
                owner: owner.to_string(),
                registered_at: Utc::now(),
            },
        );
        Disposer {
            registry: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Invokes every callback with `event`.
    ///
    /// The lock is released before callbacks run, so a callback may register
    /// or dispose listeners.
    pub fn emit(&self, event: &T) -> usize {
        let callbacks: Vec<(String, Listener<T>)> = self
            .inner
            .lock()
            .entries
            .values()
            .map(|reg| (reg.owner.clone(), Arc::clone(&reg.callback)))
            .collect();

        for (owner, callback) in &callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                error!(owner = %owner, "listener panicked; continuing with the rest");
            }
        }
        callbacks.len()
    }

    /// Removes every registration.
    pub fn clear_all(&self) {
        self.inner.lock().entries.clear();
    }

    /// Number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counts registrations; warns when the total exceeds `warn_threshold`.
    #[must_use]
    pub fn stats(&self, warn_threshold: usize) -> ListenerStats {
        let inner = self.inner.lock();
        let mut by_owner = BTreeMap::new();
        for reg in inner.entries.values() {
            *by_owner.entry(reg.owner.clone()).or_insert(0) += 1;
        }
        let stats = ListenerStats {
            total: inner.entries.len(),
            by_owner,
            oldest: inner.entries.values().map(|reg| reg.registered_at).min(),
        };
        if stats.total > warn_threshold {
            warn!(
                total = stats.total,
                threshold = warn_threshold,
                owners = ?stats.by_owner,
                "listener count above threshold, possible registration leak"
            );
        }
        stats
    }
}

/// Removes exactly one registration. Disposing twice is harmless.
pub struct Disposer<T> {
    registry: Weak<Mutex<Inner<T>>>,
    id: u64,
}

impl<T> Disposer<T> {
    fn noop() -> Self {
        Self {
            registry: Weak::new(),
            id: u64::MAX,
        }
    }

    /// Removes the registration. Returns true the first time.
    pub fn dispose(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|inner| inner.lock().entries.remove(&self.id).is_some())
    }
}

impl<T> std::fmt::Debug for Disposer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disposer").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, Listener<u32>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let listener: Listener<u32> = Arc::new(move |_: &u32| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (count, listener)
    }

    #[test]
    fn test_same_callback_twice_then_dispose_one() {
        let registry = ListenerRegistry::new();
        let (count, listener) = counter();

        let first = registry.register(Some(Arc::clone(&listener)), "dashboard");
        let _second = registry.register(Some(listener), "timeline");

        registry.emit(&1);
        assert_eq!(count.load(Ordering::SeqCst), 2);

        assert!(first.dispose());
        registry.emit(&2);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let registry = ListenerRegistry::new();
        let (_, listener) = counter();
        let disposer = registry.register(Some(listener), "a");
        assert!(disposer.dispose());
        assert!(!disposer.dispose());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_missing_callback_is_noop() {
        let registry: ListenerRegistry<u32> = ListenerRegistry::new();
        let disposer = registry.register(None, "nobody");
        assert!(registry.is_empty());
        assert!(!disposer.dispose());
        assert_eq!(registry.emit(&1), 0);
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let registry: ListenerRegistry<u32> = ListenerRegistry::new();
        let (count, listener) = counter();
        let faulty: Listener<u32> = Arc::new(|_: &u32| panic!("boom"));
        registry.register(Some(faulty), "faulty");
        registry.register(Some(listener), "healthy");

        assert_eq!(registry.emit(&7), 2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_stats_by_owner() {
        let registry = ListenerRegistry::new();
        for owner in ["a", "a", "b"] {
            let (_, listener) = counter();
            registry.register(Some(listener), owner);
        }
        let stats = registry.stats(1);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_owner.get("a"), Some(&2));
        assert_eq!(stats.by_owner.get("b"), Some(&1));
        assert!(stats.oldest.is_some());
    }

    #[test]
    fn test_clear_all_and_dangling_disposer() {
        let registry = ListenerRegistry::new();
        let (count, listener) = counter();
        let disposer = registry.register(Some(listener), "a");
        registry.clear_all();
        registry.emit(&1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!disposer.dispose());

        drop(registry);
        assert!(!disposer.dispose());
    }

    #[test]
    fn test_listener_may_dispose_itself_during_emit() {
        let registry: ListenerRegistry<u32> = ListenerRegistry::new();
        let slot: Arc<Mutex<Option<Disposer<u32>>>> = Arc::new(Mutex::new(None));
        let inner_slot = Arc::clone(&slot);
        let once: Listener<u32> = Arc::new(move |_: &u32| {
            if let Some(d) = inner_slot.lock().as_ref() {
                d.dispose();
            }
        });
        let disposer = registry.register(Some(once), "once");
        *slot.lock() = Some(disposer);

        registry.emit(&1);
        assert!(registry.is_empty());
    }
}
