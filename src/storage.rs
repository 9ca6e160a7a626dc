//! Thread-safe containers shared between sessions.
//!
//! Every container serializes its operations behind a single mutex. The lock
//! never escapes a method, so callers cannot hold it across socket I/O.
//! Sequences of calls (for example `is_empty` then `try_pop_front`) are not
//! atomic; callers must tolerate another thread acting in between.
//!
//! ```text
//! ValueCell<T>      one value, load/store
//! AppendList<T>     grows only, last_n(n)
//! SharedDeque<T>    push_back / push_front / try_pop_front
//! KeyedMap<K, V>    observe(key) creates on first access
//! ```

// Rust guideline compliant 2026-02

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// Lock a mutex, recovering the data if a previous holder panicked.
///
/// No method below can leave its container half-updated, so the data behind
/// a poisoned lock is still consistent.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Single shared value.
#[derive(Debug, Default)]
pub struct ValueCell<T> {
    inner: Mutex<T>,
}

impl<T: Clone> ValueCell<T> {
    /// Create a cell holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Return a copy of the current value.
    pub fn load(&self) -> T {
        lock(&self.inner).clone()
    }

    /// Replace the current value.
    pub fn store(&self, value: T) {
        *lock(&self.inner) = value;
    }
}

/// List that only grows.
#[derive(Debug)]
pub struct AppendList<T> {
    inner: Mutex<Vec<T>>,
}

impl<T> Default for AppendList<T> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Vec::new()),
        }
    }
}

impl<T: Clone> AppendList<T> {
    /// Append `item` at the end.
    pub fn append(&self, item: T) {
        lock(&self.inner).push(item);
    }

    /// Up to `n` most recent items, oldest first.
    pub fn last_n(&self, n: usize) -> Vec<T> {
        let items = lock(&self.inner);
        let start = items.len().saturating_sub(n);
        items[start..].to_vec()
    }

    /// Number of items appended so far.
    pub fn len(&self) -> usize {
        lock(&self.inner).len()
    }

    /// Returns true if nothing was ever appended.
    pub fn is_empty(&self) -> bool {
        lock(&self.inner).is_empty()
    }
}

/// Double-ended queue with front requeue.
#[derive(Debug)]
pub struct SharedDeque<T> {
    inner: Mutex<VecDeque<T>>,
}

impl<T> Default for SharedDeque<T> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }
}

impl<T> SharedDeque<T> {
    /// Remove and return the oldest item, if any.
    pub fn try_pop_front(&self) -> Option<T> {
        lock(&self.inner).pop_front()
    }

    /// Append `item` behind everything already queued.
    pub fn push_back(&self, item: T) {
        lock(&self.inner).push_back(item);
    }

    /// Put `item` ahead of everything already queued.
    pub fn push_front(&self, item: T) {
        lock(&self.inner).push_front(item);
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        lock(&self.inner).is_empty()
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        lock(&self.inner).len()
    }
}

/// Map whose values are created on first access and never removed.
///
/// Values are handed out as `Arc<V>` so a caller can keep using one after the
/// map lock is released. `V` is expected to carry its own interior locking.
#[derive(Debug)]
pub struct KeyedMap<K, V> {
    inner: Mutex<BTreeMap<K, Arc<V>>>,
}

impl<K, V> Default for KeyedMap<K, V> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(BTreeMap::new()),
        }
    }
}

impl<K: Ord + Clone, V: Default> KeyedMap<K, V> {
    /// Value for `key`, default-constructed if this is the first reference.
    pub fn observe(&self, key: &K) -> Arc<V> {
        let mut map = lock(&self.inner);
        if let Some(value) = map.get(key) {
            return Arc::clone(value);
        }
        let value = Arc::new(V::default());
        map.insert(key.clone(), Arc::clone(&value));
        value
    }

    /// Snapshot of the keys referenced so far, in sorted order.
    pub fn keys(&self) -> Vec<K> {
        lock(&self.inner).keys().cloned().collect()
    }

    /// Snapshot of every entry, in key order.
    pub fn entries(&self) -> Vec<(K, Arc<V>)> {
        lock(&self.inner)
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        lock(&self.inner).len()
    }

    /// True when no key was ever observed.
    pub fn is_empty(&self) -> bool {
        lock(&self.inner).is_empty()
    }
}
