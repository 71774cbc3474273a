//! Pending-resolution waitlist
//!
//! Multimap from a blocking key (usually a context-qualified variable) to the
//! records waiting on it. Records are never removed: every growth of the key's
//! points-to set re-runs all of them against the full current set.

use rustc_hash::{FxHashMap, FxHashSet};
use std::hash::Hash;

#[derive(Debug)]
pub struct Waitlist<K, V> {
    records: FxHashMap<K, Vec<V>>,
    registered: FxHashSet<(K, V)>,
}

impl<K, V> Default for Waitlist<K, V> {
    fn default() -> Self {
        Self {
            records: FxHashMap::default(),
            registered: FxHashSet::default(),
        }
    }
}

impl<K, V> Waitlist<K, V>
where
    K: Copy + Eq + Hash,
    V: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `(key, record)` was not registered before
    pub fn register(&mut self, key: K, record: V) -> bool {
        if !self.registered.insert((key, record.clone())) {
            return false;
        }
        self.records.entry(key).or_default().push(record);
        true
    }

    /// Records waiting on `key`, in registration order
    pub fn get(&self, key: &K) -> &[V] {
        self.records.get(key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.records.contains_key(key)
    }

    /// Total number of records
    pub fn len(&self) -> usize {
        self.registered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }
}
