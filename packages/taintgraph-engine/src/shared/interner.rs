//! Concurrent interning service
//!
//! Values that the engine compares and shares by identity (methods, kinds,
//! field names, features) are interned once and handled through small stable
//! ids. Insertion is insert-or-return-existing and safe under concurrency;
//! resolution after insertion is read-only.
//!
//! This is an explicit service owned by the embedder and passed by reference
//! into the engine, not a process-wide singleton.

use std::hash::Hash;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;

/// Insert-or-get interner with stable `u32` handles.
///
/// The forward map assigns ids; the reverse table resolves them. Ids are
/// dense and assigned in first-insertion order, which makes them usable as
/// deterministic sort keys for a fixed insertion sequence.
pub struct Interner<T> {
    ids: DashMap<T, u32>,
    items: RwLock<Vec<T>>,
}

impl<T: Clone + Eq + Hash> Interner<T> {
    /// Create an empty interner
    pub fn new() -> Self {
        Self {
            ids: DashMap::new(),
            items: RwLock::new(Vec::new()),
        }
    }

    /// Intern a value, returning its id. The first inserter wins; all
    /// concurrent callers observe the same id.
    pub fn intern(&self, value: T) -> u32 {
        if let Some(id) = self.ids.get(&value) {
            return *id;
        }
        match self.ids.entry(value.clone()) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                // The shard lock held by the vacant entry serializes id
                // assignment for this value.
                let mut items = self.items.write();
                let id = items.len() as u32;
                items.push(value);
                entry.insert(id);
                id
            }
        }
    }

    /// Resolve an id back to its value.
    ///
    /// Ids are only produced by `intern`, so resolution cannot miss.
    pub fn resolve(&self, id: u32) -> T {
        self.items.read()[id as usize].clone()
    }

    /// Number of interned values
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Whether the interner is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Eq + Hash> Default for Interner<T> {
    fn default() -> Self {
        Self::new()
    }
}
