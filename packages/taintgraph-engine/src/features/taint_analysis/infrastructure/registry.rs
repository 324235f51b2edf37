//! The model registry
//!
//! Concurrent store of every method's current model. Workers read callee
//! models mid-analysis and write their own model once its local fixpoint
//! converges. Reads of a model that has not stabilized within the current
//! global round are a conservative lower bound, refined by later rounds.
//!
//! The map is sharded: concurrent access to different methods never blocks
//! on registry internals. Writes to the same method never interleave — the
//! scheduler runs at most one analysis per method at a time.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::features::taint_analysis::domain::{MethodId, Model};

/// Method -> model store. Models are immutable once published; `set`
/// replaces the whole entry atomically.
#[derive(Debug, Default)]
pub struct Registry {
    models: DashMap<MethodId, Arc<Model>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            models: DashMap::new(),
        }
    }

    /// The current model for a method. Never fails: an absent entry reads
    /// as the empty (bottom) model.
    pub fn get(&self, method: MethodId) -> Arc<Model> {
        self.models
            .get(&method)
            .map(|entry| Arc::clone(entry.value()))
            .unwrap_or_else(|| Arc::new(Model::empty(method)))
    }

    /// Atomically replace a method's model.
    pub fn set(&self, model: Model) {
        self.models.insert(model.method(), Arc::new(model));
    }

    /// Join a model into the store, e.g. when seeding declared models
    /// before the analysis starts.
    pub fn join_with(&self, model: Model) {
        match self.models.entry(model.method()) {
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(model));
            }
            Entry::Occupied(mut entry) => {
                let mut joined = (**entry.get()).clone();
                joined.join_with(&model);
                *entry.get_mut() = Arc::new(joined);
            }
        }
    }

    /// Number of stored models
    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Total number of issues across all models
    pub fn issue_count(&self) -> usize {
        self.models
            .iter()
            .map(|entry| entry.value().issues().len())
            .sum()
    }

    /// All models, sorted by method id for deterministic output.
    pub fn models(&self) -> Vec<Arc<Model>> {
        let mut models: Vec<Arc<Model>> = self
            .models
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        models.sort_by_key(|model| model.method());
        models
    }
}
