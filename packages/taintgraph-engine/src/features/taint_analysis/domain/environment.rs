//! The analysis environment
//!
//! Per-method dataflow state: a partition from abstract memory locations to
//! taint trees. An unbound location is bottom, the empty partition is the
//! bottom environment (unreached code), and `Top` stands for every location
//! maximally tainted.
//!
//! What a memory location denotes (a register, a parameter slot, a heap
//! abstraction) is decided by the instruction analyzer; the environment only
//! provides the lattice.

use rustc_hash::FxHashMap;

use super::access_path::Path;
use super::taint::Taint;
use super::taint_tree::{TaintTree, UpdateKind};

/// Opaque abstract memory location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemoryLocation(pub u32);

/// Map from abstract memory location to taint tree.
#[derive(Debug, Clone)]
pub enum Environment {
    /// Locations with non-bottom taint. The empty map is bottom.
    Value(FxHashMap<MemoryLocation, TaintTree>),

    /// Every location maximally tainted.
    Top,
}

impl Environment {
    /// The bottom environment: no locations bound.
    pub fn bottom() -> Self {
        Environment::Value(FxHashMap::default())
    }

    /// The initial environment at a method's entry (or exit, backward).
    /// Seed taint is written by the instruction analyzer.
    pub fn initial() -> Self {
        Self::bottom()
    }

    pub fn top() -> Self {
        Environment::Top
    }

    pub fn is_bottom(&self) -> bool {
        match self {
            Environment::Value(map) => map.is_empty(),
            Environment::Top => false,
        }
    }

    pub fn is_top(&self) -> bool {
        matches!(self, Environment::Top)
    }

    /// The taint tree at a location; bottom if unbound. The engine never
    /// materializes taint out of a top environment.
    pub fn read(&self, location: MemoryLocation) -> TaintTree {
        match self {
            Environment::Value(map) => map.get(&location).cloned().unwrap_or_default(),
            Environment::Top => {
                debug_assert!(false, "reading from a top environment");
                TaintTree::bottom()
            }
        }
    }

    /// The taint applying at a path below a location.
    pub fn read_path(&self, location: MemoryLocation, path: &Path) -> Taint {
        match self {
            Environment::Value(map) => map
                .get(&location)
                .map(|tree| tree.read_taint(path))
                .unwrap_or_default(),
            Environment::Top => {
                debug_assert!(false, "reading from a top environment");
                Taint::bottom()
            }
        }
    }

    /// Bind a location to a tree, dropping bottom bindings.
    pub fn set(&mut self, location: MemoryLocation, tree: TaintTree) {
        if let Environment::Value(map) = self {
            if tree.is_bottom() {
                map.remove(&location);
            } else {
                map.insert(location, tree);
            }
        }
    }

    /// Write taint at a path below a location.
    pub fn write(
        &mut self,
        location: MemoryLocation,
        path: &Path,
        taint: Taint,
        kind: UpdateKind,
    ) {
        if let Environment::Value(map) = self {
            let tree = map.entry(location).or_default();
            tree.write(path, taint, kind);
            if tree.is_bottom() {
                map.remove(&location);
            }
        }
    }

    /// Write a tree at a path below a location.
    pub fn write_tree(
        &mut self,
        location: MemoryLocation,
        path: &Path,
        subtree: TaintTree,
        kind: UpdateKind,
    ) {
        if let Environment::Value(map) = self {
            let tree = map.entry(location).or_default();
            tree.write_tree(path, subtree, kind);
            if tree.is_bottom() {
                map.remove(&location);
            }
        }
    }

    /// Pointwise join.
    pub fn join_with(&mut self, other: &Environment) {
        if self.is_top() {
            return;
        }
        if other.is_top() {
            *self = Environment::Top;
            return;
        }
        if let (Environment::Value(map), Environment::Value(other_map)) = (&mut *self, other) {
            for (location, other_tree) in other_map {
                map.entry(*location).or_default().join_with(other_tree);
            }
        }
    }

    /// Pointwise height-bounded join.
    pub fn widen_with(&mut self, other: &Environment, max_height: usize) {
        if self.is_top() {
            return;
        }
        if other.is_top() {
            *self = Environment::Top;
            return;
        }
        if let (Environment::Value(map), Environment::Value(other_map)) = (&mut *self, other) {
            for (location, other_tree) in other_map {
                map.entry(*location)
                    .or_default()
                    .widen_with(other_tree, max_height);
            }
        }
    }

    /// Pointwise partial order, unbound locations reading as bottom.
    pub fn leq(&self, other: &Environment) -> bool {
        match (self, other) {
            (_, Environment::Top) => true,
            (Environment::Top, _) => false,
            (Environment::Value(map), Environment::Value(other_map)) => {
                let bottom = TaintTree::bottom();
                map.iter()
                    .all(|(location, tree)| tree.leq(other_map.get(location).unwrap_or(&bottom)))
            }
        }
    }

    /// Iterate over bound locations, in unspecified order.
    pub fn locations(&self) -> impl Iterator<Item = (MemoryLocation, &TaintTree)> {
        let map = match self {
            Environment::Value(map) => Some(map),
            Environment::Top => None,
        };
        map.into_iter()
            .flat_map(|map| map.iter().map(|(location, tree)| (*location, tree)))
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::bottom()
    }
}

impl PartialEq for Environment {
    fn eq(&self, other: &Self) -> bool {
        self.leq(other) && other.leq(self)
    }
}

impl Eq for Environment {}
