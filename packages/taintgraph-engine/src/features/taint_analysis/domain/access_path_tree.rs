//! Access path tree domain
//!
//! A map from roots (return value, arguments) to taint trees. This is the
//! shape of a model's generations, parameter sources and sinks: taint
//! attached to positions within each port's structure.

use std::collections::BTreeMap;

use super::access_path::{AccessPath, Root};
use super::taint::Taint;
use super::taint_tree::{TaintTree, UpdateKind};

/// Per-root taint trees. Bottom trees are never stored.
#[derive(Debug, Clone, Default)]
pub struct TaintAccessPathTree {
    map: BTreeMap<Root, TaintTree>,
}

impl TaintAccessPathTree {
    pub fn bottom() -> Self {
        Self::default()
    }

    pub fn is_bottom(&self) -> bool {
        self.map.is_empty()
    }

    /// The tree at a root; bottom if unbound.
    pub fn read_root(&self, root: Root) -> TaintTree {
        self.map.get(&root).cloned().unwrap_or_default()
    }

    /// The subtree at an access path, with ancestor taint propagated down.
    pub fn read(&self, access_path: &AccessPath) -> TaintTree {
        match self.map.get(&access_path.root()) {
            Some(tree) => tree.read(access_path.path()),
            None => TaintTree::bottom(),
        }
    }

    /// The taint applying at an access path.
    pub fn read_taint(&self, access_path: &AccessPath) -> Taint {
        match self.map.get(&access_path.root()) {
            Some(tree) => tree.read_taint(access_path.path()),
            None => Taint::bottom(),
        }
    }

    /// Write taint at an access path.
    pub fn write(&mut self, access_path: &AccessPath, taint: Taint, kind: UpdateKind) {
        let tree = self.map.entry(access_path.root()).or_default();
        tree.write(access_path.path(), taint, kind);
        if tree.is_bottom() {
            self.map.remove(&access_path.root());
        }
    }

    /// Write a tree at an access path.
    pub fn write_tree(&mut self, access_path: &AccessPath, subtree: TaintTree, kind: UpdateKind) {
        let tree = self.map.entry(access_path.root()).or_default();
        tree.write_tree(access_path.path(), subtree, kind);
        if tree.is_bottom() {
            self.map.remove(&access_path.root());
        }
    }

    /// Pointwise join.
    pub fn join_with(&mut self, other: &TaintAccessPathTree) {
        for (root, other_tree) in &other.map {
            self.map.entry(*root).or_default().join_with(other_tree);
        }
    }

    /// Pointwise height-bounded join.
    pub fn widen_with(&mut self, other: &TaintAccessPathTree, max_height: usize) {
        for (root, other_tree) in &other.map {
            self.map
                .entry(*root)
                .or_default()
                .widen_with(other_tree, max_height);
        }
    }

    /// Pointwise partial order, missing roots reading as bottom.
    pub fn leq(&self, other: &TaintAccessPathTree) -> bool {
        let bottom = TaintTree::bottom();
        self.map
            .iter()
            .all(|(root, tree)| tree.leq(other.map.get(root).unwrap_or(&bottom)))
    }

    /// All non-empty (access path, taint) pairs, in root order.
    pub fn elements(&self) -> Vec<(AccessPath, Taint)> {
        let mut results = Vec::new();
        for (root, tree) in &self.map {
            for (path, taint) in tree.elements() {
                results.push((AccessPath::new(*root, path), taint));
            }
        }
        results
    }

    /// Iterate over the bound roots and their trees.
    pub fn iter(&self) -> impl Iterator<Item = (Root, &TaintTree)> {
        self.map.iter().map(|(root, tree)| (*root, tree))
    }

    /// Collapse any tree that would exceed `max_leaves` leaves.
    pub fn limit_leaves(&mut self, max_leaves: usize) {
        for tree in self.map.values_mut() {
            tree.limit_leaves(max_leaves);
        }
    }
}

impl PartialEq for TaintAccessPathTree {
    fn eq(&self, other: &Self) -> bool {
        self.leq(other) && other.leq(self)
    }
}

impl Eq for TaintAccessPathTree {}
