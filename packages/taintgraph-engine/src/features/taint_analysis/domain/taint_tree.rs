//! The taint tree domain
//!
//! A taint tree attaches taint to the substructure of a value: each node
//! carries its own taint and a map from field selector to subtree. Taint on
//! a node implicitly applies to all of its descendants ("read semantics"),
//! and trees are kept in normal form: a child never stores a frame its
//! ancestors already cover.
//!
//! Nodes are immutable and reference counted. Clones share structure; a
//! mutation copies only the nodes along the modified spine, so branching and
//! joining environments during fixpoint iteration stays cheap.
//!
//! Widening bounds the height of the tree: subtrees deeper than the
//! configured maximum collapse into a single leaf joining all descendant
//! taint. This is what guarantees the ascending-chain property on deeply
//! nested and recursive object graphs.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::access_path::{FieldId, Path};
use super::taint::Taint;

/// How a write combines with existing information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// Replace: previous elements at and below the path are discarded.
    Strong,

    /// Join: elements are merged, descendants are preserved.
    Weak,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct TreeNode {
    elements: Taint,
    children: BTreeMap<FieldId, TaintTree>,
}

/// Recursive map from paths to taint, with structural sharing.
#[derive(Debug, Clone, Default)]
pub struct TaintTree {
    node: Arc<TreeNode>,
}

impl TaintTree {
    /// The bottom (empty) tree
    pub fn bottom() -> Self {
        Self::default()
    }

    /// A single node carrying the given taint
    pub fn leaf(taint: Taint) -> Self {
        Self {
            node: Arc::new(TreeNode {
                elements: taint,
                children: BTreeMap::new(),
            }),
        }
    }

    pub fn is_bottom(&self) -> bool {
        self.node.elements.is_bottom() && self.node.children.is_empty()
    }

    /// The taint stored on this node, without ancestor or descendant
    /// contributions.
    pub fn root_elements(&self) -> &Taint {
        &self.node.elements
    }

    /// The edges to child subtrees
    pub fn children(&self) -> &BTreeMap<FieldId, TaintTree> {
        &self.node.children
    }

    fn node_mut(&mut self) -> &mut TreeNode {
        Arc::make_mut(&mut self.node)
    }

    /// Height of the tree: a single node has height zero.
    pub fn height(&self) -> usize {
        self.node
            .children
            .values()
            .map(|subtree| 1 + subtree.height())
            .max()
            .unwrap_or(0)
    }

    /// Join of all taint in the tree
    pub fn collapse(&self) -> Taint {
        let mut elements = Taint::bottom();
        self.collapse_into(&mut elements);
        elements
    }

    /// Join all taint in the tree into `elements`
    pub fn collapse_into(&self, elements: &mut Taint) {
        elements.join_with(&self.node.elements);
        for subtree in self.node.children.values() {
            subtree.collapse_into(elements);
        }
    }

    /// Collapse the tree into a single node, in place
    pub fn collapse_inplace(&mut self) {
        if self.node.children.is_empty() {
            return;
        }
        let node = self.node_mut();
        let mut elements = std::mem::take(&mut node.elements);
        for subtree in node.children.values() {
            subtree.collapse_into(&mut elements);
        }
        node.elements = elements;
        node.children.clear();
    }

    /// Collapse every subtree deeper than `height` into a leaf
    pub fn collapse_deeper_than(&mut self, height: usize) {
        if height == 0 {
            self.collapse_inplace();
            return;
        }
        if self.node.children.is_empty() {
            return;
        }
        let node = self.node_mut();
        for subtree in node.children.values_mut() {
            subtree.collapse_deeper_than(height - 1);
        }
    }

    /// Whether every frame in this tree is already covered by `ancestors`
    fn covered_by(&self, ancestors: &Taint) -> bool {
        self.collapse().leq(ancestors)
    }

    /// Remove elements covered by `accumulator`, recursively
    fn prune(&mut self, mut accumulator: Taint) {
        let node = self.node_mut();
        node.elements.difference_with(&accumulator);
        accumulator.join_with(&node.elements);
        for subtree in node.children.values_mut() {
            subtree.prune(accumulator.clone());
        }
        node.children.retain(|_, subtree| !subtree.is_bottom());
    }

    /// Read the subtree at `path`. Taint on ancestors propagates down, so
    /// the returned tree's root carries the taint that applies at the exact
    /// node plus every ancestor contribution.
    pub fn read(&self, path: &Path) -> TaintTree {
        self.read_internal(path.elements())
    }

    fn read_internal(&self, path: &[FieldId]) -> TaintTree {
        let Some((head, rest)) = path.split_first() else {
            return self.clone();
        };
        match self.node.children.get(head) {
            // Nothing below: only the ancestors' taint applies, at any depth.
            None => TaintTree::leaf(self.node.elements.clone()),
            Some(subtree) => {
                let mut copy = subtree.clone();
                copy.node_mut().elements.join_with(&self.node.elements);
                copy.read_internal(rest)
            }
        }
    }

    /// The taint applying at `path`: the node's own taint joined with all
    /// ancestor contributions. Reading a non-existent path returns the
    /// ancestors' taint; reading in an empty tree returns bottom.
    pub fn read_taint(&self, path: &Path) -> Taint {
        self.read(path).root_elements().clone()
    }

    /// Read the subtree at `path` without propagating ancestors down
    pub fn raw_read(&self, path: &Path) -> TaintTree {
        let mut current = self.clone();
        for element in path.iter() {
            let next = match current.node.children.get(element) {
                Some(subtree) => subtree.clone(),
                None => return TaintTree::bottom(),
            };
            current = next;
        }
        current
    }

    /// Write taint at `path`, creating intermediate nodes as needed.
    pub fn write(&mut self, path: &Path, taint: Taint, kind: UpdateKind) {
        self.write_taint_internal(path.elements(), taint, Taint::bottom(), kind);
    }

    fn write_taint_internal(
        &mut self,
        path: &[FieldId],
        mut taint: Taint,
        mut accumulator: Taint,
        kind: UpdateKind,
    ) {
        let Some((head, rest)) = path.split_first() else {
            match kind {
                UpdateKind::Strong => {
                    let node = self.node_mut();
                    node.elements = taint;
                    node.children.clear();
                }
                UpdateKind::Weak => {
                    let node = self.node_mut();
                    node.elements.join_with(&taint);
                    accumulator.join_with(&node.elements);
                    for subtree in node.children.values_mut() {
                        subtree.prune(accumulator.clone());
                    }
                    node.children.retain(|_, subtree| !subtree.is_bottom());
                }
            }
            return;
        };

        accumulator.join_with(&self.node.elements);
        taint.difference_with(&accumulator);
        if taint.is_bottom() && kind == UpdateKind::Weak {
            return;
        }

        let node = self.node_mut();
        let child_is_bottom = {
            let child = node.children.entry(*head).or_default();
            child.write_taint_internal(rest, taint, accumulator, kind);
            child.is_bottom()
        };
        if child_is_bottom {
            node.children.remove(head);
        }
    }

    /// Write a whole tree at `path`.
    pub fn write_tree(&mut self, path: &Path, tree: TaintTree, kind: UpdateKind) {
        self.write_tree_internal(path.elements(), tree, Taint::bottom(), kind);
    }

    fn write_tree_internal(
        &mut self,
        path: &[FieldId],
        tree: TaintTree,
        mut accumulator: Taint,
        kind: UpdateKind,
    ) {
        let Some((head, rest)) = path.split_first() else {
            match kind {
                UpdateKind::Strong => {
                    *self = tree;
                    self.prune(accumulator);
                }
                UpdateKind::Weak => {
                    self.join_with_internal(&tree, &accumulator);
                }
            }
            return;
        };

        accumulator.join_with(&self.node.elements);

        let node = self.node_mut();
        let child_is_bottom = {
            let child = node.children.entry(*head).or_default();
            child.write_tree_internal(rest, tree, accumulator, kind);
            child.is_bottom()
        };
        if child_is_bottom {
            node.children.remove(head);
        }
    }

    /// Pointwise recursive join.
    ///
    /// Joining a leaf with a subtree keeps the subtree's children; the
    /// leaf's taint applies at the root (and thus, implicitly, to every
    /// descendant).
    pub fn join_with(&mut self, other: &TaintTree) {
        if other.is_bottom() {
            return;
        }
        if self.is_bottom() {
            *self = other.clone();
            return;
        }
        self.join_with_internal(other, &Taint::bottom());
    }

    fn join_with_internal(&mut self, other: &TaintTree, accumulator: &Taint) {
        let node = self.node_mut();
        node.elements.join_with(&other.node.elements);
        node.elements.difference_with(accumulator);

        let mut ancestors = accumulator.clone();
        ancestors.join_with(&node.elements);

        for (element, other_subtree) in other.node.children.iter() {
            match node.children.get_mut(element) {
                Some(subtree) => {
                    subtree.join_with_internal(other_subtree, &ancestors);
                }
                None => {
                    if !other_subtree.covered_by(&ancestors) {
                        node.children.insert(*element, other_subtree.clone());
                    }
                }
            }
        }

        node.children.retain(|element, subtree| {
            if subtree.is_bottom() {
                return false;
            }
            // A subtree only present on our side is dropped once the joined
            // ancestors cover it.
            other.node.children.contains_key(element) || !subtree.covered_by(&ancestors)
        });
    }

    /// Join bounded by `max_height`: subtrees beyond the maximum height
    /// collapse into a single leaf summarizing all descendant taint. Applied
    /// after every join during fixpoint iteration, this bounds growth on
    /// recursive data structures.
    pub fn widen_with(&mut self, other: &TaintTree, max_height: usize) {
        self.join_with(other);
        self.collapse_deeper_than(max_height);
    }

    /// Partial order under read semantics: ancestors count towards their
    /// descendants on both sides.
    pub fn leq(&self, other: &TaintTree) -> bool {
        self.leq_internal(&Taint::bottom(), other, &Taint::bottom())
    }

    fn leq_internal(
        &self,
        self_ancestors: &Taint,
        other: &TaintTree,
        other_ancestors: &Taint,
    ) -> bool {
        let mut self_value = self.node.elements.clone();
        self_value.join_with(self_ancestors);
        let mut other_value = other.node.elements.clone();
        other_value.join_with(other_ancestors);

        if !self_value.leq(&other_value) {
            return false;
        }

        let bottom = TaintTree::bottom();
        self.node.children.iter().all(|(element, subtree)| {
            let other_subtree = other.node.children.get(element).unwrap_or(&bottom);
            subtree.leq_internal(&self_value, other_subtree, &other_value)
        })
        // Children only present in `other` can only add taint; nothing to
        // check on our side.
    }

    /// Collapse at the depth where the tree would exceed `max_leaves`
    pub fn limit_leaves(&mut self, max_leaves: usize) {
        if let Some(depth) = self.depth_exceeding_max_leaves(max_leaves) {
            self.collapse_deeper_than(depth);
        }
    }

    /// Depth at which the number of leaves exceeds `max_leaves`, if any.
    /// Breadth-first, mirroring the order in which a collapse would fold.
    fn depth_exceeding_max_leaves(&self, max_leaves: usize) -> Option<usize> {
        let mut trees: Vec<&TaintTree> = vec![self];
        let mut remaining = max_leaves;
        let mut depth = 0;

        while !trees.is_empty() {
            let mut deeper: Vec<&TaintTree> = Vec::new();

            for tree in &trees {
                for subtree in tree.node.children.values() {
                    if subtree.node.children.is_empty() {
                        if remaining == 0 {
                            return Some(depth);
                        }
                        remaining -= 1;
                    } else {
                        deeper.push(subtree);
                    }
                }
            }

            if deeper.len() > remaining {
                return Some(depth);
            }
            depth += 1;
            trees = deeper;
        }

        None
    }

    /// All non-empty (path, taint) pairs. Taint does not include ancestor
    /// contributions.
    pub fn elements(&self) -> Vec<(Path, Taint)> {
        let mut results = Vec::new();
        let mut path = Path::new();
        self.visit_internal(&mut path, &mut |p: &Path, t: &Taint| {
            results.push((p.clone(), t.clone()));
        });
        results
    }

    fn visit_internal(&self, path: &mut Path, visitor: &mut impl FnMut(&Path, &Taint)) {
        if !self.node.elements.is_bottom() {
            visitor(path, &self.node.elements);
        }
        for (element, subtree) in self.node.children.iter() {
            path.append(*element);
            subtree.visit_internal(path, visitor);
            path.pop_back();
        }
    }
}

impl PartialEq for TaintTree {
    /// Semantic equality under read semantics. Two trees are equal when they
    /// denote the same taint at every path, regardless of where on the
    /// ancestor chain a frame is stored.
    fn eq(&self, other: &Self) -> bool {
        self.leq(other) && other.leq(self)
    }
}

impl Eq for TaintTree {}
