//! Propagations
//!
//! A propagation records that taint entering a method at one port may leave
//! through another, e.g. from `Argument(1)` into the return value. The set
//! is a relation from input port to output port; feature sets on a pair
//! join.

use std::collections::{BTreeMap, BTreeSet};

use super::access_path::AccessPath;
use super::interners::FeatureId;

/// Relation from input port to output port.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationSet {
    map: BTreeMap<(AccessPath, AccessPath), BTreeSet<FeatureId>>,
}

impl PropagationSet {
    pub fn bottom() -> Self {
        Self::default()
    }

    pub fn is_bottom(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Record a propagation from `input` to `output`.
    pub fn add(
        &mut self,
        input: AccessPath,
        output: AccessPath,
        features: impl IntoIterator<Item = FeatureId>,
    ) {
        self.map
            .entry((input, output))
            .or_default()
            .extend(features);
    }

    /// Whether the relation contains the (input, output) pair.
    pub fn contains(&self, input: &AccessPath, output: &AccessPath) -> bool {
        self.map.contains_key(&(input.clone(), output.clone()))
    }

    /// The outputs reached from `input`, in port order.
    pub fn outputs(&self, input: &AccessPath) -> impl Iterator<Item = &AccessPath> {
        let input = input.clone();
        self.map
            .keys()
            .filter(move |(from, _)| *from == input)
            .map(|(_, to)| to)
    }

    /// Iterate over (input, output, features) entries.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&AccessPath, &AccessPath, &BTreeSet<FeatureId>)> {
        self.map
            .iter()
            .map(|((input, output), features)| (input, output, features))
    }

    /// Lattice join: union of pairs, union of features per pair.
    pub fn join_with(&mut self, other: &PropagationSet) {
        for (key, features) in &other.map {
            self.map
                .entry(key.clone())
                .or_default()
                .extend(features.iter().copied());
        }
    }

    /// Partial order: pair subset with feature subsets.
    pub fn leq(&self, other: &PropagationSet) -> bool {
        self.map.iter().all(|(key, features)| {
            other
                .map
                .get(key)
                .is_some_and(|other_features| features.is_subset(other_features))
        })
    }
}
