//! Taint frames
//!
//! A frame is one taint fact: a kind, the hop distance to the closest
//! source or sink, the features accumulated along the trace, the origin
//! methods the taint leaked from, and an optional chain of transforms the
//! value passed through.

use std::collections::BTreeSet;

use super::interners::{FeatureId, MethodId};
use super::kind::KindId;

/// One taint fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Frame {
    kind: KindId,
    distance: u32,
    features: BTreeSet<FeatureId>,
    origins: BTreeSet<MethodId>,
    transforms: Vec<KindId>,
}

impl Frame {
    /// Create a leaf frame: distance zero, no metadata.
    pub fn leaf(kind: KindId) -> Self {
        Self {
            kind,
            distance: 0,
            features: BTreeSet::new(),
            origins: BTreeSet::new(),
            transforms: Vec::new(),
        }
    }

    /// Create a frame with an explicit distance
    pub fn with_distance(kind: KindId, distance: u32) -> Self {
        Self {
            distance,
            ..Self::leaf(kind)
        }
    }

    pub fn kind(&self) -> KindId {
        self.kind
    }

    pub fn distance(&self) -> u32 {
        self.distance
    }

    pub fn features(&self) -> &BTreeSet<FeatureId> {
        &self.features
    }

    pub fn origins(&self) -> &BTreeSet<MethodId> {
        &self.origins
    }

    pub fn transforms(&self) -> &[KindId] {
        &self.transforms
    }

    /// Add a feature tag
    pub fn add_feature(&mut self, feature: FeatureId) {
        self.features.insert(feature);
    }

    /// Add several feature tags
    pub fn add_features(&mut self, features: impl IntoIterator<Item = FeatureId>) {
        self.features.extend(features);
    }

    /// Add an origin method
    pub fn add_origin(&mut self, origin: MethodId) {
        self.origins.insert(origin);
    }

    /// Replace the origin set
    pub fn set_origins(&mut self, origins: BTreeSet<MethodId>) {
        self.origins = origins;
    }

    /// Append a transform to the chain
    pub fn push_transform(&mut self, transform: KindId) {
        self.transforms.push(transform);
    }

    /// Join with a frame of the same kind: keep the minimum distance (the
    /// shortest known trace), union features and origins. When the chains
    /// disagree, the chain of the closer frame wins.
    pub fn join_with(&mut self, other: &Frame) {
        debug_assert_eq!(self.kind, other.kind, "frames must share a kind to join");
        if other.distance < self.distance {
            self.distance = other.distance;
            self.transforms = other.transforms.clone();
        }
        self.features.extend(other.features.iter().copied());
        self.origins.extend(other.origins.iter().copied());
    }

    /// Partial order consistent with `join_with`. The transform chain is
    /// trace metadata and does not participate.
    pub fn leq(&self, other: &Frame) -> bool {
        self.kind == other.kind
            && self.distance >= other.distance
            && self.features.is_subset(&other.features)
            && self.origins.is_subset(&other.origins)
    }

    /// The caller-side view of this frame across a call to `callee`.
    /// Returns `None` when the extra hop exceeds `maximum_distance`.
    pub fn propagate(&self, callee: MethodId, maximum_distance: u32) -> Option<Frame> {
        let distance = self.distance.saturating_add(1);
        if distance > maximum_distance {
            return None;
        }
        let mut frame = self.clone();
        frame.distance = distance;
        if self.distance == 0 {
            // The callee's declared taint is the leaf of the trace.
            frame.origins.insert(callee);
        }
        Some(frame)
    }
}
