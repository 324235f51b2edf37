//! The taint abstract domain
//!
//! A taint value is a set of frames grouped by kind: after any join there is
//! at most one frame per kind, and frames of the same kind merge through
//! `Frame::join_with`. Distinct kinds coexist side by side.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use super::frame::Frame;
use super::interners::{FeatureId, MethodId};
use super::kind::KindId;

/// Kind-grouped set of frames. The bottom value is the empty set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Taint {
    frames: BTreeMap<KindId, Frame>,
}

impl Taint {
    /// The bottom (empty) taint
    pub fn bottom() -> Self {
        Self::default()
    }

    /// A taint holding one frame
    pub fn singleton(frame: Frame) -> Self {
        let mut taint = Self::bottom();
        taint.add(frame);
        taint
    }

    pub fn is_bottom(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of distinct kinds
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Iterate over frames in kind order
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.values()
    }

    /// Iterate over the kinds present
    pub fn kinds(&self) -> impl Iterator<Item = KindId> + '_ {
        self.frames.keys().copied()
    }

    /// The frame for a kind, if present
    pub fn frame(&self, kind: KindId) -> Option<&Frame> {
        self.frames.get(&kind)
    }

    /// Add a frame, merging with an existing frame of the same kind.
    pub fn add(&mut self, frame: Frame) {
        match self.frames.entry(frame.kind()) {
            Entry::Vacant(entry) => {
                entry.insert(frame);
            }
            Entry::Occupied(mut entry) => {
                entry.get_mut().join_with(&frame);
            }
        }
    }

    /// Lattice join: union of kinds, per-kind frame merge.
    pub fn join_with(&mut self, other: &Taint) {
        for frame in other.frames() {
            self.add(frame.clone());
        }
    }

    /// Partial order: every frame must be dominated by the other side's
    /// frame of the same kind.
    pub fn leq(&self, other: &Taint) -> bool {
        self.frames.iter().all(|(kind, frame)| {
            other
                .frames
                .get(kind)
                .is_some_and(|other_frame| frame.leq(other_frame))
        })
    }

    /// Remove frames already covered by `other`. Used to keep trees in
    /// normal form: a child drops whatever its ancestors already carry.
    pub fn difference_with(&mut self, other: &Taint) {
        self.frames.retain(|kind, frame| {
            other
                .frames
                .get(kind)
                .is_none_or(|other_frame| !frame.leq(other_frame))
        });
    }

    /// Keep only frames satisfying the predicate
    pub fn filter(&mut self, mut predicate: impl FnMut(&Frame) -> bool) {
        self.frames.retain(|_, frame| predicate(frame));
    }

    /// Apply a function to every frame
    pub fn map(&mut self, mut f: impl FnMut(&mut Frame)) {
        for frame in self.frames.values_mut() {
            f(frame);
        }
    }

    /// Add a feature to every frame
    pub fn add_features(&mut self, features: &[FeatureId]) {
        self.map(|frame| frame.add_features(features.iter().copied()));
    }

    /// The caller-side view of this taint across a call to `callee`:
    /// distances increase by one hop and frames beyond `maximum_distance`
    /// are dropped.
    pub fn propagate(&self, callee: MethodId, maximum_distance: u32) -> Taint {
        let mut result = Taint::bottom();
        for frame in self.frames() {
            if let Some(propagated) = frame.propagate(callee, maximum_distance) {
                result.add(propagated);
            }
        }
        result
    }
}

impl FromIterator<Frame> for Taint {
    fn from_iter<I: IntoIterator<Item = Frame>>(iter: I) -> Self {
        let mut taint = Taint::bottom();
        for frame in iter {
            taint.add(frame);
        }
        taint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(id: u32) -> KindId {
        KindId(id)
    }

    #[test]
    fn test_same_kind_frames_merge() {
        let mut taint = Taint::bottom();
        taint.add(Frame::with_distance(kind(0), 2));
        taint.add(Frame::with_distance(kind(0), 1));

        assert_eq!(taint.len(), 1);
        assert_eq!(taint.frame(kind(0)).unwrap().distance(), 1);
    }

    #[test]
    fn test_distinct_kinds_coexist() {
        let mut taint = Taint::bottom();
        taint.add(Frame::leaf(kind(0)));
        taint.add(Frame::leaf(kind(1)));

        assert_eq!(taint.len(), 2);
    }

    #[test]
    fn test_join_is_idempotent() {
        let mut taint = Taint::singleton(Frame::with_distance(kind(0), 3));
        let copy = taint.clone();
        taint.join_with(&copy);
        assert_eq!(taint, copy);
    }

    #[test]
    fn test_bottom_is_identity() {
        let mut taint = Taint::singleton(Frame::leaf(kind(2)));
        let expected = taint.clone();
        taint.join_with(&Taint::bottom());
        assert_eq!(taint, expected);

        let mut bottom = Taint::bottom();
        bottom.join_with(&expected);
        assert_eq!(bottom, expected);
    }

    #[test]
    fn test_difference_removes_covered_frames() {
        let mut covering = Taint::bottom();
        covering.add(Frame::with_distance(kind(0), 1));

        let mut taint = Taint::bottom();
        taint.add(Frame::with_distance(kind(0), 2));
        taint.add(Frame::leaf(kind(1)));

        taint.difference_with(&covering);

        // The kind-0 frame at distance 2 is covered by distance 1.
        assert!(taint.frame(kind(0)).is_none());
        assert!(taint.frame(kind(1)).is_some());
    }

    #[test]
    fn test_propagate_drops_far_frames() {
        let mut taint = Taint::bottom();
        taint.add(Frame::leaf(kind(0)));
        taint.add(Frame::with_distance(kind(1), 5));

        let propagated = taint.propagate(MethodId(0), 3);
        assert!(propagated.frame(kind(0)).is_some());
        assert!(propagated.frame(kind(1)).is_none());
    }
}
