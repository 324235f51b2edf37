//! Issues
//!
//! An issue is a discovered source-to-sink flow, anchored at the call site
//! where the flow crossed into the sink. Issues are grouped by the fields
//! that determine their identity; trace metadata (taint, distance) joins
//! within a group instead of duplicating the issue.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use super::access_path::AccessPath;
use super::interners::MethodId;
use super::kind::KindId;
use super::taint::Taint;

/// The fields that determine an issue's identity for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct IssueKey {
    pub source_kind: KindId,
    pub sink_kind: KindId,
    pub callee: MethodId,
    pub call_index: u32,
    pub sink_port: AccessPath,
}

/// One discovered source-to-sink flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    key: IssueKey,
    distance: u32,
    source_taint: Taint,
    sink_taint: Taint,
}

impl Issue {
    pub fn new(
        source_kind: KindId,
        sink_kind: KindId,
        callee: MethodId,
        call_index: u32,
        sink_port: AccessPath,
        distance: u32,
        source_taint: Taint,
        sink_taint: Taint,
    ) -> Self {
        Self {
            key: IssueKey {
                source_kind,
                sink_kind,
                callee,
                call_index,
                sink_port,
            },
            distance,
            source_taint,
            sink_taint,
        }
    }

    pub fn key(&self) -> &IssueKey {
        &self.key
    }

    pub fn source_kind(&self) -> KindId {
        self.key.source_kind
    }

    pub fn sink_kind(&self) -> KindId {
        self.key.sink_kind
    }

    pub fn callee(&self) -> MethodId {
        self.key.callee
    }

    pub fn call_index(&self) -> u32 {
        self.key.call_index
    }

    pub fn sink_port(&self) -> &AccessPath {
        &self.key.sink_port
    }

    pub fn distance(&self) -> u32 {
        self.distance
    }

    pub fn source_taint(&self) -> &Taint {
        &self.source_taint
    }

    pub fn sink_taint(&self) -> &Taint {
        &self.sink_taint
    }

    /// Merge trace metadata of the same logical issue.
    fn join_with(&mut self, other: &Issue) {
        debug_assert_eq!(self.key, other.key);
        self.distance = self.distance.min(other.distance);
        self.source_taint.join_with(&other.source_taint);
        self.sink_taint.join_with(&other.sink_taint);
    }

    fn leq(&self, other: &Issue) -> bool {
        self.key == other.key
            && self.distance >= other.distance
            && self.source_taint.leq(&other.source_taint)
            && self.sink_taint.leq(&other.sink_taint)
    }
}

/// Issues grouped by identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueSet {
    map: BTreeMap<IssueKey, Issue>,
}

impl IssueSet {
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

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.map.values()
    }

    /// Add an issue, merging with an existing issue of the same identity.
    pub fn add(&mut self, issue: Issue) {
        match self.map.entry(issue.key.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(issue);
            }
            Entry::Occupied(mut entry) => {
                entry.get_mut().join_with(&issue);
            }
        }
    }

    pub fn join_with(&mut self, other: &IssueSet) {
        for issue in other.iter() {
            self.add(issue.clone());
        }
    }

    pub fn leq(&self, other: &IssueSet) -> bool {
        self.map.iter().all(|(key, issue)| {
            other
                .map
                .get(key)
                .is_some_and(|other_issue| issue.leq(other_issue))
        })
    }
}
