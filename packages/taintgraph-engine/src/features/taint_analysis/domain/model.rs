//! Per-method taint summaries
//!
//! A model is what the engine knows about one method: the taint it
//! generates, the taint it receives on parameters, the taint it sinks, how
//! it propagates input ports to output ports, and the issues found inside
//! it. Models are the values stored in the registry; callers read them as
//! summaries at call sites.
//!
//! Within one global round a model read may predate the callee's
//! convergence; it is then a conservative lower bound refined in later
//! rounds.

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;

use super::access_path::AccessPath;
use super::access_path_tree::TaintAccessPathTree;
use super::frame::Frame;
use super::interners::{FeatureId, MethodId};
use super::issue::{Issue, IssueSet};
use super::propagation::PropagationSet;
use super::taint::Taint;
use super::taint_tree::UpdateKind;

/// Behavior flags of a model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modes {
    /// Skip the analysis of this method; its model is authoritative.
    pub skip_analysis: bool,

    /// Add the obscure feature to taint flowing through this method.
    pub add_via_obscure_feature: bool,

    /// Taint on arguments flows into the return value.
    pub taint_in_taint_out: bool,

    /// Taint on arguments flows into the receiver.
    pub taint_in_taint_this: bool,

    /// Do not join override models at virtual call sites.
    pub no_join_virtual_overrides: bool,
}

impl Modes {
    /// Union of flags.
    pub fn join_with(&mut self, other: &Modes) {
        self.skip_analysis |= other.skip_analysis;
        self.add_via_obscure_feature |= other.add_via_obscure_feature;
        self.taint_in_taint_out |= other.taint_in_taint_out;
        self.taint_in_taint_this |= other.taint_in_taint_this;
        self.no_join_virtual_overrides |= other.no_join_virtual_overrides;
    }

    pub fn leq(&self, other: &Modes) -> bool {
        (!self.skip_analysis || other.skip_analysis)
            && (!self.add_via_obscure_feature || other.add_via_obscure_feature)
            && (!self.taint_in_taint_out || other.taint_in_taint_out)
            && (!self.taint_in_taint_this || other.taint_in_taint_this)
            && (!self.no_join_virtual_overrides || other.no_join_virtual_overrides)
    }
}

/// Per-method taint summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    method: MethodId,
    modes: Modes,
    generations: TaintAccessPathTree,
    parameter_sources: TaintAccessPathTree,
    sinks: TaintAccessPathTree,
    propagations: PropagationSet,
    issues: IssueSet,
}

impl Model {
    /// The empty (bottom) model for a method.
    pub fn empty(method: MethodId) -> Self {
        Self {
            method,
            modes: Modes::default(),
            generations: TaintAccessPathTree::bottom(),
            parameter_sources: TaintAccessPathTree::bottom(),
            sinks: TaintAccessPathTree::bottom(),
            propagations: PropagationSet::bottom(),
            issues: IssueSet::bottom(),
        }
    }

    pub fn method(&self) -> MethodId {
        self.method
    }

    pub fn modes(&self) -> Modes {
        self.modes
    }

    pub fn set_modes(&mut self, modes: Modes) {
        self.modes = modes;
    }

    pub fn skip_analysis(&self) -> bool {
        self.modes.skip_analysis
    }

    /// Whether the model carries no information beyond its identity.
    pub fn is_empty(&self) -> bool {
        self.modes == Modes::default()
            && self.generations.is_bottom()
            && self.parameter_sources.is_bottom()
            && self.sinks.is_bottom()
            && self.propagations.is_bottom()
            && self.issues.is_bottom()
    }

    pub fn generations(&self) -> &TaintAccessPathTree {
        &self.generations
    }

    pub fn parameter_sources(&self) -> &TaintAccessPathTree {
        &self.parameter_sources
    }

    pub fn sinks(&self) -> &TaintAccessPathTree {
        &self.sinks
    }

    pub fn propagations(&self) -> &PropagationSet {
        &self.propagations
    }

    pub fn issues(&self) -> &IssueSet {
        &self.issues
    }

    /// Add a declared generation: the method outputs this taint at `port`
    /// regardless of its inputs.
    pub fn add_generation(&mut self, port: AccessPath, frame: Frame) {
        self.generations
            .write(&port, Taint::singleton(frame), UpdateKind::Weak);
    }

    /// Add generations for a whole taint at `port`.
    pub fn add_generations(&mut self, port: &AccessPath, taint: Taint) {
        self.generations.write(port, taint, UpdateKind::Weak);
    }

    /// Add a generation inferred during analysis; the port is truncated to
    /// the configured maximum size.
    pub fn add_inferred_generation(
        &mut self,
        mut port: AccessPath,
        taint: Taint,
        config: &AnalysisConfig,
    ) {
        port.truncate(config.maximum_port_size);
        self.generations.write(&port, taint, UpdateKind::Weak);
    }

    /// Add a declared parameter source.
    pub fn add_parameter_source(&mut self, port: AccessPath, frame: Frame) {
        debug_assert!(port.root().is_argument(), "parameter sources live on arguments");
        self.parameter_sources
            .write(&port, Taint::singleton(frame), UpdateKind::Weak);
    }

    /// Add parameter sources for a whole taint at `port`.
    pub fn add_parameter_sources(&mut self, port: &AccessPath, taint: Taint) {
        debug_assert!(port.root().is_argument(), "parameter sources live on arguments");
        self.parameter_sources.write(port, taint, UpdateKind::Weak);
    }

    /// Add a declared sink: taint reaching `port` is reported.
    pub fn add_sink(&mut self, port: AccessPath, frame: Frame) {
        self.sinks
            .write(&port, Taint::singleton(frame), UpdateKind::Weak);
    }

    /// Add sinks for a whole taint at `port`.
    pub fn add_sinks(&mut self, port: &AccessPath, taint: Taint) {
        self.sinks.write(port, taint, UpdateKind::Weak);
    }

    /// Add a sink inferred during analysis, with port truncation.
    pub fn add_inferred_sink(
        &mut self,
        mut port: AccessPath,
        taint: Taint,
        config: &AnalysisConfig,
    ) {
        port.truncate(config.maximum_port_size);
        self.sinks.write(&port, taint, UpdateKind::Weak);
    }

    /// Add a declared propagation from `input` to `output`.
    pub fn add_propagation(
        &mut self,
        input: AccessPath,
        output: AccessPath,
        features: impl IntoIterator<Item = FeatureId>,
    ) {
        debug_assert!(input.root().is_argument(), "propagation inputs live on arguments");
        self.propagations.add(input, output, features);
    }

    /// Add a propagation inferred during analysis; the input path is
    /// truncated to the configured maximum length.
    pub fn add_inferred_propagation(
        &mut self,
        mut input: AccessPath,
        output: AccessPath,
        features: impl IntoIterator<Item = FeatureId>,
        config: &AnalysisConfig,
    ) {
        input.truncate(config.maximum_propagation_path_size);
        self.propagations.add(input, output, features);
    }

    /// Record an issue found in this method.
    pub fn add_issue(&mut self, issue: Issue) {
        self.issues.add(issue);
    }

    /// Lattice join. Both models must describe the same method.
    pub fn join_with(&mut self, other: &Model) {
        debug_assert_eq!(self.method, other.method, "joining models of different methods");
        self.modes.join_with(&other.modes);
        self.generations.join_with(&other.generations);
        self.parameter_sources.join_with(&other.parameter_sources);
        self.sinks.join_with(&other.sinks);
        self.propagations.join_with(&other.propagations);
        self.issues.join_with(&other.issues);
    }

    /// Partial order used for convergence detection.
    pub fn leq(&self, other: &Model) -> bool {
        self.method == other.method
            && self.modes.leq(&other.modes)
            && self.generations.leq(&other.generations)
            && self.parameter_sources.leq(&other.parameter_sources)
            && self.sinks.leq(&other.sinks)
            && self.propagations.leq(&other.propagations)
            && self.issues.leq(&other.issues)
    }

    /// Shrink trees that grew too wide during the local fixpoint. Called
    /// once per convergence, before the model is published.
    pub fn approximate(&mut self, config: &AnalysisConfig) {
        self.generations.limit_leaves(config.maximum_model_tree_leaves);
        self.parameter_sources
            .limit_leaves(config.maximum_model_tree_leaves);
        self.sinks.limit_leaves(config.maximum_model_tree_leaves);
    }
}
