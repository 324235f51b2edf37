//! Analysis configuration
//!
//! All tunables consumed by the engine live here. The engine never hard-codes
//! a widening height or a round budget at a use site; callers pick a preset
//! or override individual knobs.

use serde::{Deserialize, Serialize};

/// Policy for call sites whose virtual callee resolves to an empty override
/// set. Consumed by instruction analyzers through the method context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedCalleePolicy {
    /// Ignore the call's effect on the environment.
    #[default]
    SkipCall,

    /// Treat the call's result as tainted with the analyzer's chosen kinds.
    AssumeTainted,
}

/// Engine configuration
///
/// Defaults follow the heuristics of production whole-program taint
/// analyzers: shallow tree widening, a generous global round budget, and a
/// small per-component repeat cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Maximum height of a taint tree after widening. Subtrees deeper than
    /// this collapse into a single leaf.
    pub maximum_tree_height: usize,

    /// Maximum number of leaves in a model generation/sink tree before the
    /// tree is collapsed during model approximation.
    pub maximum_model_tree_leaves: usize,

    /// Maximum size of an inferred generation/parameter-source/sink port.
    pub maximum_port_size: usize,

    /// Maximum length of a propagation input path.
    pub maximum_propagation_path_size: usize,

    /// Frames whose distance would exceed this are dropped on propagation.
    pub maximum_source_sink_distance: u32,

    /// Maximum number of global interprocedural rounds. Exhausting the
    /// budget stops the sweep and reports `converged: false`.
    pub maximum_global_rounds: usize,

    /// Maximum repeat passes over one strongly connected component per
    /// global round.
    pub scc_round_cap: usize,

    /// Per-node visit bound for the intraprocedural solver; exceeding it
    /// after every node was seen is a divergence error.
    pub maximum_node_visits: usize,

    /// Worker threads for the scheduler pool.
    pub worker_count: usize,

    /// Policy for unresolvable virtual callees.
    pub unresolved_callee_policy: UnresolvedCalleePolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            maximum_tree_height: 4,
            maximum_model_tree_leaves: 20,
            maximum_port_size: 4,
            maximum_propagation_path_size: 2,
            maximum_source_sink_distance: 100,
            maximum_global_rounds: 150,
            scc_round_cap: 10,
            maximum_node_visits: 128,
            worker_count: num_cpus::get(),
            unresolved_callee_policy: UnresolvedCalleePolicy::SkipCall,
        }
    }
}

impl AnalysisConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Fast preset: shallow trees, tight budgets
    pub fn fast() -> Self {
        Self {
            maximum_tree_height: 2,
            maximum_model_tree_leaves: 10,
            maximum_global_rounds: 20,
            scc_round_cap: 4,
            ..Self::default()
        }
    }

    /// Thorough preset: deeper trees, larger budgets
    pub fn thorough() -> Self {
        Self {
            maximum_tree_height: 6,
            maximum_model_tree_leaves: 40,
            maximum_source_sink_distance: 200,
            scc_round_cap: 20,
            ..Self::default()
        }
    }

    /// Override the worker count
    pub fn with_worker_count(mut self, workers: usize) -> Self {
        self.worker_count = workers.max(1);
        self
    }

    /// Override the widening height
    pub fn with_maximum_tree_height(mut self, height: usize) -> Self {
        self.maximum_tree_height = height;
        self
    }

    /// Override the global round budget
    pub fn with_maximum_global_rounds(mut self, rounds: usize) -> Self {
        self.maximum_global_rounds = rounds.max(1);
        self
    }

    /// Override the per-component repeat cap
    pub fn with_scc_round_cap(mut self, cap: usize) -> Self {
        self.scc_round_cap = cap.max(1);
        self
    }

    /// Override the unresolved-callee policy
    pub fn with_unresolved_callee_policy(mut self, policy: UnresolvedCalleePolicy) -> Self {
        self.unresolved_callee_policy = policy;
        self
    }
}
