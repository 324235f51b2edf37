//! taintgraph-engine
//!
//! Whole-program interprocedural taint analysis core for compiled
//! application bytecode: discovers flows from attacker-influenced sources
//! to sensitive sinks across method boundaries.
//!
//! The engine owns the fixpoint and domain machinery; instruction
//! semantics, bytecode ingestion, CFG construction and override resolution
//! are supplied by the embedder through the ports layer:
//!
//! - a per-method worklist fixpoint solver (forward and backward) over the
//!   taint abstract-domain stack: frames grouped by kind, height-bounded
//!   access-path trees, environments
//! - call-graph condensation and leaves-first scheduling onto a fixed-size
//!   worker pool, with repeat rounds over mutually recursive components
//! - a concurrent per-method model registry that ties intra- and
//!   inter-procedural analysis together, swept in global rounds until the
//!   models stop changing or the round budget runs out
//!
//! Termination is guaranteed for arbitrarily recursive call graphs and
//! arbitrarily deep object graphs: tree widening bounds the lattice height
//! and the round budgets bound the schedules.

pub mod config;
pub mod errors;
pub mod features;
pub mod shared;

pub use config::{AnalysisConfig, UnresolvedCalleePolicy};
pub use errors::{EngineError, Result};
pub use features::taint_analysis::{
    AccessPath, AnalysisSummary, CallGraphProvider, CfgBuilder, CfgProvider, ControlFlowGraph,
    Environment, FeatureId, FieldId, Frame, InstructionAnalyzer, Interners, Issue, Kind, KindId,
    MemoryLocation, MethodContext, MethodId, Model, ModelDto, Modes, Path, Registry, Root,
    SimpleCallGraph, SimpleProgram, Taint, TaintAccessPathTree, TaintAnalysis, TaintTree,
    UpdateKind,
};
