// Interprocedural taint analysis
//
// Layers:
// - domain: the taint abstract-domain stack (frames, trees, environments,
//   models) and the interning service
// - infrastructure: fixpoint solver, condensation, scheduler, registry and
//   the global interprocedural engine
// - ports: provider traits and the model serialization boundary
// - application: the analysis facade

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use application::TaintAnalysis;
pub use domain::{
    AccessPath, Environment, FeatureId, FieldId, Frame, Interners, Issue, IssueSet, Kind, KindId,
    MemoryLocation, MethodId, Model, Modes, Path, PropagationSet, Root, Taint,
    TaintAccessPathTree, TaintTree, UpdateKind,
};
pub use infrastructure::{
    AnalysisSummary, BlockId, CfgBuilder, ControlFlowGraph, Direction, EnvironmentOps,
    InterproceduralAnalysis, MethodContext, MonotonicFixpoint, Registry, Scheduler,
};
pub use ports::{
    CallGraphProvider, CfgProvider, InstructionAnalyzer, ModelDto, SimpleCallGraph, SimpleProgram,
};
