// Engine machinery: CFG views, the intraprocedural fixpoint solver, call
// graph condensation, scheduling, the model registry and the global
// interprocedural fixpoint.

pub mod cfg;
pub mod fixpoint;
pub mod interprocedural;
pub mod registry;
pub mod scc;
pub mod scheduler;

pub use cfg::{BasicBlock, BlockId, CfgBuilder, ControlFlowGraph};
pub use fixpoint::{Direction, DomainOps, FixpointSolution, MonotonicFixpoint, TransferFunction};
pub use interprocedural::{
    AnalysisSummary, EnvironmentOps, InterproceduralAnalysis, MethodContext,
};
pub use registry::Registry;
pub use scc::CallGraphSccs;
pub use scheduler::Scheduler;
