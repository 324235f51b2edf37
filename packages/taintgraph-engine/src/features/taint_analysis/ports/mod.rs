//! Ports: the engine's boundaries
//!
//! The engine consumes bytecode ingestion, call graph construction and
//! instruction semantics through these traits, and exposes models to the
//! outside world through the serde DTOs in [`dto`]. Implementations of the
//! provider traits live with the embedder; the simple in-memory
//! implementations here serve tests and small embeddings.

pub mod dto;

use rustc_hash::FxHashMap;

use crate::features::taint_analysis::domain::{Environment, MethodId};
use crate::features::taint_analysis::infrastructure::cfg::ControlFlowGraph;
use crate::features::taint_analysis::infrastructure::interprocedural::MethodContext;

pub use dto::{FrameDto, IssueDto, KindDto, ModelDto, PortTaintDto, PropagationDto};

/// Call graph and dependency provider.
///
/// `overrides` supports virtual-call resolution, which is itself external:
/// the engine only forwards the configured policy when the set is empty.
pub trait CallGraphProvider: Sync {
    /// Every method to analyze.
    fn methods(&self) -> Vec<MethodId>;

    /// Direct callees of a method.
    fn callees(&self, method: MethodId) -> Vec<MethodId>;

    /// Direct callers of a method (the reverse relation).
    fn callers(&self, method: MethodId) -> Vec<MethodId>;

    /// Methods that may override a virtual callee.
    fn overrides(&self, _callee: MethodId) -> Vec<MethodId> {
        Vec::new()
    }
}

/// Control-flow-graph provider: hands the engine a per-method CFG view.
pub trait CfgProvider: Sync {
    type Instruction;

    fn cfg(&self, method: MethodId) -> Option<&ControlFlowGraph<Self::Instruction>>;
}

/// The semantic transfer function for one instruction.
///
/// Side effects are restricted to mutating the environment and recording
/// facts (inferred taint, issues) on the method context. Callee models are
/// read through the context's registry handle.
pub trait InstructionAnalyzer<I>: Sync {
    fn analyze_instruction(
        &self,
        context: &mut MethodContext<'_>,
        instruction: &I,
        environment: &mut Environment,
    );
}

/// In-memory call graph for tests and small embeddings.
#[derive(Debug, Clone, Default)]
pub struct SimpleCallGraph {
    callees: FxHashMap<MethodId, Vec<MethodId>>,
    callers: FxHashMap<MethodId, Vec<MethodId>>,
}

impl SimpleCallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a call edge, registering both methods.
    pub fn add_call(&mut self, caller: MethodId, callee: MethodId) {
        self.callees.entry(caller).or_default().push(callee);
        self.callees.entry(callee).or_default();
        self.callers.entry(callee).or_default().push(caller);
        self.callers.entry(caller).or_default();
    }

    /// Add a method with no calls.
    pub fn add_method(&mut self, method: MethodId) {
        self.callees.entry(method).or_default();
        self.callers.entry(method).or_default();
    }
}

impl CallGraphProvider for SimpleCallGraph {
    fn methods(&self) -> Vec<MethodId> {
        let mut methods: Vec<MethodId> = self.callees.keys().copied().collect();
        methods.sort();
        methods
    }

    fn callees(&self, method: MethodId) -> Vec<MethodId> {
        self.callees.get(&method).cloned().unwrap_or_default()
    }

    fn callers(&self, method: MethodId) -> Vec<MethodId> {
        self.callers.get(&method).cloned().unwrap_or_default()
    }
}

/// In-memory program: a call graph plus per-method CFGs.
#[derive(Default)]
pub struct SimpleProgram<I> {
    call_graph: SimpleCallGraph,
    cfgs: FxHashMap<MethodId, ControlFlowGraph<I>>,
}

impl<I> SimpleProgram<I> {
    pub fn new() -> Self {
        Self {
            call_graph: SimpleCallGraph::new(),
            cfgs: FxHashMap::default(),
        }
    }

    pub fn add_method(&mut self, method: MethodId, cfg: ControlFlowGraph<I>) {
        self.call_graph.add_method(method);
        self.cfgs.insert(method, cfg);
    }

    pub fn add_call(&mut self, caller: MethodId, callee: MethodId) {
        self.call_graph.add_call(caller, callee);
    }

    pub fn call_graph(&self) -> &SimpleCallGraph {
        &self.call_graph
    }
}

impl<I: Sync + Send> CallGraphProvider for SimpleProgram<I> {
    fn methods(&self) -> Vec<MethodId> {
        self.call_graph.methods()
    }

    fn callees(&self, method: MethodId) -> Vec<MethodId> {
        self.call_graph.callees(method)
    }

    fn callers(&self, method: MethodId) -> Vec<MethodId> {
        self.call_graph.callers(method)
    }
}

impl<I: Sync + Send> CfgProvider for SimpleProgram<I> {
    type Instruction = I;

    fn cfg(&self, method: MethodId) -> Option<&ControlFlowGraph<I>> {
        self.cfgs.get(&method)
    }
}
