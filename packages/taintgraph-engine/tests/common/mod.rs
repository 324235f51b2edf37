//! A miniature instruction set and its transfer function.
//!
//! The engine treats instruction semantics as an external collaborator;
//! these tests supply a small register machine: sources, moves, field
//! reads/writes, calls resolved through the registry, and returns.

use taintgraph_engine::{
    AccessPath, CfgBuilder, ControlFlowGraph, Environment, Frame, InstructionAnalyzer, Issue,
    MemoryLocation, MethodContext, Path, Root, Taint, UnresolvedCalleePolicy, UpdateKind,
};

#[derive(Debug, Clone)]
pub enum TestInstruction {
    /// Load the declared taint of parameter `position` into a register.
    Parameter { dst: u32, position: u32 },
    /// Load attacker-controlled data of the named kind into a register.
    Source { dst: u32, kind: &'static str },
    /// Copy a register.
    Assign { dst: u32, src: u32 },
    /// `dst = src.field`
    GetField {
        dst: u32,
        src: u32,
        field: &'static str,
    },
    /// `dst.field = src`
    PutField {
        dst: u32,
        field: &'static str,
        src: u32,
    },
    /// Call `callee(args...)`; `index` identifies the call site.
    Call {
        index: u32,
        callee: &'static str,
        args: Vec<u32>,
        ret: Option<u32>,
    },
    /// Return a register.
    Return { src: u32 },
}

fn location(register: u32) -> MemoryLocation {
    MemoryLocation(register)
}

/// Forward transfer function over [`TestInstruction`].
pub struct ForwardSemantics;

impl ForwardSemantics {
    fn analyze_call(
        &self,
        context: &mut MethodContext<'_>,
        call_index: u32,
        callee: &str,
        args: &[u32],
        ret: Option<u32>,
        environment: &mut Environment,
    ) {
        let callee_id = context.interners().method(callee.to_string());
        let model = context.callee_model(callee_id);
        let max_distance = context.config().maximum_source_sink_distance;
        let policy = context.config().unresolved_callee_policy;

        if model.is_empty() {
            // No summary at all: either an unresolvable callee or a callee
            // that has not been analyzed yet this round.
            if policy == UnresolvedCalleePolicy::AssumeTainted {
                if let Some(ret) = ret {
                    let kind = context.interners().named_kind("UnresolvedCall");
                    environment.write(
                        location(ret),
                        &Path::new(),
                        Taint::singleton(Frame::leaf(kind)),
                        UpdateKind::Weak,
                    );
                }
            }
            return;
        }

        // Sinks: taint on an argument flowing into a callee sink port of
        // the same kind is an issue at this call site.
        for (port, sink_taint) in model.sinks().elements() {
            let Root::Argument(position) = port.root() else {
                continue;
            };
            let Some(&register) = args.get(position as usize) else {
                continue;
            };
            let argument_taint = environment.read(location(register)).read_taint(port.path());
            if argument_taint.is_bottom() {
                continue;
            }
            let sinks_here = sink_taint.propagate(callee_id, max_distance);
            for sink_frame in sinks_here.frames() {
                for source_frame in argument_taint.frames() {
                    if source_frame.kind() == sink_frame.kind() {
                        context.add_issue(Issue::new(
                            source_frame.kind(),
                            sink_frame.kind(),
                            callee_id,
                            call_index,
                            port.clone(),
                            sink_frame.distance(),
                            Taint::singleton(source_frame.clone()),
                            Taint::singleton(sink_frame.clone()),
                        ));
                    }
                }
            }
        }

        // Generations: the callee's outputs become tainted here.
        for (port, taint) in model.generations().elements() {
            let propagated = taint.propagate(callee_id, max_distance);
            if propagated.is_bottom() {
                continue;
            }
            let target = match port.root() {
                Root::Return => ret.map(location),
                Root::Argument(position) => args.get(position as usize).copied().map(location),
            };
            if let Some(target) = target {
                environment.write(target, port.path(), propagated, UpdateKind::Weak);
            }
        }

        // Propagations: the caller's own taint moves through the callee.
        for (input, output, features) in model.propagations().iter() {
            let Root::Argument(position) = input.root() else {
                continue;
            };
            let Some(&register) = args.get(position as usize) else {
                continue;
            };
            let mut moved = environment.read(location(register)).read_taint(input.path());
            if moved.is_bottom() {
                continue;
            }
            moved.add_features(&features.iter().copied().collect::<Vec<_>>());
            let target = match output.root() {
                Root::Return => ret.map(location),
                Root::Argument(position) => args.get(position as usize).copied().map(location),
            };
            if let Some(target) = target {
                environment.write(target, output.path(), moved, UpdateKind::Weak);
            }
        }
    }
}

impl InstructionAnalyzer<TestInstruction> for ForwardSemantics {
    fn analyze_instruction(
        &self,
        context: &mut MethodContext<'_>,
        instruction: &TestInstruction,
        environment: &mut Environment,
    ) {
        match instruction {
            TestInstruction::Parameter { dst, position } => {
                let tree = context
                    .previous_model()
                    .parameter_sources()
                    .read_root(Root::Argument(*position));
                environment.set(location(*dst), tree);
            }
            TestInstruction::Source { dst, kind } => {
                let kind = context.interners().named_kind(*kind);
                environment.write(
                    location(*dst),
                    &Path::new(),
                    Taint::singleton(Frame::leaf(kind)),
                    UpdateKind::Weak,
                );
            }
            TestInstruction::Assign { dst, src } => {
                let tree = environment.read(location(*src));
                environment.set(location(*dst), tree);
            }
            TestInstruction::GetField { dst, src, field } => {
                let field = context.interners().field(*field);
                let tree = environment
                    .read(location(*src))
                    .read(&Path::from_elements(vec![field]));
                environment.set(location(*dst), tree);
            }
            TestInstruction::PutField { dst, field, src } => {
                let field = context.interners().field(*field);
                let tree = environment.read(location(*src));
                environment.write_tree(
                    location(*dst),
                    &Path::from_elements(vec![field]),
                    tree,
                    UpdateKind::Weak,
                );
            }
            TestInstruction::Call {
                index,
                callee,
                args,
                ret,
            } => {
                self.analyze_call(context, *index, callee, args, *ret, environment);
            }
            TestInstruction::Return { src } => {
                for (path, taint) in environment.read(location(*src)).elements() {
                    context.add_inferred_generation(AccessPath::new(Root::Return, path), taint);
                }
            }
        }
    }
}

/// Backward transfer function: the forward pass already infers everything
/// these tests assert, so the backward instance is a no-op.
pub struct BackwardSemantics;

impl InstructionAnalyzer<TestInstruction> for BackwardSemantics {
    fn analyze_instruction(
        &self,
        _context: &mut MethodContext<'_>,
        _instruction: &TestInstruction,
        _environment: &mut Environment,
    ) {
    }
}

/// A method body of one basic block.
pub fn single_block(instructions: Vec<TestInstruction>) -> ControlFlowGraph<TestInstruction> {
    let mut builder = CfgBuilder::new();
    builder.add_block(instructions);
    builder.build().expect("single block cfg")
}
