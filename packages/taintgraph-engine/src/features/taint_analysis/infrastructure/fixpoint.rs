//! Monotonic worklist fixpoint solver
//!
//! Classic Kildall-style dataflow over one method's CFG, generic in the
//! abstract domain and the per-instruction transfer function. The same
//! solver runs forward (from the entry block, instructions in program
//! order) and backward (from the exit block, instructions reversed).
//!
//! Widening is applied at every join, which together with the taint tree's
//! height bound gives the ascending-chain property. A solve that keeps
//! changing after a generous per-node budget signals a non-monotonic
//! transfer function or a malformed CFG and is a fatal error, never a
//! silent truncation.

use std::collections::VecDeque;

use crate::errors::{EngineError, Result};

use super::cfg::{BlockId, ControlFlowGraph};

/// Lattice operations for a domain, carried by value so domains can be
/// parameterized (e.g. by the widening height) without baking configuration
/// into every abstract value.
pub trait DomainOps<D> {
    fn bottom(&self) -> D;
    fn join_with(&self, lhs: &mut D, rhs: &D);
    fn leq(&self, lhs: &D, rhs: &D) -> bool;

    /// Height-bounding join; defaults to the plain join for domains of
    /// finite height.
    fn widen_with(&self, lhs: &mut D, rhs: &D) {
        self.join_with(lhs, rhs);
    }
}

/// Per-instruction transfer function. Mutates the state in place.
pub trait TransferFunction<I, D: Clone> {
    fn analyze_instruction(&mut self, instruction: &I, state: &mut D);

    /// Edge transfer, identity by default: control sensitivity is expressed
    /// by per-block data movement, not by edge filtering.
    fn analyze_edge(&mut self, _from: BlockId, _to: BlockId, state: &D) -> D {
        state.clone()
    }
}

/// Direction of the dataflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Converged per-block states. `before`/`after` are relative to the
/// direction of the analysis: forward, `before` is the block entry; backward,
/// `before` is the block exit.
#[derive(Debug)]
pub struct FixpointSolution<D> {
    before: Vec<D>,
    after: Vec<D>,
}

impl<D> FixpointSolution<D> {
    /// State before the block's instructions, in analysis direction.
    pub fn state_before(&self, block: BlockId) -> &D {
        &self.before[block]
    }

    /// State after the block's instructions, in analysis direction.
    pub fn state_after(&self, block: BlockId) -> &D {
        &self.after[block]
    }
}

/// The solver. Construct once per analysis, run per method.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicFixpoint {
    direction: Direction,
    max_node_visits: usize,
}

impl MonotonicFixpoint {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            max_node_visits: 128,
        }
    }

    /// Override the per-node visit budget used for divergence detection.
    pub fn with_max_node_visits(mut self, max_node_visits: usize) -> Self {
        self.max_node_visits = max_node_visits.max(1);
        self
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    fn upstream<'c, I>(&self, cfg: &'c ControlFlowGraph<I>, node: BlockId) -> &'c [BlockId] {
        match self.direction {
            Direction::Forward => cfg.block(node).predecessors(),
            Direction::Backward => cfg.block(node).successors(),
        }
    }

    fn downstream<'c, I>(&self, cfg: &'c ControlFlowGraph<I>, node: BlockId) -> &'c [BlockId] {
        match self.direction {
            Direction::Forward => cfg.block(node).successors(),
            Direction::Backward => cfg.block(node).predecessors(),
        }
    }

    /// Run to quiescence. `subject` names the analyzed method in errors.
    ///
    /// The seed node (entry forward, exit backward) starts from `initial`;
    /// unreached nodes remain bottom.
    pub fn run<I, D, O, T>(
        &self,
        cfg: &ControlFlowGraph<I>,
        subject: &str,
        ops: &O,
        initial: D,
        transfer: &mut T,
    ) -> Result<FixpointSolution<D>>
    where
        D: Clone,
        O: DomainOps<D>,
        T: TransferFunction<I, D>,
    {
        let node_count = cfg.block_count();
        let mut before: Vec<D> = (0..node_count).map(|_| ops.bottom()).collect();
        let mut after: Vec<D> = (0..node_count).map(|_| ops.bottom()).collect();
        let mut visited = vec![false; node_count];
        let mut queued = vec![false; node_count];

        let seed = match self.direction {
            Direction::Forward => cfg.entry(),
            Direction::Backward => cfg.exit(),
        };

        let mut worklist = VecDeque::with_capacity(node_count);
        worklist.push_back(seed);
        queued[seed] = true;

        // By the time this budget is exhausted, every reachable node has
        // been processed many times over; further change means the transfer
        // function is not monotonic or the CFG is broken.
        let iteration_budget = self.max_node_visits.saturating_mul(node_count.max(1));
        let mut iterations = 0usize;

        while let Some(node) = worklist.pop_front() {
            queued[node] = false;
            iterations += 1;
            if iterations > iteration_budget {
                return Err(EngineError::FixpointDivergence {
                    method: subject.to_string(),
                });
            }

            // Join of upstream outputs; the seed additionally starts from
            // the initial state. Widening at the join bounds chain height.
            let mut input = if node == seed {
                initial.clone()
            } else {
                ops.bottom()
            };
            for &upstream in self.upstream(cfg, node) {
                let edge_state = transfer.analyze_edge(upstream, node, &after[upstream]);
                ops.widen_with(&mut input, &edge_state);
            }

            let mut output = input.clone();
            match self.direction {
                Direction::Forward => {
                    for instruction in cfg.forward_instructions(node) {
                        transfer.analyze_instruction(instruction, &mut output);
                    }
                }
                Direction::Backward => {
                    for instruction in cfg.reverse_instructions(node) {
                        transfer.analyze_instruction(instruction, &mut output);
                    }
                }
            }

            // The first visit always counts as a change so downstream nodes
            // are reached even when the output is bottom.
            let changed = !visited[node] || !ops.leq(&output, &after[node]);
            visited[node] = true;
            before[node] = input;

            if changed {
                after[node] = output;
                for &downstream in self.downstream(cfg, node) {
                    if !queued[downstream] {
                        queued[downstream] = true;
                        worklist.push_back(downstream);
                    }
                }
            }
        }

        Ok(FixpointSolution { before, after })
    }
}
