//! The global interprocedural fixpoint
//!
//! Drives registry-backed per-method fixpoints in condensation order. Round
//! one sweeps every method leaves-first; each later round re-analyzes the
//! dirty set: methods whose model changed plus their callers. The sweep
//! stops when a round changes nothing (global fixpoint) or the round budget
//! runs out, which is reported in the summary rather than treated as an
//! error.
//!
//! A task never blocks on another task's result. A callee model that has
//! not been computed yet reads as bottom and is refined in later rounds;
//! this is what makes cyclic call graphs deadlock-free.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::config::AnalysisConfig;
use crate::errors::{EngineError, Result};
use crate::features::taint_analysis::domain::{
    AccessPath, Environment, FeatureId, Interners, Issue, MethodId, Model, Taint,
};
use crate::features::taint_analysis::ports::{CallGraphProvider, CfgProvider, InstructionAnalyzer};

use super::fixpoint::{Direction, DomainOps, MonotonicFixpoint, TransferFunction};
use super::registry::Registry;
use super::scheduler::Scheduler;

/// Lattice operations for the environment, parameterized by the widening
/// height.
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentOps {
    pub max_tree_height: usize,
}

impl DomainOps<Environment> for EnvironmentOps {
    fn bottom(&self) -> Environment {
        Environment::bottom()
    }

    fn join_with(&self, lhs: &mut Environment, rhs: &Environment) {
        lhs.join_with(rhs);
    }

    fn widen_with(&self, lhs: &mut Environment, rhs: &Environment) {
        lhs.widen_with(rhs, self.max_tree_height);
    }

    fn leq(&self, lhs: &Environment, rhs: &Environment) -> bool {
        lhs.leq(rhs)
    }
}

/// Everything an instruction analyzer may touch while one method is being
/// analyzed: the model under construction, the previous model, and
/// read-only handles to the registry, interners and configuration.
pub struct MethodContext<'a> {
    method: MethodId,
    previous: Arc<Model>,
    model: Model,
    registry: &'a Registry,
    interners: &'a Interners,
    config: &'a AnalysisConfig,
}

impl<'a> MethodContext<'a> {
    pub fn new(
        method: MethodId,
        previous: Arc<Model>,
        registry: &'a Registry,
        interners: &'a Interners,
        config: &'a AnalysisConfig,
    ) -> Self {
        let mut model = Model::empty(method);
        model.set_modes(previous.modes());
        Self {
            method,
            previous,
            model,
            registry,
            interners,
            config,
        }
    }

    pub fn method(&self) -> MethodId {
        self.method
    }

    pub fn method_name(&self) -> String {
        self.interners.method_name(self.method)
    }

    /// The method's model from the previous round. Declared sources, sinks
    /// and propagations are read from here during the transfer.
    pub fn previous_model(&self) -> &Model {
        &self.previous
    }

    /// The callee's current summary. Possibly bottom or mid-round: a
    /// conservative lower bound, never a reason to block.
    pub fn callee_model(&self, callee: MethodId) -> Arc<Model> {
        self.registry.get(callee)
    }

    pub fn interners(&self) -> &Interners {
        self.interners
    }

    pub fn config(&self) -> &AnalysisConfig {
        self.config
    }

    /// The model under construction.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Record an inferred generation; the port is truncated per config.
    pub fn add_inferred_generation(&mut self, port: AccessPath, taint: Taint) {
        self.model.add_inferred_generation(port, taint, self.config);
    }

    /// Record an inferred sink; the port is truncated per config.
    pub fn add_inferred_sink(&mut self, port: AccessPath, taint: Taint) {
        self.model.add_inferred_sink(port, taint, self.config);
    }

    /// Record an inferred propagation; the input path is truncated per
    /// config.
    pub fn add_inferred_propagation(
        &mut self,
        input: AccessPath,
        output: AccessPath,
        features: impl IntoIterator<Item = FeatureId>,
    ) {
        self.model
            .add_inferred_propagation(input, output, features, self.config);
    }

    /// Record an issue found at a call site of this method.
    pub fn add_issue(&mut self, issue: Issue) {
        self.model.add_issue(issue);
    }

    fn into_model(self) -> Model {
        self.model
    }
}

/// Adapts an instruction analyzer to the intraprocedural solver.
struct TaintTransfer<'a, 'c, A> {
    context: &'c mut MethodContext<'a>,
    analyzer: &'a A,
}

impl<'a, 'c, A, I> TransferFunction<I, Environment> for TaintTransfer<'a, 'c, A>
where
    A: InstructionAnalyzer<I>,
{
    fn analyze_instruction(&mut self, instruction: &I, state: &mut Environment) {
        self.analyzer
            .analyze_instruction(self.context, instruction, state);
    }
}

/// Outcome of a whole-program run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Global rounds executed.
    pub rounds: usize,

    /// Whether a global fixpoint was reached within the round budget.
    pub converged: bool,

    /// Total per-method analyses executed.
    pub method_analyses: usize,

    /// Components whose repeat iteration hit the per-round cap.
    pub scc_rounds_capped: usize,

    /// Total issues across all models.
    pub issues: usize,
}

/// The interprocedural analysis over one program.
pub struct InterproceduralAnalysis<'a, P, F, B>
where
    P: CallGraphProvider + CfgProvider,
{
    program: &'a P,
    forward: &'a F,
    backward: &'a B,
    registry: &'a Registry,
    interners: &'a Interners,
    config: &'a AnalysisConfig,
}

impl<'a, P, F, B> InterproceduralAnalysis<'a, P, F, B>
where
    P: CallGraphProvider + CfgProvider,
    P::Instruction: Sync,
    F: InstructionAnalyzer<P::Instruction>,
    B: InstructionAnalyzer<P::Instruction>,
{
    pub fn new(
        program: &'a P,
        forward: &'a F,
        backward: &'a B,
        registry: &'a Registry,
        interners: &'a Interners,
        config: &'a AnalysisConfig,
    ) -> Self {
        Self {
            program,
            forward,
            backward,
            registry,
            interners,
            config,
        }
    }

    /// Run to a global fixpoint or the round budget.
    pub fn run(&self) -> Result<AnalysisSummary> {
        let scheduler = Scheduler::from_call_graph(self.program, self.config)?;
        info!(
            methods = scheduler.sccs().method_count(),
            components = scheduler.sccs().components().len(),
            workers = scheduler.worker_count(),
            "computing global fixpoint"
        );

        let mut summary = AnalysisSummary::default();
        let mut dirty: Option<BTreeSet<MethodId>> = None;

        for round in 1..=self.config.maximum_global_rounds {
            summary.rounds = round;
            let changed = self.run_sweep(&scheduler, dirty.as_ref(), &mut summary)?;
            if changed.is_empty() {
                summary.converged = true;
                break;
            }

            // The next round refines the changed methods (their own model
            // feeds back through recursion) and everything that calls them.
            let mut next = BTreeSet::new();
            for &method in &changed {
                if !self.program.callees(method).is_empty() {
                    next.insert(method);
                }
                for caller in self.program.callers(method) {
                    next.insert(caller);
                }
            }
            debug!(
                round,
                changed = changed.len(),
                scheduled_next = next.len(),
                "global round complete"
            );
            if next.is_empty() {
                summary.converged = true;
                break;
            }
            dirty = Some(next);
        }

        if !summary.converged {
            warn!(
                rounds = summary.rounds,
                "global round budget exhausted before reaching a fixpoint"
            );
        } else {
            info!(rounds = summary.rounds, "global fixpoint reached");
        }
        summary.issues = self.registry.issue_count();
        Ok(summary)
    }

    /// One leaves-first sweep. Returns the methods whose model changed.
    fn run_sweep(
        &self,
        scheduler: &Scheduler,
        filter: Option<&BTreeSet<MethodId>>,
        summary: &mut AnalysisSummary,
    ) -> Result<BTreeSet<MethodId>> {
        let sccs = scheduler.sccs();
        let mut changed_overall = BTreeSet::new();

        for level in sccs.levels() {
            let batch: Vec<MethodId> = level
                .iter()
                .flat_map(|&component| sccs.component(component).iter().copied())
                .filter(|method| filter.is_none_or(|dirty| dirty.contains(method)))
                .collect();
            if batch.is_empty() {
                continue;
            }

            let results = scheduler.run_batch(&batch, |method| self.analyze_method(method))?;
            summary.method_analyses += batch.len();
            let mut changed_now: BTreeSet<MethodId> = batch
                .iter()
                .zip(&results)
                .filter(|(_, &changed)| changed)
                .map(|(&method, _)| method)
                .collect();
            changed_overall.extend(changed_now.iter().copied());

            // Mutually recursive components iterate until a full quiet pass
            // over the component, bounded by the round cap.
            for &component_index in level {
                let component = sccs.component(component_index);
                if component.len() <= 1 {
                    continue;
                }
                let members: Vec<MethodId> = component
                    .iter()
                    .copied()
                    .filter(|method| filter.is_none_or(|dirty| dirty.contains(method)))
                    .collect();
                if members.is_empty() || !members.iter().any(|m| changed_now.contains(m)) {
                    continue;
                }

                let mut rounds = 1;
                loop {
                    if rounds >= self.config.scc_round_cap {
                        summary.scc_rounds_capped += 1;
                        debug!(
                            component = component_index,
                            cap = self.config.scc_round_cap,
                            "component repeat cap reached"
                        );
                        break;
                    }
                    let results =
                        scheduler.run_batch(&members, |method| self.analyze_method(method))?;
                    summary.method_analyses += members.len();
                    rounds += 1;

                    let pass_changed: Vec<MethodId> = members
                        .iter()
                        .zip(&results)
                        .filter(|(_, &changed)| changed)
                        .map(|(&method, _)| method)
                        .collect();
                    if pass_changed.is_empty() {
                        break;
                    }
                    changed_now.extend(pass_changed.iter().copied());
                    changed_overall.extend(pass_changed);
                }
            }
        }

        Ok(changed_overall)
    }

    /// Run one method's forward and backward fixpoints and publish its
    /// model. Returns whether the published model grew.
    fn analyze_method(&self, method: MethodId) -> Result<bool> {
        let old_model = self.registry.get(method);
        if old_model.skip_analysis() {
            trace!(method = %self.interners.method_name(method), "skipping");
            return Ok(false);
        }

        let Some(cfg) = self.program.cfg(method) else {
            return Err(EngineError::MissingCfg {
                method: self.interners.method_name(method),
            });
        };

        let name = self.interners.method_name(method);
        trace!(method = %name, "analyzing");

        let ops = EnvironmentOps {
            max_tree_height: self.config.maximum_tree_height,
        };
        let mut context = MethodContext::new(
            method,
            Arc::clone(&old_model),
            self.registry,
            self.interners,
            self.config,
        );

        {
            let solver = MonotonicFixpoint::new(Direction::Forward)
                .with_max_node_visits(self.config.maximum_node_visits);
            let mut transfer = TaintTransfer {
                context: &mut context,
                analyzer: self.forward,
            };
            solver.run(cfg, &name, &ops, Environment::initial(), &mut transfer)?;
        }
        {
            let solver = MonotonicFixpoint::new(Direction::Backward)
                .with_max_node_visits(self.config.maximum_node_visits);
            let mut transfer = TaintTransfer {
                context: &mut context,
                analyzer: self.backward,
            };
            solver.run(cfg, &name, &ops, Environment::initial(), &mut transfer)?;
        }

        let mut new_model = context.into_model();
        new_model.join_with(&old_model);
        new_model.approximate(self.config);

        let changed = !new_model.leq(&old_model);
        if changed {
            self.registry.set(new_model);
        }
        Ok(changed)
    }
}
