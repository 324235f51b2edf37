//! Application layer: the analysis facade
//!
//! Bundles the providers, analyzers, interners, configuration and a fresh
//! registry into one service with a single entry point.

use crate::config::AnalysisConfig;
use crate::errors::Result;
use crate::features::taint_analysis::domain::{Interners, Model};
use crate::features::taint_analysis::infrastructure::{
    AnalysisSummary, InterproceduralAnalysis, Registry,
};
use crate::features::taint_analysis::ports::{
    CallGraphProvider, CfgProvider, InstructionAnalyzer, ModelDto,
};

/// Whole-program taint analysis service.
pub struct TaintAnalysis<'a, P, F, B>
where
    P: CallGraphProvider + CfgProvider,
{
    program: &'a P,
    forward: &'a F,
    backward: &'a B,
    interners: &'a Interners,
    config: AnalysisConfig,
    registry: Registry,
}

impl<'a, P, F, B> TaintAnalysis<'a, P, F, B>
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
        interners: &'a Interners,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            program,
            forward,
            backward,
            interners,
            config,
            registry: Registry::new(),
        }
    }

    /// Seed a declared model (from rules or a previous run) before the
    /// analysis starts.
    pub fn seed_model(&self, model: Model) {
        self.registry.join_with(model);
    }

    /// Run the global fixpoint.
    pub fn run(&self) -> Result<AnalysisSummary> {
        InterproceduralAnalysis::new(
            self.program,
            self.forward,
            self.backward,
            &self.registry,
            self.interners,
            &self.config,
        )
        .run()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Export every model through the serialization boundary, sorted by
    /// method id.
    pub fn export_models(&self) -> Vec<ModelDto> {
        self.registry
            .models()
            .iter()
            .map(|model| ModelDto::from_model(model, self.interners))
            .collect()
    }
}
