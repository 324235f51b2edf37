//! Call-order scheduling
//!
//! Walks the condensed call graph leaves-first and drives a fixed-size
//! worker pool. A method is never handed to the pool before every component
//! preceding its own has completed at least one pass, so a caller reading a
//! callee's model mid-analysis sees at least the callee's first-pass
//! summary instead of bottom.
//!
//! Each batch is a set: at most one in-flight analysis per method, which is
//! what makes registry writes race-free per method.

use rayon::prelude::*;
use rustc_hash::FxHashSet;

use crate::config::AnalysisConfig;
use crate::errors::{EngineError, Result};
use crate::features::taint_analysis::domain::MethodId;
use crate::features::taint_analysis::ports::CallGraphProvider;

use super::scc::CallGraphSccs;

/// Scheduler over a condensed call graph and a worker pool.
pub struct Scheduler {
    sccs: CallGraphSccs,
    pool: rayon::ThreadPool,
    worker_count: usize,
}

impl Scheduler {
    pub fn new(sccs: CallGraphSccs, worker_count: usize) -> Result<Self> {
        let worker_count = worker_count.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_count)
            .build()
            .map_err(|error| EngineError::WorkerPool(error.to_string()))?;
        Ok(Self {
            sccs,
            pool,
            worker_count,
        })
    }

    /// Condense a call graph provider and build the worker pool.
    pub fn from_call_graph(
        call_graph: &impl CallGraphProvider,
        config: &AnalysisConfig,
    ) -> Result<Self> {
        let methods = call_graph.methods();
        let sccs = CallGraphSccs::build(&methods, |method| call_graph.callees(method));
        Self::new(sccs, config.worker_count)
    }

    pub fn sccs(&self) -> &CallGraphSccs {
        &self.sccs
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Enqueue every method leaves-first. The priority is the index of the
    /// method's component: for a cross-component call u -> v, v is enqueued
    /// with a strictly smaller priority than u.
    pub fn schedule(&self, mut enqueue: impl FnMut(MethodId, usize)) {
        for (priority, component) in self.sccs.components().iter().enumerate() {
            for &method in component {
                enqueue(method, priority);
            }
        }
    }

    /// Run one task per method on the worker pool and collect the results.
    ///
    /// A duplicate in the batch would mean two in-flight analyses of the
    /// same method writing the registry concurrently; that is a scheduling
    /// invariant violation and fatal.
    pub fn run_batch<T, F>(&self, methods: &[MethodId], task: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(MethodId) -> Result<T> + Sync,
    {
        let mut seen = FxHashSet::default();
        for &method in methods {
            if !seen.insert(method) {
                return Err(EngineError::SchedulerInvariant(format!(
                    "method {:?} scheduled twice in one batch",
                    method
                )));
            }
        }
        self.pool
            .install(|| methods.par_iter().map(|&method| task(method)).collect())
    }
}
