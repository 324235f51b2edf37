//! Call graph condensation
//!
//! Condenses the call graph into strongly connected components ordered
//! leaves-first (callees before callers), and groups the components into
//! condensation depth levels: a component's level is strictly greater than
//! the level of every component it calls into. The scheduler walks
//! components in order and processes one level as one parallel batch.
//!
//! Singleton components are non-recursive methods; multi-method components
//! are mutual recursion. Output is deterministic for a given input graph:
//! methods enter the graph in sorted id order and component members are
//! sorted.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;

use crate::features::taint_analysis::domain::MethodId;

/// Condensed call graph.
#[derive(Debug)]
pub struct CallGraphSccs {
    components: Vec<Vec<MethodId>>,
    component_of: FxHashMap<MethodId, usize>,
    levels: Vec<Vec<usize>>,
}

impl CallGraphSccs {
    /// Condense the callee relation over `methods`. Callees outside the
    /// method set are ignored; they have no code to schedule.
    pub fn build(methods: &[MethodId], mut callees: impl FnMut(MethodId) -> Vec<MethodId>) -> Self {
        let mut sorted: Vec<MethodId> = methods.to_vec();
        sorted.sort();
        sorted.dedup();

        let mut graph = DiGraph::<MethodId, ()>::new();
        let mut node_of: FxHashMap<MethodId, NodeIndex> = FxHashMap::default();
        for &method in &sorted {
            node_of.insert(method, graph.add_node(method));
        }
        for &method in &sorted {
            let from = node_of[&method];
            for callee in callees(method) {
                if let Some(&to) = node_of.get(&callee) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        // tarjan_scc returns components in reverse topological order of the
        // condensation; with caller -> callee edges that is leaves-first.
        let mut components: Vec<Vec<MethodId>> = tarjan_scc(&graph)
            .into_iter()
            .map(|component| {
                let mut members: Vec<MethodId> =
                    component.into_iter().map(|node| graph[node]).collect();
                members.sort();
                members
            })
            .collect();

        let mut component_of = FxHashMap::default();
        for (index, component) in components.iter().enumerate() {
            for &method in component {
                component_of.insert(method, index);
            }
        }

        // Depth levels over the condensation. Components come leaves-first,
        // so every callee component's level is already known.
        let mut level_of = vec![0usize; components.len()];
        for (index, component) in components.iter().enumerate() {
            let mut level = 0;
            for &method in component {
                for callee in callees(method) {
                    if let Some(&callee_component) = component_of.get(&callee) {
                        if callee_component != index {
                            level = level.max(level_of[callee_component] + 1);
                        }
                    }
                }
            }
            level_of[index] = level;
        }

        let level_count = level_of.iter().map(|&l| l + 1).max().unwrap_or(0);
        let mut levels: Vec<Vec<usize>> = vec![Vec::new(); level_count];
        for (index, &level) in level_of.iter().enumerate() {
            levels[level].push(index);
        }

        components.shrink_to_fit();
        Self {
            components,
            component_of,
            levels,
        }
    }

    /// Components leaves-first: for a cross-component call u -> v, v's
    /// component index is strictly smaller than u's.
    pub fn components(&self) -> &[Vec<MethodId>] {
        &self.components
    }

    pub fn component(&self, index: usize) -> &[MethodId] {
        &self.components[index]
    }

    /// Index of the component containing `method`.
    pub fn component_of(&self, method: MethodId) -> Option<usize> {
        self.component_of.get(&method).copied()
    }

    /// Condensation depth levels, shallowest (pure leaves) first. Every
    /// component in a level only calls into strictly earlier levels.
    pub fn levels(&self) -> &[Vec<usize>] {
        &self.levels
    }

    pub fn method_count(&self) -> usize {
        self.component_of.len()
    }
}
