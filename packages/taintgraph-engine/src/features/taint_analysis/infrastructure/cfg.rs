//! Control flow graph view
//!
//! The engine does not build CFGs; ingestion hands it this view: an ordered
//! sequence of basic blocks of opaque instructions, a designated entry block
//! and a computed exit block, with forward and reverse iteration over a
//! block's instructions.

use crate::errors::{EngineError, Result};

/// Index of a basic block within its method's CFG.
pub type BlockId = usize;

/// One basic block: an ordered sequence of instructions plus its edges.
#[derive(Debug, Clone)]
pub struct BasicBlock<I> {
    instructions: Vec<I>,
    predecessors: Vec<BlockId>,
    successors: Vec<BlockId>,
}

impl<I> BasicBlock<I> {
    pub fn instructions(&self) -> &[I] {
        &self.instructions
    }

    pub fn predecessors(&self) -> &[BlockId] {
        &self.predecessors
    }

    pub fn successors(&self) -> &[BlockId] {
        &self.successors
    }
}

/// A method's control flow graph.
#[derive(Debug, Clone)]
pub struct ControlFlowGraph<I> {
    blocks: Vec<BasicBlock<I>>,
    entry: BlockId,
    exit: BlockId,
}

impl<I> ControlFlowGraph<I> {
    pub fn blocks(&self) -> &[BasicBlock<I>] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock<I> {
        &self.blocks[id]
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn entry(&self) -> BlockId {
        self.entry
    }

    /// The computed exit block. Methods with several returns get a
    /// synthetic empty exit during construction.
    pub fn exit(&self) -> BlockId {
        self.exit
    }

    /// Instructions of a block in program order.
    pub fn forward_instructions(&self, id: BlockId) -> impl Iterator<Item = &I> {
        self.blocks[id].instructions.iter()
    }

    /// Instructions of a block in reverse program order.
    pub fn reverse_instructions(&self, id: BlockId) -> impl Iterator<Item = &I> {
        self.blocks[id].instructions.iter().rev()
    }
}

/// Builder for control flow graphs.
///
/// Validation happens in `build`: edges must reference known blocks, the
/// entry must exist, and an exit is computed (synthesized when the graph
/// has zero or several sink blocks).
#[derive(Debug)]
pub struct CfgBuilder<I> {
    blocks: Vec<BasicBlock<I>>,
    edges: Vec<(BlockId, BlockId)>,
    entry: BlockId,
}

impl<I> CfgBuilder<I> {
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            edges: Vec::new(),
            entry: 0,
        }
    }

    /// Add a block, returning its id. The first block is the entry unless
    /// `set_entry` overrides it.
    pub fn add_block(&mut self, instructions: Vec<I>) -> BlockId {
        let id = self.blocks.len();
        self.blocks.push(BasicBlock {
            instructions,
            predecessors: Vec::new(),
            successors: Vec::new(),
        });
        id
    }

    pub fn add_edge(&mut self, from: BlockId, to: BlockId) -> &mut Self {
        self.edges.push((from, to));
        self
    }

    pub fn set_entry(&mut self, entry: BlockId) -> &mut Self {
        self.entry = entry;
        self
    }

    pub fn build(mut self) -> Result<ControlFlowGraph<I>> {
        if self.blocks.is_empty() {
            return Err(EngineError::malformed_cfg("graph has no blocks"));
        }
        if self.entry >= self.blocks.len() {
            return Err(EngineError::malformed_cfg(format!(
                "entry block {} does not exist",
                self.entry
            )));
        }
        for &(from, to) in &self.edges {
            if from >= self.blocks.len() || to >= self.blocks.len() {
                return Err(EngineError::malformed_cfg(format!(
                    "edge {} -> {} references a missing block",
                    from, to
                )));
            }
        }

        for &(from, to) in &self.edges {
            self.blocks[from].successors.push(to);
            self.blocks[to].predecessors.push(from);
        }

        // Compute the exit block: the unique block without successors, or a
        // synthetic one joining all of them.
        let sinks: Vec<BlockId> = (0..self.blocks.len())
            .filter(|&id| self.blocks[id].successors.is_empty())
            .collect();

        let exit = match sinks.as_slice() {
            [single] => *single,
            _ => {
                let exit = self.blocks.len();
                self.blocks.push(BasicBlock {
                    instructions: Vec::new(),
                    predecessors: sinks.clone(),
                    successors: Vec::new(),
                });
                for sink in sinks {
                    self.blocks[sink].successors.push(exit);
                }
                exit
            }
        };

        Ok(ControlFlowGraph {
            blocks: self.blocks,
            entry: self.entry,
            exit,
        })
    }
}

impl<I> Default for CfgBuilder<I> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_graph() {
        let mut builder = CfgBuilder::new();
        let a = builder.add_block(vec!["load", "store"]);
        let b = builder.add_block(vec!["return"]);
        builder.add_edge(a, b);

        let cfg = builder.build().unwrap();
        assert_eq!(cfg.entry(), a);
        assert_eq!(cfg.exit(), b);
        assert_eq!(cfg.block(a).successors(), &[b]);
        assert_eq!(cfg.block(b).predecessors(), &[a]);
    }

    #[test]
    fn test_reverse_iteration() {
        let mut builder = CfgBuilder::new();
        let a = builder.add_block(vec![1, 2, 3]);
        let _ = a;

        let cfg = builder.build().unwrap();
        let reversed: Vec<i32> = cfg.reverse_instructions(0).copied().collect();
        assert_eq!(reversed, vec![3, 2, 1]);
    }

    #[test]
    fn test_synthetic_exit_for_multiple_returns() {
        let mut builder = CfgBuilder::new();
        let entry = builder.add_block(vec!["branch"]);
        let left = builder.add_block(vec!["return"]);
        let right = builder.add_block(vec!["throw"]);
        builder.add_edge(entry, left);
        builder.add_edge(entry, right);

        let cfg = builder.build().unwrap();
        let exit = cfg.exit();
        assert_ne!(exit, left);
        assert_ne!(exit, right);
        assert!(cfg.block(exit).instructions().is_empty());
        assert_eq!(cfg.block(left).successors(), &[exit]);
        assert_eq!(cfg.block(right).successors(), &[exit]);
    }

    #[test]
    fn test_invalid_edges_are_rejected() {
        let mut builder = CfgBuilder::<&str>::new();
        builder.add_block(vec![]);
        builder.add_edge(0, 7);
        assert!(builder.build().is_err());

        let empty = CfgBuilder::<&str>::new();
        assert!(empty.build().is_err());
    }
}
