use std::fmt;

use crate::{ir::Instruction, utils::graph::NodeId};

/// Position of an instruction: its block and its index within the block.
///
/// Per-instruction dataflow facts and definition tokens are keyed by this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrPos {
    /// Containing block
    pub block: NodeId,
    /// Index within the block
    pub index: usize,
}

impl InstrPos {
    /// Creates a position.
    #[must_use]
    pub const fn new(block: NodeId, index: usize) -> Self {
        Self { block, index }
    }
}

impl fmt::Display for InstrPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.block, self.index)
    }
}

/// A basic block of an [`IntermediaryCfg`](crate::analysis::IntermediaryCfg).
///
/// `next` keeps one entry per outgoing edge, so a conditional jump whose both
/// sides reach the same block lists it twice; `prev` mirrors that.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    /// Instructions in execution order
    pub instructions: Vec<Instruction>,
    /// Successor blocks, in edge order
    pub next: Vec<NodeId>,
    /// Predecessor blocks
    pub prev: Vec<NodeId>,
    /// `false` for the entry and exit sentinels
    pub mergable: bool,
}

impl BasicBlock {
    /// Creates an empty, mergable block.
    #[must_use]
    pub fn new() -> Self {
        Self {
            instructions: Vec::new(),
            next: Vec::new(),
            prev: Vec::new(),
            mergable: true,
        }
    }

    /// Creates an empty sentinel block.
    #[must_use]
    pub fn sentinel() -> Self {
        Self {
            mergable: false,
            ..Self::new()
        }
    }

    /// Returns the trailing control instruction, if any.
    #[must_use]
    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions.last().filter(|instr| instr.is_control())
    }

    /// Returns `true` if the block holds no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

impl Default for BasicBlock {
    fn default() -> Self {
        Self::new()
    }
}
