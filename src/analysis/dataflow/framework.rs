//! Data flow analysis framework trait, direction and result tables.
//!
//! This module defines the core abstraction for data flow analyses. Each
//! concrete analysis (defined variables, liveness, value tracking, mutability,
//! possible values) implements the [`DataFlowAnalysis`] trait to work with the
//! [`DataFlowSolver`](super::DataFlowSolver).

use crate::{
    analysis::{
        cfg::{InstrPos, IntermediaryCfg},
        dataflow::lattice::MeetSemiLattice,
    },
    ir::Instruction,
    utils::graph::NodeId,
};

/// Direction of data flow analysis.
///
/// The direction determines how information propagates through the CFG
/// and where the head value is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Information flows forward, from entry to exit.
    ///
    /// At join points (blocks with multiple predecessors), values from
    /// all predecessors are combined using the meet operation.
    ///
    /// Examples: defined variables, value tracking.
    Forward,

    /// Information flows backward, from exit to entry.
    ///
    /// At split points (blocks with multiple successors), values from
    /// all successors are combined.
    ///
    /// Examples: live variables.
    Backward,
}

/// A data flow analysis over an [`IntermediaryCfg`].
///
/// Implementations provide the head value, the top element and the
/// per-instruction transfer function; the solver handles iteration to a
/// fixpoint.
///
/// # Direction
///
/// The `DIRECTION` constant specifies whether this is a forward or backward
/// analysis. For a forward analysis `execute` maps the fact before an
/// instruction to the fact after it; for a backward analysis it maps the fact
/// after the instruction to the fact before it.
///
/// # Example
///
/// ```rust,ignore
/// use shaderlift::analysis::{DataFlowAnalysis, Direction, InstrPos, IntermediaryCfg};
///
/// struct Assigned;
///
/// impl DataFlowAnalysis for Assigned {
///     type Lattice = MyLattice;
///     const DIRECTION: Direction = Direction::Forward;
///     const NAME: &'static str = "assigned";
///
///     fn head_value(&self, _cfg: &IntermediaryCfg) -> MyLattice {
///         MyLattice::empty()
///     }
///
///     fn top(&self, _cfg: &IntermediaryCfg) -> MyLattice {
///         MyLattice::unreached()
///     }
///
///     fn execute(&self, fact: &MyLattice, _pos: InstrPos, instr: &Instruction) -> MyLattice {
///         fact.with_target_of(instr)
///     }
/// }
/// ```
pub trait DataFlowAnalysis {
    /// The lattice type for this analysis.
    type Lattice: MeetSemiLattice;

    /// The direction of this analysis.
    const DIRECTION: Direction;

    /// Name reported in diagnostics and in [`Error::NoFixedPoint`](crate::Error::NoFixedPoint).
    const NAME: &'static str;

    /// Returns the fact injected at the boundary of the method.
    ///
    /// For forward analyses, this is the value at the entry sentinel.
    /// For backward analyses, this is the value at the exit sentinel.
    fn head_value(&self, cfg: &IntermediaryCfg) -> Self::Lattice;

    /// Returns the fact seeding every other position.
    ///
    /// This must be the identity of [`MeetSemiLattice::meet`], so that a
    /// position not yet reached by any path does not affect its neighbours.
    fn top(&self, cfg: &IntermediaryCfg) -> Self::Lattice;

    /// The per-instruction transfer function.
    ///
    /// # Arguments
    ///
    /// * `fact` - The fact flowing into the instruction (in analysis direction)
    /// * `pos` - Where the instruction sits, used as a definition token
    /// * `instruction` - The instruction
    fn execute(&self, fact: &Self::Lattice, pos: InstrPos, instruction: &Instruction)
        -> Self::Lattice;

    /// Called when analysis is complete.
    ///
    /// This hook allows analyses to derive side tables from the converged
    /// per-instruction facts. The default implementation does nothing.
    fn finalize(&mut self, _info: &AnalysisInfo<Self::Lattice>, _cfg: &IntermediaryCfg) {}
}

/// The facts on both sides of a block or instruction.
///
/// `input` always holds the fact before the block or instruction in program
/// order and `output` the fact after it, whatever the analysis direction.
#[derive(Debug, Clone, PartialEq)]
pub struct Facts<L> {
    /// Fact before, in program order.
    pub input: L,
    /// Fact after, in program order.
    pub output: L,
}

/// Converged facts of one analysis, per block and per instruction.
#[derive(Debug, Clone)]
pub struct AnalysisInfo<L> {
    blocks: Vec<Facts<L>>,
    instructions: Vec<Vec<Facts<L>>>,
    iterations: usize,
}

impl<L> AnalysisInfo<L> {
    pub(crate) fn new(
        blocks: Vec<Facts<L>>,
        instructions: Vec<Vec<Facts<L>>>,
        iterations: usize,
    ) -> Self {
        Self {
            blocks,
            instructions,
            iterations,
        }
    }

    /// Returns the facts at the boundaries of a block.
    ///
    /// # Returns
    ///
    /// The facts for the block, or `None` if the id is out of bounds.
    #[must_use]
    pub fn block(&self, block: NodeId) -> Option<&Facts<L>> {
        self.blocks.get(block.index())
    }

    /// Returns the facts around the instruction at `pos`.
    #[must_use]
    pub fn at(&self, pos: InstrPos) -> Option<&Facts<L>> {
        self.instructions.get(pos.block.index())?.get(pos.index)
    }

    /// Returns the fact holding just before the instruction at `pos`.
    #[must_use]
    pub fn before(&self, pos: InstrPos) -> Option<&L> {
        self.at(pos).map(|facts| &facts.input)
    }

    /// Returns the fact holding just after the instruction at `pos`.
    #[must_use]
    pub fn after(&self, pos: InstrPos) -> Option<&L> {
        self.at(pos).map(|facts| &facts.output)
    }

    /// Iterates the facts around every instruction, block by block.
    pub fn instructions(&self) -> impl Iterator<Item = (InstrPos, &Facts<L>)> {
        self.instructions.iter().enumerate().flat_map(|(block, facts)| {
            facts
                .iter()
                .enumerate()
                .map(move |(index, f)| (InstrPos::new(NodeId::new(block), index), f))
        })
    }

    /// Returns the number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the number of worklist iterations the solver needed.
    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }
}
