//! Worklist-based data flow solver.
//!
//! This module provides the iterative solver that computes fixpoints for
//! data flow analyses. It uses a worklist algorithm seeded in reverse
//! postorder (forward analyses) or postorder (backward analyses).
//!
//! # Algorithm
//!
//! 1. Initialize every block with the analysis top
//! 2. Set the head value at the entry (forward) or exit (backward) sentinel
//! 3. Add all reachable blocks to the worklist
//! 4. While the worklist is non-empty:
//!    a. Remove a block from the worklist
//!    b. Compute its input by meeting values from predecessors/successors
//!    c. Run the transfer function over its instructions
//!    d. If the result changed, add affected blocks to the worklist
//! 5. Replay every block once more to record per-instruction facts
//! 6. Call the finalize hook for post-processing
//!
//! # Complexity
//!
//! The total work is O(n * h) block visits where n is the number of blocks and
//! h the lattice height. The solver refuses to run past `n * max_lattice_height`
//! visits and reports [`Error::NoFixedPoint`] instead, which only a
//! non-monotone analysis can trigger.

use std::collections::VecDeque;

use crate::{
    analysis::{
        cfg::{InstrPos, IntermediaryCfg},
        dataflow::{
            framework::{AnalysisInfo, DataFlowAnalysis, Direction, Facts},
            lattice::MeetSemiLattice,
        },
    },
    utils::graph::{NodeId, Predecessors, Successors},
    Error, Result,
};

/// Default bound on the height of any lattice solved without explicit configuration.
pub const DEFAULT_MAX_LATTICE_HEIGHT: usize = 1024;

/// Worklist-based data flow solver.
///
/// # Usage
///
/// ```rust,ignore
/// use shaderlift::analysis::{DataFlowSolver, LiveVariables};
///
/// let analysis = LiveVariables::new(table);
/// let mut solver = DataFlowSolver::new(analysis);
/// let info = solver.solve(&cfg)?;
///
/// let live_at_exit = info.block(cfg.exit());
/// ```
pub struct DataFlowSolver<A: DataFlowAnalysis> {
    /// The analysis being solved.
    analysis: A,
    /// Input state for each block, in program order.
    in_states: Vec<A::Lattice>,
    /// Output state for each block, in program order.
    out_states: Vec<A::Lattice>,
    /// Worklist of blocks to process.
    worklist: VecDeque<usize>,
    /// Whether each block is currently in the worklist (for deduplication).
    in_worklist: Vec<bool>,
    /// Number of iterations performed.
    iterations: usize,
    /// Bound on the lattice height used to cap iterations.
    max_lattice_height: usize,
}

impl<A: DataFlowAnalysis> DataFlowSolver<A> {
    /// Creates a new solver for the given analysis.
    #[must_use]
    pub fn new(analysis: A) -> Self {
        Self {
            analysis,
            in_states: Vec::new(),
            out_states: Vec::new(),
            worklist: VecDeque::new(),
            in_worklist: Vec::new(),
            iterations: 0,
            max_lattice_height: DEFAULT_MAX_LATTICE_HEIGHT,
        }
    }

    /// Sets the lattice height bound; iterations are capped at
    /// `blocks * height`.
    #[must_use]
    pub fn with_max_lattice_height(mut self, height: usize) -> Self {
        self.max_lattice_height = height.max(1);
        self
    }

    /// Solves the data flow analysis to a fixpoint.
    ///
    /// Returns the converged facts for every block and every instruction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoFixedPoint`] when the iteration budget is exhausted.
    pub fn solve(&mut self, cfg: &IntermediaryCfg) -> Result<AnalysisInfo<A::Lattice>> {
        self.initialize(cfg);
        self.iterate(cfg)?;

        let info = self.record(cfg);
        log::trace!(
            "{} converged after {} iterations over {} blocks",
            A::NAME,
            self.iterations,
            cfg.block_count()
        );
        self.analysis.finalize(&info, cfg);
        Ok(info)
    }

    /// Returns the number of iterations performed.
    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// Returns the analysis.
    #[must_use]
    pub const fn analysis(&self) -> &A {
        &self.analysis
    }

    /// Consumes the solver, returning the analysis with whatever its
    /// finalize hook derived.
    #[must_use]
    pub fn into_analysis(self) -> A {
        self.analysis
    }

    /// Initializes the solver state.
    fn initialize(&mut self, cfg: &IntermediaryCfg) {
        let num_blocks = cfg.block_count();
        let top = self.analysis.top(cfg);
        let head = self.analysis.head_value(cfg);

        self.in_states = vec![top.clone(); num_blocks];
        self.out_states = vec![top; num_blocks];
        self.in_worklist = vec![false; num_blocks];
        self.worklist.clear();
        self.iterations = 0;

        let order = match A::DIRECTION {
            Direction::Forward => {
                self.in_states[cfg.entry().index()] = head;
                cfg.reverse_postorder()
            }
            Direction::Backward => {
                self.out_states[cfg.exit().index()] = head;
                cfg.postorder()
            }
        };

        for node in order {
            self.enqueue(node);
        }
    }

    /// Main iteration loop.
    fn iterate(&mut self, cfg: &IntermediaryCfg) -> Result<()> {
        let limit = cfg
            .block_count()
            .max(1)
            .saturating_mul(self.max_lattice_height);

        while let Some(block_idx) = self.worklist.pop_front() {
            self.in_worklist[block_idx] = false;
            self.iterations += 1;
            if self.iterations > limit {
                return Err(Error::NoFixedPoint {
                    analysis: A::NAME,
                    iterations: self.iterations,
                });
            }

            let node = NodeId::new(block_idx);
            match A::DIRECTION {
                Direction::Forward => {
                    if self.process_forward(node, cfg) {
                        for succ in cfg.successors(node) {
                            self.enqueue(succ);
                        }
                    }
                }
                Direction::Backward => {
                    if self.process_backward(node, cfg) {
                        for pred in cfg.predecessors(node) {
                            self.enqueue(pred);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn enqueue(&mut self, node: NodeId) {
        let idx = node.index();
        if idx < self.in_worklist.len() && !self.in_worklist[idx] {
            self.worklist.push_back(idx);
            self.in_worklist[idx] = true;
        }
    }

    /// Processes a block in forward direction.
    ///
    /// Returns `true` if the output state changed.
    fn process_forward(&mut self, node: NodeId, cfg: &IntermediaryCfg) -> bool {
        let block_idx = node.index();
        if node != cfg.entry() {
            if let Some(input) = meet_all(cfg.predecessors(node), &self.out_states) {
                self.in_states[block_idx] = input;
            }
        }

        let mut fact = self.in_states[block_idx].clone();
        if let Some(block) = cfg.block(node) {
            for (index, instr) in block.instructions.iter().enumerate() {
                fact = self
                    .analysis
                    .execute(&fact, InstrPos::new(node, index), instr);
            }
        }

        let changed = fact != self.out_states[block_idx];
        self.out_states[block_idx] = fact;
        changed
    }

    /// Processes a block in backward direction.
    ///
    /// Returns `true` if the input state changed.
    fn process_backward(&mut self, node: NodeId, cfg: &IntermediaryCfg) -> bool {
        let block_idx = node.index();
        if node != cfg.exit() {
            if let Some(output) = meet_all(cfg.successors(node), &self.in_states) {
                self.out_states[block_idx] = output;
            }
        }

        let mut fact = self.out_states[block_idx].clone();
        if let Some(block) = cfg.block(node) {
            for (index, instr) in block.instructions.iter().enumerate().rev() {
                fact = self
                    .analysis
                    .execute(&fact, InstrPos::new(node, index), instr);
            }
        }

        let changed = fact != self.in_states[block_idx];
        self.in_states[block_idx] = fact;
        changed
    }

    /// Replays every block from its converged boundary fact to record the
    /// facts around each instruction.
    fn record(&self, cfg: &IntermediaryCfg) -> AnalysisInfo<A::Lattice> {
        let mut blocks = Vec::with_capacity(cfg.block_count());
        let mut instructions = Vec::with_capacity(cfg.block_count());

        for (node, block) in cfg.blocks() {
            let idx = node.index();
            let mut per_instr = Vec::with_capacity(block.instructions.len());
            match A::DIRECTION {
                Direction::Forward => {
                    let mut fact = self.in_states[idx].clone();
                    for (index, instr) in block.instructions.iter().enumerate() {
                        let output = self
                            .analysis
                            .execute(&fact, InstrPos::new(node, index), instr);
                        per_instr.push(Facts {
                            input: fact,
                            output: output.clone(),
                        });
                        fact = output;
                    }
                }
                Direction::Backward => {
                    let mut fact = self.out_states[idx].clone();
                    for (index, instr) in block.instructions.iter().enumerate().rev() {
                        let input = self
                            .analysis
                            .execute(&fact, InstrPos::new(node, index), instr);
                        per_instr.push(Facts {
                            input: input.clone(),
                            output: fact,
                        });
                        fact = input;
                    }
                    per_instr.reverse();
                }
            }
            blocks.push(Facts {
                input: self.in_states[idx].clone(),
                output: self.out_states[idx].clone(),
            });
            instructions.push(per_instr);
        }

        AnalysisInfo::new(blocks, instructions, self.iterations)
    }
}

/// Meets the states of `nodes`; `None` when there are none.
fn meet_all<L: MeetSemiLattice>(nodes: impl Iterator<Item = NodeId>, states: &[L]) -> Option<L> {
    let mut result: Option<L> = None;
    for node in nodes {
        let state = &states[node.index()];
        result = Some(match result {
            None => state.clone(),
            Some(acc) => acc.meet(state),
        });
    }
    result
}
