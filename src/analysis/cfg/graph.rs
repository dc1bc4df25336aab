//! The frozen control-flow graph of one method.

use std::{fmt::Write, sync::OnceLock};

use crate::{
    analysis::cfg::{BasicBlock, CfgEdgeKind, InstrPos},
    ir::Instruction,
    utils::{
        escape_dot,
        graph::{
            algorithms::{self, DominatorTree},
            GraphBase, NodeId, Predecessors, RootedGraph, Successors,
        },
    },
    Result,
};

/// An arena of [`BasicBlock`]s with fixed entry and exit sentinels.
///
/// Built once by [`IntermediaryCfg::build`] and never edited afterwards:
/// passes that rewrite instructions produce a new graph through
/// [`IntermediaryCfg::map_instructions`]. Block ids are dense, so analyses size
/// their per-block tables with [`block_count`](Self::block_count).
///
/// # Lazy Computation
///
/// The dominator tree is computed on first access and cached in a
/// [`OnceLock`], so a frozen graph can be shared between analyses running on
/// different threads.
#[derive(Debug, Clone)]
pub struct IntermediaryCfg {
    blocks: Vec<BasicBlock>,
    entry: NodeId,
    exit: NodeId,
    dominators: OnceLock<DominatorTree>,
}

impl IntermediaryCfg {
    /// Builds the graph of a lifted method body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DanglingLabel`](crate::Error::DanglingLabel) when a jump
    /// names a label that is not placed, or
    /// [`Error::InternalConsistency`](crate::Error::InternalConsistency) when a
    /// label is placed twice.
    pub fn build(instructions: &[Instruction]) -> Result<Self> {
        crate::analysis::cfg::builder::CfgBuilder::new(instructions).build()
    }

    pub(crate) fn from_parts(blocks: Vec<BasicBlock>, entry: NodeId, exit: NodeId) -> Self {
        Self {
            blocks,
            entry,
            exit,
            dominators: OnceLock::new(),
        }
    }

    /// Returns the entry sentinel.
    #[must_use]
    pub const fn entry(&self) -> NodeId {
        self.entry
    }

    /// Returns the exit sentinel.
    #[must_use]
    pub const fn exit(&self) -> NodeId {
        self.exit
    }

    /// Returns the number of blocks, sentinels included.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the block with the given id.
    #[must_use]
    pub fn block(&self, id: NodeId) -> Option<&BasicBlock> {
        self.blocks.get(id.index())
    }

    /// Iterates all blocks with their ids.
    pub fn blocks(&self) -> impl Iterator<Item = (NodeId, &BasicBlock)> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(i, block)| (NodeId::new(i), block))
    }

    /// Returns the instruction at `pos`.
    #[must_use]
    pub fn instruction(&self, pos: InstrPos) -> Option<&Instruction> {
        self.block(pos.block)?.instructions.get(pos.index)
    }

    /// Iterates every instruction with its position, block by block.
    pub fn instructions(&self) -> impl Iterator<Item = (InstrPos, &Instruction)> {
        self.blocks().flat_map(|(id, block)| {
            block
                .instructions
                .iter()
                .enumerate()
                .map(move |(index, instr)| (InstrPos::new(id, index), instr))
        })
    }

    /// Returns the total number of instructions.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(|b| b.instructions.len()).sum()
    }

    /// Returns the kind of each outgoing edge of `id`, parallel to its `next` list.
    #[must_use]
    pub fn edge_kinds(&self, id: NodeId) -> Vec<CfgEdgeKind> {
        let Some(block) = self.block(id) else {
            return Vec::new();
        };
        match block.terminator() {
            Some(Instruction::JumpIf { .. }) if block.next.len() == 2 => {
                vec![CfgEdgeKind::ConditionalTrue, CfgEdgeKind::ConditionalFalse]
            }
            Some(Instruction::Switch { cases, .. }) if block.next.len() == cases.len() + 1 => {
                cases
                    .iter()
                    .map(|(literal, _)| CfgEdgeKind::Switch {
                        case_value: Some(*literal),
                    })
                    .chain(std::iter::once(CfgEdgeKind::Switch { case_value: None }))
                    .collect()
            }
            _ => vec![CfgEdgeKind::Unconditional; block.next.len()],
        }
    }

    /// Returns the blocks in reverse postorder from the entry.
    #[must_use]
    pub fn reverse_postorder(&self) -> Vec<NodeId> {
        algorithms::reverse_postorder(self, self.entry)
    }

    /// Returns the blocks in postorder from the entry.
    #[must_use]
    pub fn postorder(&self) -> Vec<NodeId> {
        algorithms::postorder(self, self.entry)
    }

    /// Returns the dominator tree, computing it on first access.
    #[must_use]
    pub fn dominators(&self) -> &DominatorTree {
        self.dominators
            .get_or_init(|| algorithms::compute_dominators(self, self.entry))
    }

    /// Returns a new graph of the same shape whose instructions are produced by
    /// `f`. Returning `None` deletes the instruction.
    ///
    /// Control instructions must be kept: the edge lists are copied unchanged.
    #[must_use]
    pub fn map_instructions<F>(&self, mut f: F) -> IntermediaryCfg
    where
        F: FnMut(InstrPos, &Instruction) -> Option<Instruction>,
    {
        let blocks = self
            .blocks()
            .map(|(id, block)| BasicBlock {
                instructions: block
                    .instructions
                    .iter()
                    .enumerate()
                    .filter_map(|(index, instr)| f(InstrPos::new(id, index), instr))
                    .collect(),
                next: block.next.clone(),
                prev: block.prev.clone(),
                mergable: block.mergable,
            })
            .collect();
        IntermediaryCfg::from_parts(blocks, self.entry, self.exit)
    }

    /// Checks the structural invariants of the graph.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InternalConsistency`](crate::Error::InternalConsistency)
    /// when `next`/`prev` lists disagree, a control instruction is not last in
    /// its block, or a sentinel holds instructions.
    pub fn verify(&self) -> Result<()> {
        for (id, block) in self.blocks() {
            if !block.mergable && !block.instructions.is_empty() {
                return Err(consistency_error!("sentinel {} holds instructions", id));
            }
            let len = block.instructions.len();
            if let Some(pos) = block.instructions[..len.saturating_sub(1)]
                .iter()
                .position(Instruction::is_control)
            {
                return Err(consistency_error!(
                    "control instruction at {} is not last in its block",
                    InstrPos::new(id, pos)
                ));
            }
            for &succ in &block.next {
                let forward = block.next.iter().filter(|&&n| n == succ).count();
                let backward = self
                    .block(succ)
                    .map_or(0, |s| s.prev.iter().filter(|&&p| p == id).count());
                if forward != backward {
                    return Err(consistency_error!(
                        "edge {} -> {} recorded {} times forward and {} times backward",
                        id,
                        succ,
                        forward,
                        backward
                    ));
                }
            }
        }
        Ok(())
    }

    /// Renders the graph in Graphviz DOT format.
    #[must_use]
    pub fn to_dot(&self, title: Option<&str>) -> String {
        let mut dot = String::new();

        dot.push_str("digraph CFG {\n");
        if let Some(name) = title {
            let _ = writeln!(dot, "    label=\"CFG: {}\";", escape_dot(name));
        }
        dot.push_str("    labelloc=t;\n");
        dot.push_str("    node [shape=box, fontname=\"Courier\", fontsize=10];\n");
        dot.push_str("    edge [fontname=\"Courier\", fontsize=9];\n\n");

        for (id, block) in self.blocks() {
            let mut label = id.to_string();
            let style = if id == self.entry {
                label.push_str(" (entry)");
                ", style=filled, fillcolor=lightgreen"
            } else if id == self.exit {
                label.push_str(" (exit)");
                ", style=filled, fillcolor=lightcoral"
            } else {
                ""
            };
            label.push_str("\\l");
            for instr in &block.instructions {
                label.push_str(&escape_dot(&format!("{instr}\n")));
            }
            let _ = writeln!(dot, "    {id} [label=\"{label}\"{style}];");
        }

        dot.push('\n');

        for (id, block) in self.blocks() {
            for (target, kind) in block.next.iter().zip(self.edge_kinds(id)) {
                let _ = writeln!(
                    dot,
                    "    {id} -> {target} [label=\"{}\", color={}];",
                    escape_dot(&kind.label()),
                    kind.color()
                );
            }
        }

        dot.push_str("}\n");
        dot
    }
}

impl GraphBase for IntermediaryCfg {
    fn node_count(&self) -> usize {
        self.blocks.len()
    }
}

impl Successors for IntermediaryCfg {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.blocks[node.index()].next.iter().copied()
    }
}

impl Predecessors for IntermediaryCfg {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.blocks[node.index()].prev.iter().copied()
    }
}

impl RootedGraph for IntermediaryCfg {
    fn entry(&self) -> NodeId {
        self.entry
    }
}
