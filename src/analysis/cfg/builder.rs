//! Construction of an [`IntermediaryCfg`] from a lifted instruction list.
//!
//! # Algorithm
//!
//! 1. Map every placed label to the index of its `Label` instruction
//! 2. Give every instruction a singleton block and compute its successor
//!    indices: fall-through to `i + 1`, jump targets for `Goto`/`JumpIf`/`Switch`
//!    (taken target first), the exit sentinel for `Return` and for falling off
//!    the end
//! 3. Link the singletons, with the entry sentinel before the first block
//! 4. Drop blocks unreachable from the entry
//! 5. Walk from the entry with a work stack, merging each block with its unique
//!    successor while that successor has a unique predecessor and both are
//!    mergable, until no such pair remains
//! 6. Compact the surviving blocks into dense ids
//!
//! `Label` instructions only carry their position; the blocks built for them
//! start out empty.

use std::collections::HashMap;

use crate::{
    analysis::cfg::{BasicBlock, IntermediaryCfg},
    ir::{Instruction, LabelId},
    utils::graph::NodeId,
    Error, Result,
};

const ENTRY: usize = 0;
const EXIT: usize = 1;
const FIRST_INSTRUCTION: usize = 2;

pub(crate) struct CfgBuilder<'a> {
    instructions: &'a [Instruction],
    blocks: Vec<BasicBlock>,
    removed: Vec<bool>,
}

impl<'a> CfgBuilder<'a> {
    pub(crate) fn new(instructions: &'a [Instruction]) -> Self {
        Self {
            instructions,
            blocks: Vec::new(),
            removed: Vec::new(),
        }
    }

    pub(crate) fn build(mut self) -> Result<IntermediaryCfg> {
        let labels = self.label_positions()?;
        self.create_singletons(&labels)?;
        self.remove_unreachable();
        let merged = self.merge_chains();
        log::trace!(
            "built CFG from {} instructions, merged {} blocks",
            self.instructions.len(),
            merged
        );
        Ok(self.compact())
    }

    fn label_positions(&self) -> Result<HashMap<LabelId, usize>> {
        let mut labels = HashMap::new();
        for (index, instr) in self.instructions.iter().enumerate() {
            if let Instruction::Label(label) = instr {
                if labels.insert(*label, index).is_some() {
                    return Err(consistency_error!("label {} placed twice", label));
                }
            }
        }
        Ok(labels)
    }

    fn block_of(index: usize) -> usize {
        FIRST_INSTRUCTION + index
    }

    fn create_singletons(&mut self, labels: &HashMap<LabelId, usize>) -> Result<()> {
        let instructions = self.instructions;
        let count = instructions.len();
        self.blocks = vec![BasicBlock::sentinel(), BasicBlock::sentinel()];
        self.blocks.extend((0..count).map(|_| BasicBlock::new()));
        self.removed = vec![false; self.blocks.len()];

        let fallthrough = |index: usize| {
            if index + 1 < count {
                Self::block_of(index + 1)
            } else {
                EXIT
            }
        };
        let resolve = |label: &LabelId| {
            labels
                .get(label)
                .map(|&index| Self::block_of(index))
                .ok_or(Error::DanglingLabel(*label))
        };

        let entry_target = if count == 0 { EXIT } else { Self::block_of(0) };
        self.link(ENTRY, entry_target);

        for (index, instr) in instructions.iter().enumerate() {
            let block = Self::block_of(index);
            let successors = match instr {
                Instruction::Goto(label) => vec![resolve(label)?],
                Instruction::JumpIf { target, .. } => vec![resolve(target)?, fallthrough(index)],
                Instruction::Switch { .. } => instr
                    .jump_targets()
                    .iter()
                    .map(resolve)
                    .collect::<Result<Vec<_>>>()?,
                Instruction::Return(_) => vec![EXIT],
                _ => vec![fallthrough(index)],
            };
            if !matches!(instr, Instruction::Label(_)) {
                self.blocks[block].instructions.push(instr.clone());
            }
            for succ in successors {
                self.link(block, succ);
            }
        }
        Ok(())
    }

    fn link(&mut self, from: usize, to: usize) {
        self.blocks[from].next.push(NodeId::new(to));
        self.blocks[to].prev.push(NodeId::new(from));
    }

    fn remove_unreachable(&mut self) {
        let mut reachable = vec![false; self.blocks.len()];
        let mut stack = vec![ENTRY];
        reachable[ENTRY] = true;
        while let Some(block) = stack.pop() {
            for succ in &self.blocks[block].next {
                if !reachable[succ.index()] {
                    reachable[succ.index()] = true;
                    stack.push(succ.index());
                }
            }
        }

        for (index, live) in reachable.iter().enumerate() {
            if !live && index != EXIT {
                self.removed[index] = true;
            }
        }
        for block in &mut self.blocks {
            block.prev.retain(|p| reachable[p.index()]);
        }
        for index in 0..self.blocks.len() {
            if self.removed[index] {
                self.blocks[index] = BasicBlock::new();
            }
        }
    }

    fn can_merge(&self, block: usize) -> Option<usize> {
        let current = &self.blocks[block];
        let [succ] = current.next.as_slice() else {
            return None;
        };
        let succ = succ.index();
        let candidate = &self.blocks[succ];
        (succ != block && candidate.prev.len() == 1 && current.mergable && candidate.mergable)
            .then_some(succ)
    }

    /// Returns the number of blocks absorbed into a predecessor.
    fn merge_chains(&mut self) -> usize {
        let mut merged = 0;
        let mut visited = vec![false; self.blocks.len()];
        let mut stack = vec![ENTRY];
        visited[ENTRY] = true;

        while let Some(block) = stack.pop() {
            if self.removed[block] {
                continue;
            }
            while let Some(succ) = self.can_merge(block) {
                self.absorb(block, succ);
                merged += 1;
            }
            for next in self.blocks[block].next.clone() {
                if !visited[next.index()] {
                    visited[next.index()] = true;
                    stack.push(next.index());
                }
            }
        }
        merged
    }

    fn absorb(&mut self, block: usize, succ: usize) {
        let absorbed = std::mem::take(&mut self.blocks[succ]);
        let target = &mut self.blocks[block];
        // The only jump that can leave a block with one successor is a Goto
        // or a case-less Switch; either becomes a fall-through
        if matches!(
            target.instructions.last(),
            Some(Instruction::Goto(_) | Instruction::Switch { .. })
        ) {
            target.instructions.pop();
        }
        target.instructions.extend(absorbed.instructions);
        target.next = absorbed.next;

        for next in self.blocks[block].next.clone() {
            for prev in &mut self.blocks[next.index()].prev {
                if prev.index() == succ {
                    *prev = NodeId::new(block);
                }
            }
        }
        self.removed[succ] = true;
    }

    fn compact(self) -> IntermediaryCfg {
        let mut remap = vec![None; self.blocks.len()];
        let mut next_id = 0;
        for (index, removed) in self.removed.iter().enumerate() {
            if !removed {
                remap[index] = Some(NodeId::new(next_id));
                next_id += 1;
            }
        }
        let translate = |ids: &[NodeId]| -> Vec<NodeId> {
            ids.iter().filter_map(|id| remap[id.index()]).collect()
        };

        let blocks = self
            .blocks
            .iter()
            .zip(&self.removed)
            .filter(|(_, removed)| !**removed)
            .map(|(block, _)| BasicBlock {
                instructions: block.instructions.clone(),
                next: translate(&block.next),
                prev: translate(&block.prev),
                mergable: block.mergable,
            })
            .collect();

        IntermediaryCfg::from_parts(blocks, NodeId::new(ENTRY), NodeId::new(EXIT))
    }
}
