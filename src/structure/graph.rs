//! Mutable working graph of the structurer.
//!
//! The frozen [`IntermediaryCfg`] is lowered once into blocks whose control
//! transfer is an explicit [`Terminator`]. Node splitting then adds cloned
//! blocks to this graph without touching the CFG.

use crate::{
    analysis::IntermediaryCfg,
    ir::{Instruction, Literal, Value},
    utils::graph::{GraphBase, NodeId, Predecessors, RootedGraph, Successors},
    Result,
};

/// How control leaves a block.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Terminator {
    /// Continue with the given block.
    Goto(NodeId),
    /// Two-way branch.
    Branch {
        condition: Value,
        taken: NodeId,
        fallthrough: NodeId,
    },
    /// Multi-way branch.
    Switch {
        value: Value,
        cases: Vec<(Literal, NodeId)>,
        default: NodeId,
    },
    /// Leave the method.
    Return(Option<Value>),
}

impl Terminator {
    /// Returns the successors, one entry per edge.
    pub(crate) fn targets(&self) -> Vec<NodeId> {
        match self {
            Terminator::Goto(target) => vec![*target],
            Terminator::Branch {
                taken, fallthrough, ..
            } => vec![*taken, *fallthrough],
            Terminator::Switch { cases, default, .. } => cases
                .iter()
                .map(|(_, target)| *target)
                .chain(std::iter::once(*default))
                .collect(),
            Terminator::Return(_) => Vec::new(),
        }
    }

    /// Returns a copy with every target passed through `f`.
    pub(crate) fn retarget<F: FnMut(NodeId) -> NodeId>(&self, mut f: F) -> Terminator {
        match self {
            Terminator::Goto(target) => Terminator::Goto(f(*target)),
            Terminator::Branch {
                condition,
                taken,
                fallthrough,
            } => Terminator::Branch {
                condition: condition.clone(),
                taken: f(*taken),
                fallthrough: f(*fallthrough),
            },
            Terminator::Switch {
                value,
                cases,
                default,
            } => Terminator::Switch {
                value: value.clone(),
                cases: cases.iter().map(|(lit, target)| (*lit, f(*target))).collect(),
                default: f(*default),
            },
            Terminator::Return(value) => Terminator::Return(value.clone()),
        }
    }
}

/// A block of straight-line instructions and its terminator.
#[derive(Debug, Clone)]
pub(crate) struct StructBlock {
    pub(crate) instructions: Vec<Instruction>,
    pub(crate) terminator: Terminator,
}

/// The graph the structurer splits and walks.
#[derive(Debug, Clone)]
pub(crate) struct StructGraph {
    blocks: Vec<StructBlock>,
    preds: Vec<Vec<NodeId>>,
    entry: NodeId,
}

impl StructGraph {
    /// Lowers a CFG. Block ids are kept, so node `n` here is block `n` there.
    pub(crate) fn from_cfg(cfg: &IntermediaryCfg) -> Result<Self> {
        let mut blocks = Vec::with_capacity(cfg.block_count());
        for (id, block) in cfg.blocks() {
            let mut instructions = block.instructions.clone();
            let control = match instructions.last() {
                Some(last) if last.is_control() => instructions.pop(),
                _ => None,
            };
            let next = &block.next;
            let terminator = match control {
                Some(Instruction::Return(value)) => Terminator::Return(value),
                Some(Instruction::JumpIf { condition, .. }) if next.len() == 2 => {
                    Terminator::Branch {
                        condition,
                        taken: next[0],
                        fallthrough: next[1],
                    }
                }
                Some(Instruction::Switch { value, cases, .. }) if next.len() == cases.len() + 1 => {
                    Terminator::Switch {
                        value,
                        cases: cases
                            .iter()
                            .zip(next)
                            .map(|((literal, _), target)| (*literal, *target))
                            .collect(),
                        default: next[cases.len()],
                    }
                }
                Some(Instruction::Goto(_)) | None if next.len() == 1 => Terminator::Goto(next[0]),
                None if id == cfg.exit() => Terminator::Return(None),
                Some(other) => {
                    return Err(consistency_error!(
                        "block {} ends with {} but has {} successors",
                        id,
                        other,
                        next.len()
                    ))
                }
                None => {
                    return Err(consistency_error!(
                        "block {} falls through to {} successors",
                        id,
                        next.len()
                    ))
                }
            };
            if instructions.iter().any(Instruction::is_cfg_only) {
                return Err(consistency_error!("block {} holds a jump or label", id));
            }
            blocks.push(StructBlock {
                instructions,
                terminator,
            });
        }

        let mut graph = Self {
            blocks,
            preds: Vec::new(),
            entry: cfg.entry(),
        };
        graph.rebuild_predecessors();
        Ok(graph)
    }

    #[cfg(test)]
    pub(crate) fn from_blocks(blocks: Vec<StructBlock>, entry: NodeId) -> Self {
        let mut graph = Self {
            blocks,
            preds: Vec::new(),
            entry,
        };
        graph.rebuild_predecessors();
        graph
    }

    /// Returns the block with the given id.
    pub(crate) fn block(&self, id: NodeId) -> &StructBlock {
        &self.blocks[id.index()]
    }

    /// Appends a block and returns its id. Predecessor lists are stale until
    /// [`rebuild_predecessors`](Self::rebuild_predecessors).
    pub(crate) fn push(&mut self, block: StructBlock) -> NodeId {
        self.blocks.push(block);
        NodeId::new(self.blocks.len() - 1)
    }

    /// Replaces the terminator of `id`.
    pub(crate) fn set_terminator(&mut self, id: NodeId, terminator: Terminator) {
        self.blocks[id.index()].terminator = terminator;
    }

    /// Recomputes every predecessor list from the terminators.
    pub(crate) fn rebuild_predecessors(&mut self) {
        let mut preds = vec![Vec::new(); self.blocks.len()];
        for (index, block) in self.blocks.iter().enumerate() {
            for target in block.terminator.targets() {
                preds[target.index()].push(NodeId::new(index));
            }
        }
        self.preds = preds;
    }
}

impl GraphBase for StructGraph {
    fn node_count(&self) -> usize {
        self.blocks.len()
    }
}

impl Successors for StructGraph {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.blocks[node.index()].terminator.targets().into_iter()
    }
}

impl Predecessors for StructGraph {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.preds[node.index()].iter().copied()
    }
}

impl RootedGraph for StructGraph {
    fn entry(&self) -> NodeId {
        self.entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{LabelId, ShaderType, Variable};

    #[test]
    fn test_lowering_terminators() -> Result<()> {
        let l0 = Variable::local(0, ShaderType::INT);
        let cfg = IntermediaryCfg::build(&[
            Instruction::JumpIf {
                condition: Value::var(&l0),
                target: LabelId(0),
            },
            Instruction::assign(&l0, Value::int(1)),
            Instruction::Label(LabelId(0)),
            Instruction::Return(Some(Value::var(&l0))),
        ])?;
        let graph = StructGraph::from_cfg(&cfg)?;

        let first = cfg.block(cfg.entry()).unwrap().next[0];
        let Terminator::Branch {
            taken, fallthrough, ..
        } = &graph.block(first).terminator
        else {
            panic!("expected a branch");
        };
        assert!(graph.block(first).instructions.is_empty());
        assert_eq!(graph.block(*fallthrough).terminator, Terminator::Goto(*taken));
        assert_eq!(
            graph.block(*taken).terminator,
            Terminator::Return(Some(Value::var(&l0)))
        );
        assert_eq!(graph.block(cfg.exit()).terminator, Terminator::Return(None));
        assert_eq!(graph.predecessors(*taken).count(), 2);
        Ok(())
    }
}
