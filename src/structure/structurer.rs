//! Dominator-tree structuring of a reducible graph.
//!
//! Every block is translated at the position of its immediate dominator. A
//! block with at least two forward in-edges (a merge node) is placed after a
//! [`Node::LabelledBlock`] wrapping the code of its dominator, and forward
//! edges into it become `Break`s of that block. A block targeted by a back
//! edge (a loop header) wraps its dominator subtree in a [`Node::Loop`], and the
//! back edges become `Continue`s. Any other successor has a single forward
//! in-edge and is translated in place, at the branch that reaches it.
//!
//! Merge children of a block are nested by reverse postorder number: the
//! labelled block of the child latest in reverse postorder is outermost.

use crate::{
    analysis::IntermediaryCfg,
    ir::{CompareOp, Instruction, ShaderType, Value, Variable, VariableKind},
    structure::{
        ast::{Method, Node, StructureId},
        graph::{StructGraph, Terminator},
        simplify::simplify,
        split::make_reducible,
    },
    utils::graph::{
        algorithms::{self, DominatorTree},
        GraphBase, NodeId, Predecessors, RootedGraph,
    },
    Result,
};

/// Default bound on the number of blocks cloned to make a graph reducible.
pub const DEFAULT_MAX_NODE_SPLITS: usize = 64;

/// Counters describing one structuring run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StructureStats {
    /// Blocks cloned by node splitting
    pub node_splits: usize,
    /// `Loop` nodes in the result
    pub loops: usize,
    /// `LabelledBlock` nodes in the result
    pub labelled_blocks: usize,
}

/// A structured method and the counters of the run that produced it.
#[derive(Debug, Clone)]
pub struct Structured {
    /// The tree
    pub method: Method,
    /// Counters
    pub stats: StructureStats,
}

/// Turns control-flow graphs into [`Method`] trees.
///
/// # Examples
///
/// ```rust,ignore
/// use shaderlift::{analysis::IntermediaryCfg, structure::Structurer};
///
/// let cfg = IntermediaryCfg::build(&body)?;
/// let structured = Structurer::new().structure("main", Vec::new(), ShaderType::Void, &cfg)?;
/// println!("{}", structured.method);
/// ```
#[derive(Debug, Clone)]
pub struct Structurer {
    max_node_splits: usize,
    simplify: bool,
}

impl Default for Structurer {
    fn default() -> Self {
        Self::new()
    }
}

impl Structurer {
    /// Creates a structurer with the default split budget and simplification on.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_node_splits: DEFAULT_MAX_NODE_SPLITS,
            simplify: true,
        }
    }

    /// Sets the maximum number of blocks node splitting may clone.
    #[must_use]
    pub fn with_max_node_splits(mut self, max: usize) -> Self {
        self.max_node_splits = max;
        self
    }

    /// Enables or disables the simplification pass.
    #[must_use]
    pub fn with_simplify(mut self, simplify: bool) -> Self {
        self.simplify = simplify;
        self
    }

    /// Structures `cfg` into the body of a method.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedConstruct`](crate::Error::UnsupportedConstruct)
    /// when the graph cannot be made reducible within the split budget, and
    /// [`Error::InternalConsistency`](crate::Error::InternalConsistency) when
    /// the resulting tree fails [`Method::verify`].
    pub fn structure(
        &self,
        name: &str,
        parameters: Vec<Variable>,
        return_type: ShaderType,
        cfg: &IntermediaryCfg,
    ) -> Result<Structured> {
        let mut graph = StructGraph::from_cfg(cfg)?;
        let node_splits = make_reducible(&mut graph, self.max_node_splits, name)?;

        let next_stack = cfg
            .instructions()
            .flat_map(|(_, instr)| {
                let mut indices = Vec::new();
                instr.for_each_read(&mut |var| {
                    if var.kind == VariableKind::Stack {
                        indices.push(var.index + 1);
                    }
                });
                if let Some(var) = instr.assigned_variable().filter(|v| v.is_stack()) {
                    indices.push(var.index + 1);
                }
                indices
            })
            .max()
            .unwrap_or(0);

        let mut walker = TreeWalker::new(&graph, next_stack);
        let mut context = Vec::new();
        let mut body = walker.do_tree(graph.entry(), &mut context)?;
        if self.simplify {
            body = simplify(body);
        }

        let method = Method {
            name: name.to_string(),
            parameters,
            return_type,
            body,
        };
        method.verify()?;

        let mut stats = StructureStats {
            node_splits,
            ..StructureStats::default()
        };
        method.walk(|node| match node {
            Node::Loop { .. } => stats.loops += 1,
            Node::LabelledBlock { .. } => stats.labelled_blocks += 1,
            _ => {}
        });
        log::debug!(
            "{name}: structured {} blocks into {} nodes ({} loops, {} labelled blocks, {} splits)",
            graph.node_count(),
            method.node_count(),
            stats.loops,
            stats.labelled_blocks,
            stats.node_splits
        );
        Ok(Structured { method, stats })
    }
}

#[derive(Debug, Clone, Copy)]
enum Enclosing {
    LoopHeadedBy(NodeId, StructureId),
    BlockFollowedBy(NodeId, StructureId),
}

struct TreeWalker<'g> {
    graph: &'g StructGraph,
    rpo: Vec<Option<usize>>,
    dominators: DominatorTree,
    loop_header: Vec<bool>,
    merge_node: Vec<bool>,
    next_id: u32,
    next_stack: u32,
}

impl<'g> TreeWalker<'g> {
    fn new(graph: &'g StructGraph, next_stack: u32) -> Self {
        let rpo = algorithms::rpo_numbering(graph, graph.entry());
        let dominators = algorithms::compute_dominators(graph, graph.entry());
        let mut loop_header = vec![false; graph.node_count()];
        let mut merge_node = vec![false; graph.node_count()];
        for node in graph.node_ids() {
            let Some(number) = rpo[node.index()] else {
                continue;
            };
            let mut forward = 0;
            for pred in graph.predecessors(node) {
                match rpo[pred.index()] {
                    Some(p) if p >= number => loop_header[node.index()] = true,
                    Some(_) => forward += 1,
                    None => {}
                }
            }
            merge_node[node.index()] = forward >= 2;
        }
        Self {
            graph,
            rpo,
            dominators,
            loop_header,
            merge_node,
            next_id: 0,
            next_stack,
        }
    }

    fn fresh_id(&mut self) -> StructureId {
        let id = StructureId(self.next_id);
        self.next_id += 1;
        id
    }

    fn rpo_of(&self, node: NodeId) -> usize {
        self.rpo[node.index()].unwrap_or(usize::MAX)
    }

    fn do_tree(&mut self, node: NodeId, context: &mut Vec<Enclosing>) -> Result<Vec<Node>> {
        let mut merges: Vec<NodeId> = self
            .dominators
            .children(node)
            .iter()
            .copied()
            .filter(|child| self.merge_node[child.index()])
            .collect();
        merges.sort_by_key(|child| std::cmp::Reverse(self.rpo_of(*child)));

        if self.loop_header[node.index()] {
            let id = self.fresh_id();
            context.push(Enclosing::LoopHeadedBy(node, id));
            let body = self.node_within(node, &merges, context);
            context.pop();
            Ok(vec![Node::Loop { id, body: body? }])
        } else {
            self.node_within(node, &merges, context)
        }
    }

    fn node_within(
        &mut self,
        node: NodeId,
        merges: &[NodeId],
        context: &mut Vec<Enclosing>,
    ) -> Result<Vec<Node>> {
        let Some((&follower, inner)) = merges.split_first() else {
            return self.translate(node, context);
        };
        let id = self.fresh_id();
        context.push(Enclosing::BlockFollowedBy(follower, id));
        let body = self.node_within(node, inner, context);
        context.pop();

        let mut code = vec![Node::LabelledBlock { id, body: body? }];
        code.extend(self.do_tree(follower, context)?);
        Ok(code)
    }

    fn translate(&mut self, node: NodeId, context: &mut Vec<Enclosing>) -> Result<Vec<Node>> {
        let graph = self.graph;
        let block = graph.block(node);
        let mut code: Vec<Node> = block
            .instructions
            .iter()
            .cloned()
            .map(Node::Instruction)
            .collect();

        match &block.terminator {
            Terminator::Goto(target) => code.extend(self.do_branch(node, *target, context)?),
            Terminator::Branch {
                condition,
                taken,
                fallthrough,
            } => {
                let then = self.do_branch(node, *taken, context)?;
                let otherwise = self.do_branch(node, *fallthrough, context)?;
                code.push(Node::IfElse {
                    condition: condition.clone(),
                    then,
                    otherwise,
                });
            }
            Terminator::Switch {
                value,
                cases,
                default,
            } => {
                let selector = if value.duplicate_inline_safe() {
                    value.clone()
                } else {
                    let temp = Variable::stack(self.next_stack, value.ty());
                    self.next_stack += 1;
                    code.push(Node::Instruction(Instruction::assign(&temp, value.clone())));
                    Value::var(&temp)
                };

                let mut arms = Vec::with_capacity(cases.len());
                for (literal, target) in cases {
                    arms.push((*literal, self.do_branch(node, *target, context)?));
                }
                let mut chain = self.do_branch(node, *default, context)?;
                for (literal, then) in arms.into_iter().rev() {
                    chain = vec![Node::IfElse {
                        condition: Value::compare(
                            CompareOp::Eq,
                            selector.clone(),
                            Value::Literal(literal),
                        ),
                        then,
                        otherwise: chain,
                    }];
                }
                code.extend(chain);
            }
            Terminator::Return(value) => code.push(Node::Return(value.clone())),
        }
        Ok(code)
    }

    fn do_branch(
        &mut self,
        from: NodeId,
        to: NodeId,
        context: &mut Vec<Enclosing>,
    ) -> Result<Vec<Node>> {
        if self.rpo_of(to) <= self.rpo_of(from) {
            let id = context.iter().rev().find_map(|entry| match entry {
                Enclosing::LoopHeadedBy(header, id) if *header == to => Some(*id),
                _ => None,
            });
            return match id {
                Some(id) => Ok(vec![Node::Continue(id)]),
                None => Err(consistency_error!(
                    "back edge {} -> {} has no enclosing loop",
                    from,
                    to
                )),
            };
        }
        if self.merge_node[to.index()] {
            let id = context.iter().rev().find_map(|entry| match entry {
                Enclosing::BlockFollowedBy(follower, id) if *follower == to => Some(*id),
                _ => None,
            });
            return match id {
                Some(id) => Ok(vec![Node::Break(id)]),
                None => Err(consistency_error!(
                    "forward edge {} -> {} has no enclosing block",
                    from,
                    to
                )),
            };
        }
        self.do_tree(to, context)
    }
}
