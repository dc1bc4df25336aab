//! Graph algorithms for control-flow analysis.
//!
//! | Algorithm | Complexity | Used by |
//! |-----------|------------|---------|
//! | [`postorder`] / [`reverse_postorder`] | O(V + E) | dataflow worklist order, structuring |
//! | [`compute_dominators`] | O(V²) worst case, near-linear on CFGs | node splitting, structuring |

mod dominators;
mod traversal;

pub use dominators::{compute_dominators, DominatorTree};
pub use traversal::{postorder, reachable, reverse_postorder, rpo_numbering};

#[cfg(test)]
pub(crate) mod testing {
    use crate::utils::graph::{GraphBase, NodeId, Predecessors, RootedGraph, Successors};

    /// Plain adjacency-list graph rooted at node 0, used by the algorithm tests.
    pub struct AdjacencyGraph {
        succs: Vec<Vec<NodeId>>,
        preds: Vec<Vec<NodeId>>,
    }

    impl AdjacencyGraph {
        pub fn new(nodes: usize, edges: &[(usize, usize)]) -> Self {
            let mut succs = vec![Vec::new(); nodes];
            let mut preds = vec![Vec::new(); nodes];
            for &(from, to) in edges {
                succs[from].push(NodeId::new(to));
                preds[to].push(NodeId::new(from));
            }
            Self { succs, preds }
        }
    }

    impl GraphBase for AdjacencyGraph {
        fn node_count(&self) -> usize {
            self.succs.len()
        }
    }

    impl Successors for AdjacencyGraph {
        fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
            self.succs[node.index()].iter().copied()
        }
    }

    impl Predecessors for AdjacencyGraph {
        fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
            self.preds[node.index()].iter().copied()
        }
    }

    impl RootedGraph for AdjacencyGraph {
        fn entry(&self) -> NodeId {
            NodeId::new(0)
        }
    }
}
