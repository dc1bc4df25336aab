//! Dominator trees.
//!
//! Computed with the iterative two-finger algorithm of Cooper, Harvey and
//! Kennedy over reverse postorder. On the small, mostly reducible graphs shader
//! methods produce it converges in two or three passes and needs no auxiliary
//! forest.

use crate::utils::graph::{algorithms::traversal::reverse_postorder, NodeId, Predecessors, Successors};

/// The dominator tree of a rooted graph.
///
/// Nodes unreachable from the entry have no immediate dominator and are
/// dominated by nothing but themselves.
#[derive(Debug, Clone)]
pub struct DominatorTree {
    entry: NodeId,
    idom: Vec<Option<NodeId>>,
    children: Vec<Vec<NodeId>>,
}

impl DominatorTree {
    /// Returns the root of the tree.
    #[inline]
    #[must_use]
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// Returns the immediate dominator of `node`; `None` for the entry and for
    /// unreachable nodes.
    #[must_use]
    pub fn immediate_dominator(&self, node: NodeId) -> Option<NodeId> {
        if node == self.entry {
            None
        } else {
            self.idom.get(node.index()).copied().flatten()
        }
    }

    /// Returns `true` if `a` dominates `b`. Every node dominates itself.
    #[must_use]
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        let mut current = b;
        loop {
            if current == a {
                return true;
            }
            match self.immediate_dominator(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Returns `true` if `a` dominates `b` and `a != b`.
    #[inline]
    #[must_use]
    pub fn strictly_dominates(&self, a: NodeId, b: NodeId) -> bool {
        a != b && self.dominates(a, b)
    }

    /// Returns the nodes immediately dominated by `node`, in ascending id order.
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.children
            .get(node.index())
            .map_or(&[], Vec::as_slice)
    }
}

/// Computes the dominator tree of `graph` rooted at `entry`.
pub fn compute_dominators<G>(graph: &G, entry: NodeId) -> DominatorTree
where
    G: Successors + Predecessors,
{
    let node_count = graph.node_count();
    let rpo = reverse_postorder(graph, entry);

    let mut order = vec![usize::MAX; node_count];
    for (position, node) in rpo.iter().enumerate() {
        order[node.index()] = position;
    }

    // Indexed by RPO position while iterating
    let mut idom: Vec<Option<usize>> = vec![None; rpo.len()];
    if !rpo.is_empty() {
        idom[0] = Some(0);
    }

    let mut changed = true;
    while changed {
        changed = false;
        for (position, &node) in rpo.iter().enumerate().skip(1) {
            let mut new_idom: Option<usize> = None;
            for pred in graph.predecessors(node) {
                let pred_position = order[pred.index()];
                if pred_position == usize::MAX || idom[pred_position].is_none() {
                    continue;
                }
                new_idom = Some(match new_idom {
                    None => pred_position,
                    Some(current) => intersect(&idom, current, pred_position),
                });
            }
            if new_idom.is_some() && idom[position] != new_idom {
                idom[position] = new_idom;
                changed = true;
            }
        }
    }

    let mut by_node = vec![None; node_count];
    let mut children = vec![Vec::new(); node_count];
    for (position, &node) in rpo.iter().enumerate().skip(1) {
        if let Some(parent) = idom[position] {
            let parent = rpo[parent];
            by_node[node.index()] = Some(parent);
            children[parent.index()].push(node);
        }
    }
    for list in &mut children {
        list.sort_unstable();
    }

    DominatorTree {
        entry,
        idom: by_node,
        children,
    }
}

fn intersect(idom: &[Option<usize>], mut a: usize, mut b: usize) -> usize {
    while a != b {
        while a > b {
            a = idom[a].unwrap_or(0);
        }
        while b > a {
            b = idom[b].unwrap_or(0);
        }
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::graph::algorithms::testing::AdjacencyGraph;

    fn n(i: usize) -> NodeId {
        NodeId::new(i)
    }

    #[test]
    fn test_diamond() {
        let graph = AdjacencyGraph::new(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let tree = compute_dominators(&graph, n(0));
        assert_eq!(tree.immediate_dominator(n(0)), None);
        assert_eq!(tree.immediate_dominator(n(1)), Some(n(0)));
        assert_eq!(tree.immediate_dominator(n(3)), Some(n(0)));
        assert!(tree.dominates(n(0), n(3)));
        assert!(!tree.dominates(n(1), n(3)));
        assert_eq!(tree.children(n(0)), &[n(1), n(2), n(3)]);
    }

    #[test]
    fn test_loop() {
        // 0 -> 1 -> 2 -> 1, 2 -> 3
        let graph = AdjacencyGraph::new(4, &[(0, 1), (1, 2), (2, 1), (2, 3)]);
        let tree = compute_dominators(&graph, n(0));
        assert_eq!(tree.immediate_dominator(n(2)), Some(n(1)));
        assert_eq!(tree.immediate_dominator(n(3)), Some(n(2)));
        assert!(tree.strictly_dominates(n(1), n(3)));
        assert!(!tree.strictly_dominates(n(3), n(3)));
    }

    #[test]
    fn test_irreducible_entries_not_dominating() {
        // 0 -> {1, 2}, 1 <-> 2
        let graph = AdjacencyGraph::new(3, &[(0, 1), (0, 2), (1, 2), (2, 1)]);
        let tree = compute_dominators(&graph, n(0));
        assert_eq!(tree.immediate_dominator(n(1)), Some(n(0)));
        assert_eq!(tree.immediate_dominator(n(2)), Some(n(0)));
        assert!(!tree.dominates(n(1), n(2)));
        assert!(!tree.dominates(n(2), n(1)));
    }

    #[test]
    fn test_unreachable_node() {
        let graph = AdjacencyGraph::new(3, &[(0, 1), (2, 1)]);
        let tree = compute_dominators(&graph, n(0));
        assert_eq!(tree.immediate_dominator(n(2)), None);
        assert_eq!(tree.immediate_dominator(n(1)), Some(n(0)));
        assert!(!tree.dominates(n(0), n(2)));
        assert!(tree.dominates(n(2), n(2)));
    }
}
