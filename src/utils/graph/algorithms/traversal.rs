use crate::utils::graph::{NodeId, Successors};

/// Computes the postorder of the nodes reachable from `start`.
///
/// Successors are explored in edge order, so the first successor of a branch
/// is finished first and follows its siblings in reverse postorder.
///
/// Returns an empty vector when `start` is not a node of `graph`.
pub fn postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let node_count = graph.node_count();
    if start.index() >= node_count {
        return Vec::new();
    }

    let mut visited = vec![false; node_count];
    let mut order = Vec::with_capacity(node_count);
    // (node, successors not yet explored)
    let mut stack: Vec<(NodeId, Vec<NodeId>)> = Vec::new();

    visited[start.index()] = true;
    stack.push((start, pending_successors(graph, start)));

    while let Some((node, pending)) = stack.last_mut() {
        match pending.pop() {
            Some(succ) if !visited[succ.index()] => {
                visited[succ.index()] = true;
                let succs = pending_successors(graph, succ);
                stack.push((succ, succs));
            }
            Some(_) => {}
            None => {
                order.push(*node);
                stack.pop();
            }
        }
    }

    order
}

fn pending_successors<G: Successors>(graph: &G, node: NodeId) -> Vec<NodeId> {
    // Reversed so that `pop` yields successors in edge order
    let mut succs: Vec<NodeId> = graph.successors(node).collect();
    succs.reverse();
    succs
}

/// Computes the reverse postorder of the nodes reachable from `start`.
///
/// In the absence of back edges every node precedes its successors, which makes
/// this the iteration order of forward dataflow problems.
pub fn reverse_postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let mut order = postorder(graph, start);
    order.reverse();
    order
}

/// Maps every node to its position in reverse postorder, `None` if unreachable.
pub fn rpo_numbering<G: Successors>(graph: &G, start: NodeId) -> Vec<Option<usize>> {
    let mut numbers = vec![None; graph.node_count()];
    for (position, node) in reverse_postorder(graph, start).into_iter().enumerate() {
        numbers[node.index()] = Some(position);
    }
    numbers
}

/// Returns the reachability mask of the nodes reachable from `start`.
pub fn reachable<G: Successors>(graph: &G, start: NodeId) -> Vec<bool> {
    let mut seen = vec![false; graph.node_count()];
    if start.index() >= seen.len() {
        return seen;
    }
    let mut worklist = vec![start];
    seen[start.index()] = true;
    while let Some(node) = worklist.pop() {
        for succ in graph.successors(node) {
            if !seen[succ.index()] {
                seen[succ.index()] = true;
                worklist.push(succ);
            }
        }
    }
    seen
}
