//! Adjacency traits the graph algorithms are written against.
//!
//! - [`GraphBase`] - node count and node iteration
//! - [`Successors`] - outgoing edges
//! - [`Predecessors`] - incoming edges
//! - [`RootedGraph`] - a designated entry node
//!
//! Adjacency queries return iterators; parallel edges are reported once per
//! edge, which the structurer relies on when it counts forward in-edges.

use crate::utils::graph::NodeId;

/// Core graph properties.
pub trait GraphBase {
    /// Returns the number of nodes, including unreachable ones.
    fn node_count(&self) -> usize;

    /// Iterates every node id in ascending order.
    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.node_count()).map(NodeId::new)
    }
}

/// Forward edge traversal.
pub trait Successors: GraphBase {
    /// Iterates the targets of the edges leaving `node`, in edge order.
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// Backward edge traversal.
pub trait Predecessors: GraphBase {
    /// Iterates the sources of the edges entering `node`.
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// A graph with a single distinguished entry node.
pub trait RootedGraph: Successors + Predecessors {
    /// Returns the entry node.
    fn entry(&self) -> NodeId;
}
