//! Directed-graph abstractions shared by the CFG and the structurer.
//!
//! Graphs expose adjacency through the small trait family in [`traits`]; the
//! algorithms in [`algorithms`] are written against those traits only, so the
//! same dominator and traversal code serves the frozen [`IntermediaryCfg`] and
//! the mutable graph the structurer splits nodes in.
//!
//! [`IntermediaryCfg`]: crate::analysis::IntermediaryCfg

pub mod algorithms;
mod node;
mod traits;

pub use node::NodeId;
pub use traits::{GraphBase, Predecessors, RootedGraph, Successors};
