//! Shared utilities: compact bit sets, DOT escaping and directed-graph algorithms.

mod bitset;
mod dot;
pub mod graph;

pub use bitset::BitSet;
pub use dot::escape_dot;
