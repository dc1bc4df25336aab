//! Control-flow graph construction.
//!
//! A lifted method body is partitioned into [`BasicBlock`]s held in an arena,
//! [`IntermediaryCfg`], addressed by [`NodeId`](crate::utils::graph::NodeId).
//! Edges are index lists on both ends; the kind of each outgoing edge follows
//! from the block terminator ([`CfgEdgeKind`]).
//!
//! # Key Components
//!
//! - [`IntermediaryCfg`] - The frozen graph, its traversal orders and DOT export
//! - [`BasicBlock`] - Instructions plus `next`/`prev` adjacency
//! - [`InstrPos`] - Stable `(block, index)` key of an instruction
//!
//! # Examples
//!
//! ```rust,ignore
//! use shaderlift::analysis::IntermediaryCfg;
//!
//! let cfg = IntermediaryCfg::build(&instructions)?;
//! for block in cfg.reverse_postorder() {
//!     println!("{block}: {} instructions", cfg.block(block).unwrap().instructions.len());
//! }
//! ```

mod block;
mod builder;
mod edge;
mod graph;

pub use block::{BasicBlock, InstrPos};
pub use edge::CfgEdgeKind;
pub use graph::IntermediaryCfg;
