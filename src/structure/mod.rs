//! Control-flow structuring.
//!
//! Turns an [`IntermediaryCfg`](crate::analysis::IntermediaryCfg) into a
//! [`Method`] tree built only from sequential instructions, `If`/`IfElse`,
//! `Loop`, `LabelledBlock`, `Break`, `Continue` and `Return`. The output has the
//! same evaluation order as the graph for every input.
//!
//! # Pipeline
//!
//! 1. Lower the CFG into a mutable graph with explicit terminators
//! 2. Split nodes until the graph is reducible
//! 3. Translate the dominator tree
//! 4. Remove redundant jumps and blocks
//! 5. [`Method::verify`]
//!
//! # Examples
//!
//! ```rust,ignore
//! use shaderlift::{analysis::IntermediaryCfg, ir::ShaderType, structure::Structurer};
//!
//! let cfg = IntermediaryCfg::build(&body)?;
//! let structured = Structurer::new()
//!     .with_max_node_splits(16)
//!     .structure("main", Vec::new(), ShaderType::Void, &cfg)?;
//! assert_eq!(structured.stats.node_splits, 0);
//! ```

mod ast;
mod graph;
mod simplify;
mod split;
mod structurer;

pub use ast::{Method, Node, StructureId};
pub use structurer::{StructureStats, Structured, Structurer, DEFAULT_MAX_NODE_SPLITS};
