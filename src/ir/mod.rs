//! Typed intermediate representation of a single lifted method body.
//!
//! The front end hands the compiler an ordered list of [`Instruction`]s in which
//! the host operand stack is already reified as [`VariableKind::Stack`]
//! variables. Everything downstream (CFG construction, dataflow, structuring,
//! emission) operates on these closed enums.
//!
//! # Key Components
//!
//! - [`Value`] - side-effect free expression tree, plus calls
//! - [`Location`] - assignable storage
//! - [`Instruction`] - assignment, call, label, return and the CFG-only jumps
//! - [`Literal`] / [`ShaderType`] - constants and static types
//! - [`CallValue`] / [`CallSignature`] - calls and the key of the side-effect table

mod call;
mod global;
mod instruction;
mod literal;
mod ops;
mod types;
mod value;
mod variable;

pub use call::{CallSignature, CallValue};
pub use global::{GlobalKind, GlobalRef};
pub use instruction::{Instruction, LabelId, Location};
pub use literal::Literal;
pub use ops::{BinaryOp, CompareOp, UnaryOp};
pub use types::{ScalarKind, ShaderType};
pub use value::Value;
pub use variable::{Variable, VariableKind};
