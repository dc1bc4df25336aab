//! Built-in optimisation passes.
//!
//! Each pass rewrites the instructions of a [`MethodBody`] without changing
//! the shape of its graph, and records what it did in the
//! [`EventLog`](crate::compiler::EventLog) of the context.
//!
//! The [`Compiler`](crate::compiler::Compiler) runs them as one group, in the
//! order below, repeating the group until a round changes nothing or
//! [`CompileOptions::max_pass_iterations`](crate::compiler::CompileOptions::max_pass_iterations)
//! rounds have run.
//!
//! | Pass | Description |
//! |------|-------------|
//! | [`ConstantFoldingPass`] | Replaces constant globals and operations over literals by their value |
//! | [`InlineValuesPass`] | Moves stack values into the instructions reading them |
//! | [`DeadAssignmentPass`] | Removes assignments whose value is never read |

mod constants;
mod dead;
mod inline;

pub use constants::{fold, ConstantFoldingPass};
pub use dead::DeadAssignmentPass;
pub use inline::InlineValuesPass;

use crate::compiler::pass::MethodBody;
