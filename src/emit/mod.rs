//! Source emission from structured methods.
//!
//! The [`GlslEmitter`] walks a [`Method`](crate::structure::Method) through
//! the [`AstVisitor`] callbacks and writes one GLSL compilation unit. How types,
//! literals and calls are spelled is delegated to the [`TypeRenderer`] and
//! [`CallRenderer`] collaborators held by the
//! [`CompilationContext`](crate::compiler::CompilationContext), so a front end
//! can map its own library calls onto GLSL built-ins or helper functions.
//!
//! # Key Components
//!
//! - [`GlslEmitter`] - Writes headers, declarations and the `main` body
//! - [`EmitFacts`] - Analysis results the emitter needs for declarations
//! - [`AstVisitor`] / [`walk_nodes`] - Program-order traversal of the tree
//! - [`GlslTypes`] / [`CallTable`] - Default renderers

mod glsl;
mod names;
mod render;
mod visitor;

pub use glsl::{CompiledShader, EmitFacts, GlslEmitter};
pub use render::{
    CallRenderer, CallTable, CallTemplate, GlslTypes, RenderedCall, SourceFragment, TypeRenderer,
};
pub use visitor::{walk_nodes, AstVisitor};
