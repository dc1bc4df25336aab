// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]

//! # shaderlift
//!
//! A compiler middle-end that turns methods of a stack-machine bytecode,
//! already lifted into a flat instruction list with labels and jumps, into
//! structured shading-language source.
//!
//! ## Features
//!
//! - **Control flow graphs** - basic blocks, dominators and DOT export over a lifted body
//! - **Dataflow analysis** - one generic fixed-point solver and five concrete analyses
//! - **Structuring** - arbitrary reducible graphs become `if`/`loop`/labelled blocks, irreducible ones are split first
//! - **Optimisation** - constant folding, stack value inlining and dead assignment elimination
//! - **GLSL emission** - declarations, precedence-aware expressions and multi-level jumps
//! - **Parallel by default** - analyses and whole methods run on the rayon pool
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use shaderlift::prelude::*;
//!
//! let resolver = Arc::new(
//!     MemoryResolver::new(0)
//!         .with_class(ClassDescriptor::new("shaderlift/Shader", None))
//!         .with_class(ClassDescriptor::new("app/Fill", Some("shaderlift/Shader"))),
//! );
//! let context = CompilationContext::new().with_resolvers(
//!     ResolverChain::new()
//!         .with_class_resolver(resolver.clone())
//!         .with_annotation_resolver(resolver),
//! );
//!
//! let results = GlobalRef::new(
//!     "results",
//!     ShaderType::runtime_array(ShaderType::INT),
//!     GlobalKind::Buffer,
//! );
//! let method = ShaderMethod::new("app/Fill", "run", ShaderStage::Compute).with_body(vec![
//!     Instruction::Assign {
//!         location: Location::ArrayElement {
//!             array: Value::Global(results),
//!             index: Value::int(0),
//!         },
//!         value: Value::int(42),
//!     },
//!     Instruction::Return(None),
//! ]);
//!
//! let compiler = Compiler::with_context(CompileOptions::default(), context);
//! let shader = compiler.compile(&method)?;
//! println!("{}", shader.source);
//! # Ok::<(), shaderlift::Error>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Vec<Instruction> ──► IntermediaryCfg ──► passes ──► analyses ──► Structurer ──► GlslEmitter
//!      ir                 analysis          compiler    analysis      structure        emit
//! ```
//!
//! - [`ir`] - values, instructions, types and literals of the lifted body
//! - [`analysis`] - CFG construction and the dataflow framework
//! - [`structure`] - CFG to statement tree
//! - [`emit`] - statement tree to GLSL source
//! - [`compiler`] - options, passes, shared context and the per-method driver
//! - [`resolve`] - class, annotation and call side-effect lookup
//! - [`utils`] - graph algorithms and small containers shared by the above
//! - [`Error`] and [`Result`] - error handling
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`Result<T>`]. A failure aborts the compile
//! of the method that raised it; other methods compiled by
//! [`Compiler::compile_all`] are unaffected.

#[macro_use]
pub(crate) mod error;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use shaderlift::prelude::*;
///
/// let options = CompileOptions::minimal();
/// assert!(!options.optimizes());
/// ```
pub mod prelude;

/// Lifted intermediate representation.
///
/// Values form expression trees; instructions are the flat, label-and-jump
/// form a lifter produces. See [`ir::Value`] and [`ir::Instruction`].
pub mod ir;

/// Control flow graphs and dataflow analyses over lifted bodies.
pub mod analysis;

/// Control flow structuring into an abstract syntax tree.
pub mod structure;

/// GLSL source emission.
pub mod emit;

/// Compile pipeline, optimisation passes and the shared compile context.
pub mod compiler;

/// Class, annotation and call side-effect resolution.
pub mod resolve;

/// Shared utilities: graph algorithms, bit sets, DOT escaping.
pub mod utils;

/// `shaderlift` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
///
/// # Examples
///
/// ```rust
/// use shaderlift::{Error, Result};
///
/// fn parse_version(text: &str) -> Result<u32> {
///     text.parse().map_err(|_| Error::Resolution(format!("bad version {text}")))
/// }
///
/// assert_eq!(parse_version("430").unwrap(), 430);
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `shaderlift` Error type
///
/// Each variant documents when it is raised.
pub use error::Error;

/// The per-method compile driver and its configuration.
///
/// See [`compiler::Compiler`] for the stages a method goes through.
pub use compiler::{CompilationContext, CompileOptions, Compiler, ShaderMethod, ShaderStage};

/// Emitted shader source.
pub use emit::CompiledShader;
