//! The shader compile pipeline.
//!
//! This module ties the lower layers together:
//!
//! - [`crate::analysis`] - CFG construction and dataflow
//! - [`compiler`](self) - optimisation passes, options, shared context, driver
//! - [`crate::structure`] - CFG to statement tree
//! - [`crate::emit`] - statement tree to GLSL
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Compiler Pipeline                           │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  CompilationContext          Shared state of one program         │
//! │    ├─ ResolverChain           (class and annotation lookup)      │
//! │    ├─ Renderers / effects     (types, calls, call side effects)  │
//! │    ├─ Constant registry       (hoisted const names)              │
//! │    └─ EventLog                                                   │
//! │                                                                  │
//! │  Compiler                    Per-method driver                   │
//! │    ├─ build CFG                                                  │
//! │    ├─ pass group              fold → inline → dead, to a fixpoint│
//! │    ├─ analyze_all             five analyses on the rayon pool    │
//! │    ├─ Structurer              CFG → Method tree                  │
//! │    └─ GlslEmitter             Method tree → source               │
//! │                                                                  │
//! │  ShaderPass trait            Interface for all passes            │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

mod context;
mod events;
mod options;
mod pass;
mod passes;
mod pipeline;

pub use context::{CompilationContext, HoistedConstant};
pub use events::{CompileStats, Event, EventBuilder, EventKind, EventLog, Stage};
pub use options::{CompileOptions, ShaderStage};
pub use pass::{MethodBody, ShaderPass};
pub use passes::{fold, ConstantFoldingPass, DeadAssignmentPass, InlineValuesPass};
pub use pipeline::{
    analyze_all, Compiler, LoweredMethod, MethodAnalyses, Parameter, ShaderMethod,
};
