//! # shaderlift Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the shaderlift library. Import it to get quick access to everything needed to
//! build a lifted method, configure a compile and read the result.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all shaderlift operations
pub use crate::Error;

/// The result type used throughout shaderlift
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Per-method compile driver and its inputs
pub use crate::compiler::{
    CompilationContext, CompileOptions, Compiler, Parameter, ShaderMethod, ShaderStage,
};

/// Compile output
pub use crate::emit::CompiledShader;

/// Event log of a compile
pub use crate::compiler::{EventKind, EventLog};

// ================================================================================================
// Intermediate Representation
// ================================================================================================

/// Values, instructions and their building blocks
pub use crate::ir::{
    BinaryOp, CallSignature, CallValue, CompareOp, GlobalKind, GlobalRef, Instruction, LabelId,
    Literal, Location, ScalarKind, ShaderType, UnaryOp, Value, Variable, VariableKind,
};

// ================================================================================================
// Analysis and Structuring
// ================================================================================================

/// Control flow graph of a lifted body
pub use crate::analysis::{InstrPos, IntermediaryCfg};

/// Dataflow framework
pub use crate::analysis::{AnalysisInfo, DataFlowAnalysis, DataFlowSolver, Direction};

/// Structured output of the structurer
pub use crate::structure::{Method, Node, Structurer};

// ================================================================================================
// Resolution
// ================================================================================================

/// Class, annotation and side-effect resolvers
pub use crate::resolve::{
    Annotation, AnnotationResolver, CallEffectTable, CallEffects, ClassDescriptor, ClassResolver,
    MemoryResolver, MutationTarget, ResolverChain,
};

// ================================================================================================
// Emission
// ================================================================================================

/// Customisation points of the GLSL emitter
pub use crate::emit::{CallRenderer, CallTable, CallTemplate, GlslTypes, TypeRenderer};
