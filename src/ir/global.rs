use std::fmt;

use crate::ir::{Literal, ShaderType};

/// What kind of program-scope storage a [`GlobalRef`] names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GlobalKind {
    /// A built-in input such as the invocation index.
    Builtin,
    /// A uniform.
    Uniform,
    /// A shader storage buffer.
    Buffer,
    /// Work-group shared memory.
    Shared,
    /// A stage input.
    Input,
    /// A stage output.
    Output,
    /// A static final field with a known value.
    Constant(Literal),
}

/// Named program-scope storage read or written by a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlobalRef {
    /// Source-level name, also the emitted identifier
    pub name: String,
    /// Static type
    pub ty: ShaderType,
    /// Storage kind
    pub kind: GlobalKind,
}

impl GlobalRef {
    /// Creates a global reference.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: ShaderType, kind: GlobalKind) -> Self {
        Self {
            name: name.into(),
            ty,
            kind,
        }
    }

    /// Returns `true` if other invocations may write this storage concurrently.
    #[must_use]
    pub fn is_shared_memory(&self) -> bool {
        matches!(self.kind, GlobalKind::Buffer | GlobalKind::Shared)
    }

    /// Returns the known value of a constant global.
    #[must_use]
    pub fn constant_value(&self) -> Option<Literal> {
        match self.kind {
            GlobalKind::Constant(literal) => Some(literal),
            _ => None,
        }
    }
}

impl fmt::Display for GlobalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
