use std::fmt;

use crate::ir::ShaderType;

/// Storage class of a [`Variable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariableKind {
    /// A declared or synthetic local, including parameters.
    Local,
    /// A reified operand-stack slot.
    Stack,
}

/// A typed storage slot identified by `(ty, index, kind)`.
///
/// Two variables are the same slot only if all three components agree, so a
/// stack slot reused at a different type is a distinct variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    /// Static type of the slot
    pub ty: ShaderType,
    /// Local or stack index
    pub index: u32,
    /// Local or stack
    pub kind: VariableKind,
}

impl Variable {
    /// Creates a local variable.
    #[must_use]
    pub fn local(index: u32, ty: ShaderType) -> Self {
        Self {
            ty,
            index,
            kind: VariableKind::Local,
        }
    }

    /// Creates a stack variable.
    #[must_use]
    pub fn stack(index: u32, ty: ShaderType) -> Self {
        Self {
            ty,
            index,
            kind: VariableKind::Stack,
        }
    }

    /// Returns `true` for reified stack slots.
    #[must_use]
    pub fn is_stack(&self) -> bool {
        self.kind == VariableKind::Stack
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            VariableKind::Local => write!(f, "l{}", self.index),
            VariableKind::Stack => write!(f, "s{}", self.index),
        }
    }
}
