use std::fmt;

use crate::ir::{ShaderType, Value};

/// Identity of a callee, the key of call-effect and call-rendering tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallSignature {
    /// Binary name of the declaring class
    pub owner: String,
    /// Method name
    pub name: String,
    /// Method descriptor
    pub descriptor: String,
}

impl CallSignature {
    /// Creates a signature.
    #[must_use]
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}

impl fmt::Display for CallSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.descriptor)
    }
}

/// A call, either as a [`Value`] or as a statement.
///
/// For instance methods the receiver is `args[0]`, so argument positions reported
/// by [`CallEffects`](crate::resolve::CallEffects) count the receiver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallValue {
    /// The callee
    pub signature: CallSignature,
    /// Argument values, receiver first
    pub args: Vec<Value>,
    /// Result type, [`ShaderType::Void`] for statements
    pub return_type: ShaderType,
}

impl CallValue {
    /// Creates a call.
    #[must_use]
    pub fn new(signature: CallSignature, args: Vec<Value>, return_type: ShaderType) -> Self {
        Self {
            signature,
            args,
            return_type,
        }
    }

    /// Returns a copy with every argument passed through `f`.
    #[must_use]
    pub fn map_args<F: FnMut(&Value) -> Value>(&self, f: F) -> CallValue {
        CallValue {
            signature: self.signature.clone(),
            args: self.args.iter().map(f).collect(),
            return_type: self.return_type.clone(),
        }
    }
}

impl fmt::Display for CallValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.signature.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")
    }
}
