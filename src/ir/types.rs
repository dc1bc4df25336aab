//! Semantic types of IR values.
//!
//! These mirror the host program's statically-typed shader surface: scalars,
//! fixed-size vectors and matrices, arrays and opaque named structures. The
//! textual spelling of a type is not decided here but by the
//! [`TypeRenderer`](crate::emit::TypeRenderer) collaborator.

use std::fmt;

/// Scalar component kind shared by scalars, vectors and matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// Boolean.
    Bool,
    /// 32-bit signed integer.
    Int,
    /// 32-bit unsigned integer.
    UInt,
    /// 32-bit IEEE float.
    Float,
}

/// The static type of a [`Value`](crate::ir::Value) or [`Variable`](crate::ir::Variable).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShaderType {
    /// No value (method return type only).
    Void,
    /// A single scalar.
    Scalar(ScalarKind),
    /// A vector of 2 to 4 scalars.
    Vector {
        /// Component kind
        scalar: ScalarKind,
        /// Component count
        size: u8,
    },
    /// A float matrix.
    Matrix {
        /// Column count
        columns: u8,
        /// Row count
        rows: u8,
    },
    /// An array, sized or runtime-sized.
    Array {
        /// Element type
        element: Box<ShaderType>,
        /// Fixed length, `None` for runtime-sized buffer arrays
        length: Option<u32>,
    },
    /// A named structure provided by a type adapter.
    Struct(String),
}

impl ShaderType {
    /// `bool`
    pub const BOOL: ShaderType = ShaderType::Scalar(ScalarKind::Bool);
    /// `int`
    pub const INT: ShaderType = ShaderType::Scalar(ScalarKind::Int);
    /// `uint`
    pub const UINT: ShaderType = ShaderType::Scalar(ScalarKind::UInt);
    /// `float`
    pub const FLOAT: ShaderType = ShaderType::Scalar(ScalarKind::Float);

    /// Creates a vector type.
    #[must_use]
    pub const fn vector(scalar: ScalarKind, size: u8) -> Self {
        ShaderType::Vector { scalar, size }
    }

    /// Creates a runtime-sized array of `element`.
    #[must_use]
    pub fn runtime_array(element: ShaderType) -> Self {
        ShaderType::Array {
            element: Box::new(element),
            length: None,
        }
    }

    /// Returns the scalar kind of a scalar, vector or matrix type.
    #[must_use]
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            ShaderType::Scalar(kind) | ShaderType::Vector { scalar: kind, .. } => Some(*kind),
            ShaderType::Matrix { .. } => Some(ScalarKind::Float),
            _ => None,
        }
    }

    /// Returns `true` for integer scalars (signed or unsigned).
    #[must_use]
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ShaderType::Scalar(ScalarKind::Int | ScalarKind::UInt)
        )
    }

    /// Returns the element type of an array, or the component type of a vector.
    #[must_use]
    pub fn element_type(&self) -> Option<ShaderType> {
        match self {
            ShaderType::Array { element, .. } => Some((**element).clone()),
            ShaderType::Vector { scalar, .. } => Some(ShaderType::Scalar(*scalar)),
            ShaderType::Matrix { rows, .. } => Some(ShaderType::vector(ScalarKind::Float, *rows)),
            _ => None,
        }
    }

    /// Returns `true` for host reference types whose instances can be mutated in
    /// place (vectors, matrices, arrays and structures).
    #[must_use]
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            ShaderType::Vector { .. }
                | ShaderType::Matrix { .. }
                | ShaderType::Array { .. }
                | ShaderType::Struct(_)
        )
    }
}

impl fmt::Display for ShaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderType::Void => f.write_str("void"),
            ShaderType::Scalar(ScalarKind::Bool) => f.write_str("bool"),
            ShaderType::Scalar(ScalarKind::Int) => f.write_str("int"),
            ShaderType::Scalar(ScalarKind::UInt) => f.write_str("uint"),
            ShaderType::Scalar(ScalarKind::Float) => f.write_str("float"),
            ShaderType::Vector { scalar, size } => {
                let prefix = match scalar {
                    ScalarKind::Bool => "b",
                    ScalarKind::Int => "i",
                    ScalarKind::UInt => "u",
                    ScalarKind::Float => "",
                };
                write!(f, "{prefix}vec{size}")
            }
            ShaderType::Matrix { columns, rows } if columns == rows => write!(f, "mat{columns}"),
            ShaderType::Matrix { columns, rows } => write!(f, "mat{columns}x{rows}"),
            ShaderType::Array {
                element,
                length: Some(len),
            } => write!(f, "{element}[{len}]"),
            ShaderType::Array {
                element,
                length: None,
            } => write!(f, "{element}[]"),
            ShaderType::Struct(name) => f.write_str(name),
        }
    }
}
