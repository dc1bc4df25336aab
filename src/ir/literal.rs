//! Compile-time literal values and their arithmetic.
//!
//! Integer arithmetic wraps, matching both the host bytecode and GLSL. Floats
//! compare and hash by bit pattern so literals can be used as map keys and so
//! a `NaN` literal is equal to itself.

use std::{
    fmt,
    hash::{Hash, Hasher},
};

use crate::ir::{BinaryOp, CompareOp, ScalarKind, ShaderType, UnaryOp};

/// A literal scalar.
#[derive(Debug, Clone, Copy)]
pub enum Literal {
    /// Boolean literal.
    Bool(bool),
    /// Signed 32-bit integer literal.
    Int(i32),
    /// Unsigned 32-bit integer literal.
    UInt(u32),
    /// 32-bit float literal.
    Float(f32),
}

impl Literal {
    /// Returns the scalar type of this literal.
    #[must_use]
    pub const fn ty(&self) -> ShaderType {
        match self {
            Literal::Bool(_) => ShaderType::Scalar(ScalarKind::Bool),
            Literal::Int(_) => ShaderType::Scalar(ScalarKind::Int),
            Literal::UInt(_) => ShaderType::Scalar(ScalarKind::UInt),
            Literal::Float(_) => ShaderType::Scalar(ScalarKind::Float),
        }
    }

    /// Returns the literal as an `i32` when it is integral or boolean.
    #[must_use]
    pub const fn as_i32(&self) -> Option<i32> {
        match self {
            Literal::Int(v) => Some(*v),
            Literal::UInt(v) => Some(*v as i32),
            Literal::Bool(b) => Some(*b as i32),
            Literal::Float(_) => None,
        }
    }

    /// Returns the literal as a `bool`; integers are true when non-zero.
    #[must_use]
    pub fn as_bool(&self) -> bool {
        match self {
            Literal::Bool(b) => *b,
            Literal::Int(v) => *v != 0,
            Literal::UInt(v) => *v != 0,
            Literal::Float(v) => *v != 0.0,
        }
    }

    /// Folds a unary operation.
    #[must_use]
    pub fn apply_unary(op: UnaryOp, operand: Literal) -> Option<Literal> {
        Some(match (op, operand) {
            (UnaryOp::Neg, Literal::Int(v)) => Literal::Int(v.wrapping_neg()),
            (UnaryOp::Neg, Literal::UInt(v)) => Literal::UInt(v.wrapping_neg()),
            (UnaryOp::Neg, Literal::Float(v)) => Literal::Float(-v),
            (UnaryOp::Not, Literal::Bool(b)) => Literal::Bool(!b),
            (UnaryOp::BitNot, Literal::Int(v)) => Literal::Int(!v),
            (UnaryOp::BitNot, Literal::UInt(v)) => Literal::UInt(!v),
            _ => return None,
        })
    }

    /// Folds a binary operation over two literals of the same kind.
    ///
    /// Returns `None` when the operand kinds differ, the operation is undefined
    /// for them, or the result is a division by zero.
    #[must_use]
    pub fn apply_binary(op: BinaryOp, lhs: Literal, rhs: Literal) -> Option<Literal> {
        match (lhs, rhs) {
            (Literal::Int(a), Literal::Int(b)) => {
                let shift = (b & 31) as u32;
                Some(Literal::Int(match op {
                    BinaryOp::Add => a.wrapping_add(b),
                    BinaryOp::Sub => a.wrapping_sub(b),
                    BinaryOp::Mul => a.wrapping_mul(b),
                    BinaryOp::Div if b != 0 => a.wrapping_div(b),
                    BinaryOp::Rem if b != 0 => a.wrapping_rem(b),
                    BinaryOp::And => a & b,
                    BinaryOp::Or => a | b,
                    BinaryOp::Xor => a ^ b,
                    BinaryOp::Shl => a.wrapping_shl(shift),
                    BinaryOp::Shr => a.wrapping_shr(shift),
                    BinaryOp::UShr => ((a as u32) >> shift) as i32,
                    _ => return None,
                }))
            }
            (Literal::UInt(a), Literal::UInt(b)) => {
                let shift = b & 31;
                Some(Literal::UInt(match op {
                    BinaryOp::Add => a.wrapping_add(b),
                    BinaryOp::Sub => a.wrapping_sub(b),
                    BinaryOp::Mul => a.wrapping_mul(b),
                    BinaryOp::Div if b != 0 => a / b,
                    BinaryOp::Rem if b != 0 => a % b,
                    BinaryOp::And => a & b,
                    BinaryOp::Or => a | b,
                    BinaryOp::Xor => a ^ b,
                    BinaryOp::Shl => a.wrapping_shl(shift),
                    BinaryOp::Shr | BinaryOp::UShr => a.wrapping_shr(shift),
                    _ => return None,
                }))
            }
            (Literal::Float(a), Literal::Float(b)) => Some(Literal::Float(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                BinaryOp::Rem => a % b,
                _ => return None,
            })),
            (Literal::Bool(a), Literal::Bool(b)) => Some(Literal::Bool(match op {
                BinaryOp::And => a & b,
                BinaryOp::Or => a | b,
                BinaryOp::Xor => a ^ b,
                _ => return None,
            })),
            _ => None,
        }
    }

    /// Folds a comparison.
    #[must_use]
    pub fn apply_compare(op: CompareOp, lhs: Literal, rhs: Literal) -> Option<Literal> {
        use std::cmp::Ordering;

        let ordering = match (lhs, rhs) {
            (Literal::Int(a), Literal::Int(b)) => a.cmp(&b),
            (Literal::UInt(a), Literal::UInt(b)) => a.cmp(&b),
            (Literal::Bool(a), Literal::Bool(b)) => a.cmp(&b),
            (Literal::Float(a), Literal::Float(b)) => match a.partial_cmp(&b) {
                Some(ordering) => ordering,
                // Every ordered comparison against NaN is false, != is true
                None => return Some(Literal::Bool(op == CompareOp::Ne)),
            },
            _ => return None,
        };
        Some(Literal::Bool(match op {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }))
    }

    /// Converts the literal to another scalar kind, following GLSL constructor rules.
    #[must_use]
    pub fn cast(self, target: ScalarKind) -> Literal {
        match (self, target) {
            (Literal::Bool(b), ScalarKind::Int) => Literal::Int(i32::from(b)),
            (Literal::Bool(b), ScalarKind::UInt) => Literal::UInt(u32::from(b)),
            (Literal::Bool(b), ScalarKind::Float) => Literal::Float(if b { 1.0 } else { 0.0 }),
            (Literal::Int(v), ScalarKind::UInt) => Literal::UInt(v as u32),
            (Literal::Int(v), ScalarKind::Float) => Literal::Float(v as f32),
            (Literal::UInt(v), ScalarKind::Int) => Literal::Int(v as i32),
            (Literal::UInt(v), ScalarKind::Float) => Literal::Float(v as f32),
            (Literal::Float(v), ScalarKind::Int) => Literal::Int(v as i32),
            (Literal::Float(v), ScalarKind::UInt) => Literal::UInt(v as u32),
            (lit, ScalarKind::Bool) => Literal::Bool(lit.as_bool()),
            (lit, _) => lit,
        }
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Literal::Bool(a), Literal::Bool(b)) => a == b,
            (Literal::Int(a), Literal::Int(b)) => a == b,
            (Literal::UInt(a), Literal::UInt(b)) => a == b,
            (Literal::Float(a), Literal::Float(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Literal::Bool(b) => b.hash(state),
            Literal::Int(v) => v.hash(state),
            Literal::UInt(v) => v.hash(state),
            Literal::Float(v) => v.to_bits().hash(state),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Int(v) => write!(f, "{v}"),
            Literal::UInt(v) => write!(f, "{v}u"),
            Literal::Float(v) => write!(f, "{v:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_folding_wraps() {
        assert_eq!(
            Literal::apply_binary(BinaryOp::Add, Literal::Int(i32::MAX), Literal::Int(1)),
            Some(Literal::Int(i32::MIN))
        );
        assert_eq!(
            Literal::apply_binary(BinaryOp::Xor, Literal::Int(0b1100), Literal::Int(0b1010)),
            Some(Literal::Int(0b0110))
        );
        assert_eq!(
            Literal::apply_binary(BinaryOp::UShr, Literal::Int(-1), Literal::Int(28)),
            Some(Literal::Int(15))
        );
    }

    #[test]
    fn test_division_by_zero_not_folded() {
        assert_eq!(
            Literal::apply_binary(BinaryOp::Div, Literal::Int(4), Literal::Int(0)),
            None
        );
        assert_eq!(
            Literal::apply_binary(BinaryOp::Rem, Literal::UInt(4), Literal::UInt(0)),
            None
        );
    }

    #[test]
    fn test_mixed_kinds_not_folded() {
        assert_eq!(
            Literal::apply_binary(BinaryOp::Add, Literal::Int(1), Literal::Float(1.0)),
            None
        );
    }

    #[test]
    fn test_compare_nan() {
        let nan = Literal::Float(f32::NAN);
        assert_eq!(
            Literal::apply_compare(CompareOp::Eq, nan, nan),
            Some(Literal::Bool(false))
        );
        assert_eq!(
            Literal::apply_compare(CompareOp::Ne, nan, nan),
            Some(Literal::Bool(true))
        );
        // Bitwise identity still holds for the literal itself
        assert_eq!(nan, nan);
    }

    #[test]
    fn test_cast() {
        assert_eq!(Literal::Int(-1).cast(ScalarKind::UInt), Literal::UInt(u32::MAX));
        assert_eq!(Literal::Float(2.9).cast(ScalarKind::Int), Literal::Int(2));
        assert_eq!(Literal::Int(0).cast(ScalarKind::Bool), Literal::Bool(false));
    }

    #[test]
    fn test_display() {
        assert_eq!(Literal::UInt(3).to_string(), "3u");
        assert_eq!(Literal::Float(1.0).to_string(), "1.0");
        assert_eq!(Literal::Int(-7).to_string(), "-7");
    }
}
