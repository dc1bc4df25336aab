use strum::{Display, EnumIter};

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum UnaryOp {
    /// Arithmetic negation
    #[strum(serialize = "-")]
    Neg,
    /// Logical negation
    #[strum(serialize = "!")]
    Not,
    /// Bitwise complement
    #[strum(serialize = "~")]
    BitNot,
}

/// Binary arithmetic and bitwise operators.
///
/// `And`/`Or`/`Xor` are bitwise on integers and logical on booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum BinaryOp {
    /// Addition
    #[strum(serialize = "+")]
    Add,
    /// Subtraction
    #[strum(serialize = "-")]
    Sub,
    /// Multiplication
    #[strum(serialize = "*")]
    Mul,
    /// Division, truncating on integers
    #[strum(serialize = "/")]
    Div,
    /// Remainder
    #[strum(serialize = "%")]
    Rem,
    /// And
    #[strum(serialize = "&")]
    And,
    /// Or
    #[strum(serialize = "|")]
    Or,
    /// Exclusive or
    #[strum(serialize = "^")]
    Xor,
    /// Shift left
    #[strum(serialize = "<<")]
    Shl,
    /// Arithmetic shift right
    #[strum(serialize = ">>")]
    Shr,
    /// Logical shift right; rendered as `>>` on an unsigned operand
    #[strum(serialize = ">>>")]
    UShr,
}

/// Comparison operators. Comparisons always produce `bool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum CompareOp {
    /// Equal
    #[strum(serialize = "==")]
    Eq,
    /// Not equal
    #[strum(serialize = "!=")]
    Ne,
    /// Less than
    #[strum(serialize = "<")]
    Lt,
    /// Less or equal
    #[strum(serialize = "<=")]
    Le,
    /// Greater than
    #[strum(serialize = ">")]
    Gt,
    /// Greater or equal
    #[strum(serialize = ">=")]
    Ge,
}

impl CompareOp {
    /// Returns the operator testing the opposite condition.
    #[must_use]
    pub const fn negate(self) -> Self {
        match self {
            CompareOp::Eq => CompareOp::Ne,
            CompareOp::Ne => CompareOp::Eq,
            CompareOp::Lt => CompareOp::Ge,
            CompareOp::Le => CompareOp::Gt,
            CompareOp::Gt => CompareOp::Le,
            CompareOp::Ge => CompareOp::Lt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_operator_spelling() {
        assert_eq!(BinaryOp::Shl.to_string(), "<<");
        assert_eq!(UnaryOp::BitNot.to_string(), "~");
        assert_eq!(CompareOp::Le.to_string(), "<=");
    }

    #[test]
    fn test_negate_is_involution() {
        for op in CompareOp::iter() {
            assert_eq!(op.negate().negate(), op);
            assert_ne!(op.negate(), op);
        }
    }
}
