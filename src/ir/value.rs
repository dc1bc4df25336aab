use std::fmt;

use crate::ir::{
    BinaryOp, CallValue, CompareOp, GlobalRef, Literal, ShaderType, UnaryOp, Variable,
    VariableKind,
};

/// An expression tree read by an instruction.
///
/// Values other than [`Value::Call`] have no side effects. Whether a call has
/// effects is not known to the value itself; it is answered by the
/// [`CallEffects`](crate::resolve::CallEffects) table.
///
/// Equality is structural, which is what value tracking relies on when two
/// control-flow paths meet: a tracked value survives the merge only if both
/// paths hold an equal tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Read of a local or stack variable.
    Variable(Variable),
    /// Literal scalar.
    Literal(Literal),
    /// A value proven constant, remembering what it replaced.
    Constant {
        /// The known value
        literal: Literal,
        /// The replaced expression, restored by [`Value::un_const`]
        original: Box<Value>,
    },
    /// Read of program-scope storage.
    Global(GlobalRef),
    /// Structure member or vector component read.
    Member {
        /// The aggregate
        base: Box<Value>,
        /// Member or swizzle name
        member: String,
        /// Type of the member
        ty: ShaderType,
    },
    /// Indexed array, vector or matrix read.
    ArrayElement {
        /// The indexed aggregate
        array: Box<Value>,
        /// The index
        index: Box<Value>,
        /// Element type
        ty: ShaderType,
    },
    /// Unary operation.
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Box<Value>,
        /// Result type
        ty: ShaderType,
    },
    /// Binary operation.
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        lhs: Box<Value>,
        /// Right operand
        rhs: Box<Value>,
        /// Result type
        ty: ShaderType,
    },
    /// Comparison, always `bool`.
    Compare {
        /// Operator
        op: CompareOp,
        /// Left operand
        lhs: Box<Value>,
        /// Right operand
        rhs: Box<Value>,
    },
    /// Type conversion.
    Cast {
        /// Converted value
        value: Box<Value>,
        /// Target type
        ty: ShaderType,
    },
    /// Call whose result is used.
    Call(CallValue),
}

impl Value {
    /// Reads `var`.
    #[must_use]
    pub fn var(var: &Variable) -> Self {
        Value::Variable(var.clone())
    }

    /// An `int` literal.
    #[must_use]
    pub const fn int(value: i32) -> Self {
        Value::Literal(Literal::Int(value))
    }

    /// A `uint` literal.
    #[must_use]
    pub const fn uint(value: u32) -> Self {
        Value::Literal(Literal::UInt(value))
    }

    /// A `bool` literal.
    #[must_use]
    pub const fn bool(value: bool) -> Self {
        Value::Literal(Literal::Bool(value))
    }

    /// Binary operation typed after its left operand.
    #[must_use]
    pub fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Self {
        let ty = lhs.ty();
        Value::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            ty,
        }
    }

    /// Comparison of two values.
    #[must_use]
    pub fn compare(op: CompareOp, lhs: Value, rhs: Value) -> Self {
        Value::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Logical negation, folding double negations and flipping comparisons.
    #[must_use]
    pub fn not(value: Value) -> Self {
        match value {
            Value::Unary {
                op: UnaryOp::Not,
                operand,
                ..
            } => *operand,
            Value::Compare { op, lhs, rhs } => Value::Compare {
                op: op.negate(),
                lhs,
                rhs,
            },
            Value::Literal(Literal::Bool(b)) => Value::bool(!b),
            other => Value::Unary {
                op: UnaryOp::Not,
                operand: Box::new(other),
                ty: ShaderType::BOOL,
            },
        }
    }

    /// Indexed read typed after the element type of `array`.
    #[must_use]
    pub fn element(array: Value, index: Value) -> Self {
        let ty = array.ty().element_type().unwrap_or(ShaderType::Void);
        Value::ArrayElement {
            array: Box::new(array),
            index: Box::new(index),
            ty,
        }
    }

    /// Member read.
    #[must_use]
    pub fn member(base: Value, member: impl Into<String>, ty: ShaderType) -> Self {
        Value::Member {
            base: Box::new(base),
            member: member.into(),
            ty,
        }
    }

    /// Returns the static type.
    #[must_use]
    pub fn ty(&self) -> ShaderType {
        match self {
            Value::Variable(var) => var.ty.clone(),
            Value::Literal(literal) | Value::Constant { literal, .. } => literal.ty(),
            Value::Global(global) => global.ty.clone(),
            Value::Member { ty, .. }
            | Value::ArrayElement { ty, .. }
            | Value::Unary { ty, .. }
            | Value::Binary { ty, .. }
            | Value::Cast { ty, .. } => ty.clone(),
            Value::Compare { .. } => ShaderType::BOOL,
            Value::Call(call) => call.return_type.clone(),
        }
    }

    /// Returns the direct operands. A [`Value::Constant`] has none: it no
    /// longer reads what it replaced.
    #[must_use]
    pub fn operands(&self) -> Vec<&Value> {
        match self {
            Value::Variable(_) | Value::Literal(_) | Value::Constant { .. } | Value::Global(_) => {
                Vec::new()
            }
            Value::Member { base, .. } => vec![&**base],
            Value::ArrayElement { array, index, .. } => vec![&**array, &**index],
            Value::Unary { operand, .. } => vec![&**operand],
            Value::Binary { lhs, rhs, .. } | Value::Compare { lhs, rhs, .. } => {
                vec![&**lhs, &**rhs]
            }
            Value::Cast { value, .. } => vec![&**value],
            Value::Call(call) => call.args.iter().collect(),
        }
    }

    /// Visits this value and every operand, pre-order.
    pub fn visit<F: FnMut(&Value)>(&self, f: &mut F) {
        f(self);
        for operand in self.operands() {
            operand.visit(f);
        }
    }

    /// Calls `f` for every variable read, once per occurrence.
    pub fn for_each_variable<F: FnMut(&Variable)>(&self, f: &mut F) {
        self.visit(&mut |value| {
            if let Value::Variable(var) = value {
                f(var);
            }
        });
    }

    /// Returns the distinct variables read, in first-occurrence order.
    #[must_use]
    pub fn read_variables(&self) -> Vec<Variable> {
        let mut vars: Vec<Variable> = Vec::new();
        self.for_each_variable(&mut |var| {
            if !vars.contains(var) {
                vars.push(var.clone());
            }
        });
        vars
    }

    /// Returns `true` if `needle` occurs anywhere in this tree.
    #[must_use]
    pub fn contains(&self, needle: &Value) -> bool {
        self == needle || self.operands().into_iter().any(|op| op.contains(needle))
    }

    /// Strips member and element accesses down to the storage being accessed.
    #[must_use]
    pub fn storage_root(&self) -> &Value {
        match self {
            Value::Member { base, .. } => base.storage_root(),
            Value::ArrayElement { array, .. } => array.storage_root(),
            other => other,
        }
    }

    /// Returns `true` if a write to `changed` may alter the result of this value.
    ///
    /// A write to an element or member changes the whole aggregate, so any
    /// read of the same root storage is invalidated, including reads of other
    /// elements.
    #[must_use]
    pub fn is_invalidated_by_change_in(&self, changed: &Value) -> bool {
        self.contains(changed.storage_root())
    }

    /// Returns `true` if the value may be moved from its definition to its use.
    ///
    /// Reads of memory other invocations can write (buffers, shared memory)
    /// stay at their original program point. A bare reference to a buffer or
    /// shared array reads nothing and may move.
    #[must_use]
    pub fn may_inline(&self) -> bool {
        let mut movable = true;
        self.visit(&mut |value| match value {
            Value::Global(global) if !matches!(global.ty, ShaderType::Array { .. }) => {
                movable &= !global.is_shared_memory();
            }
            Value::ArrayElement { .. } | Value::Member { .. } => {
                if let Value::Global(global) = value.storage_root() {
                    movable &= !global.is_shared_memory();
                }
            }
            _ => {}
        });
        movable
    }

    /// Returns `true` if evaluating the value at several use sites is
    /// indistinguishable from evaluating it once.
    #[must_use]
    pub fn duplicate_inline_safe(&self) -> bool {
        match self {
            Value::Literal(_) | Value::Constant { .. } => true,
            Value::Variable(var) => var.kind == VariableKind::Local,
            _ => false,
        }
    }

    /// Restores every [`Value::Constant`] in the tree to the value it replaced.
    #[must_use]
    pub fn un_const(&self) -> Value {
        self.rewrite(&mut |value| match value {
            Value::Constant { original, .. } => Some(original.un_const()),
            _ => None,
        })
    }

    /// Returns the literal of a literal or constant value.
    #[must_use]
    pub fn as_literal(&self) -> Option<Literal> {
        match self {
            Value::Literal(literal) | Value::Constant { literal, .. } => Some(*literal),
            _ => None,
        }
    }

    /// Returns the calls in this tree, outermost first.
    #[must_use]
    pub fn calls(&self) -> Vec<&CallValue> {
        let mut calls = Vec::new();
        self.collect_calls(&mut calls);
        calls
    }

    fn collect_calls<'a>(&'a self, calls: &mut Vec<&'a CallValue>) {
        if let Value::Call(call) = self {
            calls.push(call);
        }
        for operand in self.operands() {
            operand.collect_calls(calls);
        }
    }

    /// Rebuilds the tree top-down. Where `f` returns a replacement the subtree
    /// is replaced and not descended into.
    #[must_use]
    pub fn rewrite<F>(&self, f: &mut F) -> Value
    where
        F: FnMut(&Value) -> Option<Value>,
    {
        if let Some(replacement) = f(self) {
            return replacement;
        }
        let mut sub = |value: &Value| Box::new(value.rewrite(&mut *f));
        match self {
            Value::Variable(_) | Value::Literal(_) | Value::Constant { .. } | Value::Global(_) => {
                self.clone()
            }
            Value::Member { base, member, ty } => Value::Member {
                base: sub(base),
                member: member.clone(),
                ty: ty.clone(),
            },
            Value::ArrayElement { array, index, ty } => Value::ArrayElement {
                array: sub(array),
                index: sub(index),
                ty: ty.clone(),
            },
            Value::Unary { op, operand, ty } => Value::Unary {
                op: *op,
                operand: sub(operand),
                ty: ty.clone(),
            },
            Value::Binary { op, lhs, rhs, ty } => Value::Binary {
                op: *op,
                lhs: sub(lhs),
                rhs: sub(rhs),
                ty: ty.clone(),
            },
            Value::Compare { op, lhs, rhs } => Value::Compare {
                op: *op,
                lhs: sub(lhs),
                rhs: sub(rhs),
            },
            Value::Cast { value, ty } => Value::Cast {
                value: sub(value),
                ty: ty.clone(),
            },
            Value::Call(call) => Value::Call(call.map_args(|arg| *sub(arg))),
        }
    }

    /// Replaces every read of `var` with `replacement`.
    #[must_use]
    pub fn substitute(&self, var: &Variable, replacement: &Value) -> Value {
        self.rewrite(&mut |value| match value {
            Value::Variable(v) if v == var => Some(replacement.clone()),
            _ => None,
        })
    }

    fn is_atomic(&self) -> bool {
        matches!(
            self,
            Value::Variable(_)
                | Value::Literal(_)
                | Value::Constant { .. }
                | Value::Global(_)
                | Value::Member { .. }
                | Value::ArrayElement { .. }
                | Value::Call(_)
                | Value::Cast { .. }
        )
    }
}

impl From<Variable> for Value {
    fn from(var: Variable) -> Self {
        Value::Variable(var)
    }
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        Value::Literal(literal)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Variable(var) => write!(f, "{var}"),
            Value::Literal(literal) | Value::Constant { literal, .. } => write!(f, "{literal}"),
            Value::Global(global) => write!(f, "{global}"),
            Value::Member { base, member, .. } => write!(f, "{base}.{member}"),
            Value::ArrayElement { array, index, .. } => write!(f, "{array}[{index}]"),
            Value::Unary { op, operand, .. } if operand.is_atomic() => write!(f, "{op}{operand}"),
            Value::Unary { op, operand, .. } => write!(f, "{op}({operand})"),
            Value::Binary { op, lhs, rhs, .. } => write!(f, "({lhs} {op} {rhs})"),
            Value::Compare { op, lhs, rhs } => write!(f, "({lhs} {op} {rhs})"),
            Value::Cast { value, ty } => write!(f, "{ty}({value})"),
            Value::Call(call) => write!(f, "{call}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{CallSignature, GlobalKind};

    fn l(i: u32) -> Variable {
        Variable::local(i, ShaderType::INT)
    }

    fn s(i: u32) -> Variable {
        Variable::stack(i, ShaderType::INT)
    }

    #[test]
    fn test_read_variables_deduplicated_in_order() {
        let value = Value::binary(
            BinaryOp::Add,
            Value::binary(BinaryOp::Mul, Value::var(&l(1)), Value::var(&s(0))),
            Value::var(&l(1)),
        );
        assert_eq!(value.read_variables(), vec![l(1), s(0)]);

        let mut occurrences = 0;
        value.for_each_variable(&mut |_| occurrences += 1);
        assert_eq!(occurrences, 3);
    }

    #[test]
    fn test_constant_reads_nothing_and_un_consts() {
        let original = Value::binary(BinaryOp::Add, Value::int(1), Value::var(&l(0)));
        let constant = Value::Constant {
            literal: Literal::Int(3),
            original: Box::new(original.clone()),
        };
        assert!(constant.read_variables().is_empty());
        assert_eq!(constant.ty(), ShaderType::INT);
        assert_eq!(constant.as_literal(), Some(Literal::Int(3)));

        let wrapped = Value::binary(BinaryOp::Sub, constant, Value::int(2));
        assert_eq!(
            wrapped.un_const(),
            Value::binary(BinaryOp::Sub, original, Value::int(2))
        );
    }

    #[test]
    fn test_invalidation_by_variable_write() {
        let derived = Value::binary(BinaryOp::Add, Value::var(&l(0)), Value::int(1));
        assert!(derived.is_invalidated_by_change_in(&Value::var(&l(0))));
        assert!(!derived.is_invalidated_by_change_in(&Value::var(&l(1))));
    }

    #[test]
    fn test_invalidation_by_element_write() {
        let array = Variable::local(2, ShaderType::runtime_array(ShaderType::INT));
        let read_other = Value::element(Value::var(&array), Value::int(1));
        let written = Value::element(Value::var(&array), Value::int(0));
        assert!(read_other.is_invalidated_by_change_in(&written));
        assert!(Value::var(&array).is_invalidated_by_change_in(&written));
        // The index is not storage: writing through it does not change l0
        let index_read = Value::var(&l(0));
        let write_at_l0 = Value::element(Value::var(&array), Value::var(&l(0)));
        assert!(!index_read.is_invalidated_by_change_in(&write_at_l0));
    }

    #[test]
    fn test_duplicate_inline_safety() {
        assert!(Value::int(4).duplicate_inline_safe());
        assert!(Value::var(&l(0)).duplicate_inline_safe());
        assert!(!Value::var(&s(0)).duplicate_inline_safe());
        assert!(!Value::binary(BinaryOp::Add, Value::int(1), Value::int(2)).duplicate_inline_safe());
    }

    #[test]
    fn test_may_inline_rejects_shared_memory() {
        let shared = GlobalRef::new(
            "tile",
            ShaderType::Array {
                element: Box::new(ShaderType::INT),
                length: Some(64),
            },
            GlobalKind::Shared,
        );
        let read = Value::element(Value::Global(shared.clone()), Value::int(0));
        assert!(!read.may_inline());
        assert!(Value::Global(shared).may_inline());

        let builtin = GlobalRef::new("gl_LocalInvocationIndex", ShaderType::UINT, GlobalKind::Builtin);
        assert!(Value::Global(builtin).may_inline());
    }

    #[test]
    fn test_not_simplifies() {
        let cmp = Value::compare(CompareOp::Lt, Value::var(&l(0)), Value::int(3));
        assert_eq!(
            Value::not(cmp.clone()),
            Value::compare(CompareOp::Ge, Value::var(&l(0)), Value::int(3))
        );
        let flag = Value::var(&Variable::local(1, ShaderType::BOOL));
        assert_eq!(Value::not(Value::not(flag.clone())), flag);
        assert_eq!(Value::not(Value::bool(true)), Value::bool(false));
    }

    #[test]
    fn test_substitute_reaches_call_arguments() {
        let call = Value::Call(CallValue::new(
            CallSignature::new("Math", "max", "(II)I"),
            vec![Value::var(&s(0)), Value::int(1)],
            ShaderType::INT,
        ));
        let replaced = call.substitute(&s(0), &Value::var(&l(3)));
        assert_eq!(replaced.read_variables(), vec![l(3)]);
        assert_eq!(replaced.to_string(), "max(l3, 1)");
    }

    #[test]
    fn test_display() {
        let value = Value::binary(
            BinaryOp::Xor,
            Value::var(&l(0)),
            Value::binary(BinaryOp::Sub, Value::var(&l(1)), Value::int(1)),
        );
        assert_eq!(value.to_string(), "(l0 ^ (l1 - 1))");
    }
}
