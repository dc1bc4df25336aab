//! Constant folding.
//!
//! Replaces every read of a constant global, and every unary, binary,
//! comparison or cast whose operands are all known literals, by a
//! [`Value::Constant`] that remembers the expression it replaced. Folding
//! works bottom-up, so `SIZE * 2 + 1` collapses to a single constant in one
//! run.
//!
//! An operation is only folded when its literal result has exactly the static
//! type of the expression; integer division by zero and mixed-type operands are
//! left for the target compiler to reject.

use crate::{
    compiler::{pass::ShaderPass, CompilationContext, CompileOptions, EventKind, EventLog},
    ir::{Literal, ShaderType, Value},
    Result,
};

use super::MethodBody;

/// Constant folding pass.
#[derive(Debug, Default)]
pub struct ConstantFoldingPass;

impl ConstantFoldingPass {
    /// Creates a new constant folding pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Folds `value` bottom-up.
#[must_use]
pub fn fold(value: &Value) -> Value {
    value.rewrite(&mut |v| match v {
        Value::Global(global) => global.constant_value().map(|literal| Value::Constant {
            literal,
            original: Box::new(v.clone()),
        }),
        Value::Unary { op, operand, ty } => {
            let operand = fold(operand);
            let folded = operand
                .as_literal()
                .and_then(|lit| Literal::apply_unary(*op, lit));
            let rebuilt = Value::Unary {
                op: *op,
                operand: Box::new(operand),
                ty: ty.clone(),
            };
            Some(constant_or(folded, ty, rebuilt))
        }
        Value::Binary { op, lhs, rhs, ty } => {
            let (lhs, rhs) = (fold(lhs), fold(rhs));
            let folded = lhs
                .as_literal()
                .zip(rhs.as_literal())
                .and_then(|(a, b)| Literal::apply_binary(*op, a, b));
            let rebuilt = Value::Binary {
                op: *op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                ty: ty.clone(),
            };
            Some(constant_or(folded, ty, rebuilt))
        }
        Value::Compare { op, lhs, rhs } => {
            let (lhs, rhs) = (fold(lhs), fold(rhs));
            let folded = lhs
                .as_literal()
                .zip(rhs.as_literal())
                .filter(|(a, b)| a.ty() == b.ty())
                .and_then(|(a, b)| Literal::apply_compare(*op, a, b));
            let rebuilt = Value::Compare {
                op: *op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
            Some(constant_or(folded, &ShaderType::BOOL, rebuilt))
        }
        Value::Cast { value, ty } => {
            let value = fold(value);
            let folded = match ty {
                ShaderType::Scalar(kind) => value.as_literal().map(|lit| lit.cast(*kind)),
                _ => None,
            };
            let rebuilt = Value::Cast {
                value: Box::new(value),
                ty: ty.clone(),
            };
            Some(constant_or(folded, ty, rebuilt))
        }
        _ => None,
    })
}

fn constant_or(folded: Option<Literal>, ty: &ShaderType, rebuilt: Value) -> Value {
    match folded {
        Some(literal) if literal.ty() == *ty => Value::Constant {
            literal,
            original: Box::new(rebuilt),
        },
        _ => rebuilt,
    }
}

impl ShaderPass for ConstantFoldingPass {
    fn name(&self) -> &'static str {
        "constant-folding"
    }

    fn description(&self) -> &'static str {
        "Replaces constant globals and operations over literals by their value"
    }

    fn should_run(&self, options: &CompileOptions) -> bool {
        options.fold_constants
    }

    fn run_on_method(&self, body: &mut MethodBody, ctx: &CompilationContext) -> Result<bool> {
        let changes = EventLog::new();
        let cfg = body.cfg.map_instructions(|pos, instr| {
            let folded = instr.map_values(fold);
            if folded != *instr {
                changes
                    .record(EventKind::ConstantFolded)
                    .at(&body.name, pos.block)
                    .pass(self.name())
                    .message(format!("{instr} => {folded}"));
            }
            Some(folded)
        });

        let changed = !changes.is_empty();
        if changed {
            body.cfg = cfg;
            ctx.events.merge(&changes);
        }
        Ok(changed)
    }
}
