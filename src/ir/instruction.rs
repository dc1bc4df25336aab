use std::fmt;

use crate::ir::{CallValue, GlobalRef, Literal, ShaderType, Value, Variable};

/// Identifier of a jump target placed by [`Instruction::Label`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelId(pub u32);

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Assignable storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    /// A local or stack variable.
    Variable(Variable),
    /// Program-scope storage.
    Global(GlobalRef),
    /// An element of an array, vector or matrix.
    ArrayElement {
        /// The aggregate written through
        array: Value,
        /// The index
        index: Value,
    },
    /// A structure member or vector component.
    Member {
        /// The aggregate written through
        base: Value,
        /// Member or swizzle name
        member: String,
        /// Member type
        ty: ShaderType,
    },
}

impl Location {
    /// Returns the variable assigned by a plain variable store.
    #[must_use]
    pub fn variable(&self) -> Option<&Variable> {
        match self {
            Location::Variable(var) => Some(var),
            _ => None,
        }
    }

    /// Returns the location read back as a value.
    #[must_use]
    pub fn as_value(&self) -> Value {
        match self {
            Location::Variable(var) => Value::Variable(var.clone()),
            Location::Global(global) => Value::Global(global.clone()),
            Location::ArrayElement { array, index } => Value::element(array.clone(), index.clone()),
            Location::Member { base, member, ty } => {
                Value::member(base.clone(), member.clone(), ty.clone())
            }
        }
    }

    /// Returns the type stored.
    #[must_use]
    pub fn ty(&self) -> ShaderType {
        match self {
            Location::Variable(var) => var.ty.clone(),
            Location::Global(global) => global.ty.clone(),
            Location::ArrayElement { array, .. } => {
                array.ty().element_type().unwrap_or(ShaderType::Void)
            }
            Location::Member { ty, .. } => ty.clone(),
        }
    }

    /// Calls `f` for every variable the store reads to compute its address.
    pub fn for_each_variable<F: FnMut(&Variable)>(&self, f: &mut F) {
        match self {
            Location::Variable(_) | Location::Global(_) => {}
            Location::ArrayElement { array, index } => {
                array.for_each_variable(f);
                index.for_each_variable(f);
            }
            Location::Member { base, .. } => base.for_each_variable(f),
        }
    }

    /// Returns a copy with every address operand passed through `f`.
    #[must_use]
    pub fn map_values<F: FnMut(&Value) -> Value>(&self, mut f: F) -> Location {
        match self {
            Location::Variable(_) | Location::Global(_) => self.clone(),
            Location::ArrayElement { array, index } => Location::ArrayElement {
                array: f(array),
                index: f(index),
            },
            Location::Member { base, member, ty } => Location::Member {
                base: f(base),
                member: member.clone(),
                ty: ty.clone(),
            },
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_value())
    }
}

/// A lifted instruction.
///
/// `Goto`, `JumpIf` and `Switch` exist only between lifting and structuring.
/// Within a basic block only the last instruction may be one of them, and none
/// may reach emission.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// `location = value`
    Assign {
        /// Destination
        location: Location,
        /// Source
        value: Value,
    },
    /// A call whose result, if any, is discarded.
    Call(CallValue),
    /// Jump target.
    Label(LabelId),
    /// Method return.
    Return(Option<Value>),
    /// Unconditional jump.
    Goto(LabelId),
    /// Jump to `target` when `condition` holds, otherwise fall through.
    JumpIf {
        /// Branch condition
        condition: Value,
        /// Taken target
        target: LabelId,
    },
    /// Multi-way jump on an integer value.
    Switch {
        /// Selector
        value: Value,
        /// Case values and their targets, in declaration order
        cases: Vec<(Literal, LabelId)>,
        /// Target when no case matches
        default: LabelId,
    },
}

impl Instruction {
    /// `var = value`
    #[must_use]
    pub fn assign(var: &Variable, value: Value) -> Self {
        Instruction::Assign {
            location: Location::Variable(var.clone()),
            value,
        }
    }

    /// Returns `true` for instructions that transfer control elsewhere.
    #[must_use]
    pub fn is_control(&self) -> bool {
        matches!(
            self,
            Instruction::Goto(_)
                | Instruction::JumpIf { .. }
                | Instruction::Switch { .. }
                | Instruction::Return(_)
        )
    }

    /// Returns `true` for the jumps structuring must eliminate.
    #[must_use]
    pub fn is_cfg_only(&self) -> bool {
        matches!(
            self,
            Instruction::Goto(_)
                | Instruction::JumpIf { .. }
                | Instruction::Switch { .. }
                | Instruction::Label(_)
        )
    }

    /// Returns the variable written by a plain variable assignment.
    #[must_use]
    pub fn assigned_variable(&self) -> Option<&Variable> {
        match self {
            Instruction::Assign { location, .. } => location.variable(),
            _ => None,
        }
    }

    /// Returns the labels this instruction may jump to, in successor order.
    #[must_use]
    pub fn jump_targets(&self) -> Vec<LabelId> {
        match self {
            Instruction::Goto(target) | Instruction::JumpIf { target, .. } => vec![*target],
            Instruction::Switch { cases, default, .. } => cases
                .iter()
                .map(|(_, label)| *label)
                .chain(std::iter::once(*default))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Returns the call performed by this instruction, if any, either as a
    /// statement or as the top-level source of an assignment.
    #[must_use]
    pub fn call(&self) -> Option<&CallValue> {
        match self {
            Instruction::Call(call) => Some(call),
            Instruction::Assign {
                value: Value::Call(call),
                ..
            } => Some(call),
            _ => None,
        }
    }

    /// Calls `f` for every variable read, once per occurrence.
    pub fn for_each_read<F: FnMut(&Variable)>(&self, f: &mut F) {
        match self {
            Instruction::Assign { location, value } => {
                location.for_each_variable(f);
                value.for_each_variable(f);
            }
            Instruction::Call(call) => {
                for arg in &call.args {
                    arg.for_each_variable(f);
                }
            }
            Instruction::Return(Some(value))
            | Instruction::JumpIf {
                condition: value, ..
            }
            | Instruction::Switch { value, .. } => value.for_each_variable(f),
            Instruction::Return(None) | Instruction::Label(_) | Instruction::Goto(_) => {}
        }
    }

    /// Returns the distinct variables read.
    #[must_use]
    pub fn read_variables(&self) -> Vec<Variable> {
        let mut vars: Vec<Variable> = Vec::new();
        self.for_each_read(&mut |var| {
            if !vars.contains(var) {
                vars.push(var.clone());
            }
        });
        vars
    }

    /// Returns a deep copy with every value and every location rewritten.
    ///
    /// `value_fn` receives each top-level value (assignment source, call
    /// arguments, return value, conditions and selectors) and `location_fn` each
    /// assignment destination. Labels and jump targets are kept.
    #[must_use]
    pub fn transform<V, L>(&self, mut value_fn: V, mut location_fn: L) -> Instruction
    where
        V: FnMut(&Value) -> Value,
        L: FnMut(&Location) -> Location,
    {
        match self {
            Instruction::Assign { location, value } => Instruction::Assign {
                location: location_fn(location),
                value: value_fn(value),
            },
            Instruction::Call(call) => Instruction::Call(call.map_args(value_fn)),
            Instruction::Label(label) => Instruction::Label(*label),
            Instruction::Return(value) => Instruction::Return(value.as_ref().map(value_fn)),
            Instruction::Goto(target) => Instruction::Goto(*target),
            Instruction::JumpIf { condition, target } => Instruction::JumpIf {
                condition: value_fn(condition),
                target: *target,
            },
            Instruction::Switch {
                value,
                cases,
                default,
            } => Instruction::Switch {
                value: value_fn(value),
                cases: cases.clone(),
                default: *default,
            },
        }
    }

    /// Rewrites every value, including the address operands of locations,
    /// through `f`.
    #[must_use]
    pub fn map_values<F: FnMut(&Value) -> Value>(&self, mut f: F) -> Instruction {
        match self {
            Instruction::Assign { location, value } => Instruction::Assign {
                location: location.map_values(&mut f),
                value: f(value),
            },
            other => other.transform(f, Clone::clone),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Assign { location, value } => write!(f, "{location} = {value}"),
            Instruction::Call(call) => write!(f, "{call}"),
            Instruction::Label(label) => write!(f, "{label}:"),
            Instruction::Return(Some(value)) => write!(f, "return {value}"),
            Instruction::Return(None) => f.write_str("return"),
            Instruction::Goto(target) => write!(f, "goto {target}"),
            Instruction::JumpIf { condition, target } => write!(f, "if {condition} goto {target}"),
            Instruction::Switch {
                value,
                cases,
                default,
            } => {
                write!(f, "switch {value} [")?;
                for (literal, label) in cases {
                    write!(f, "{literal}: {label}, ")?;
                }
                write!(f, "default: {default}]")
            }
        }
    }
}
