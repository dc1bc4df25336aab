//! Mutability classification.
//!
//! Host aggregates have reference semantics while shading-language aggregates
//! are values. This forward analysis classifies every variable at every point:
//!
//! - [`Mutability::Mutable`]: storage written through in place, by an element
//!   or member store or by a call reported to mutate it
//! - [`Mutability::PassiveMutable`]: a copy of mutable storage, which in the
//!   host would observe later writes to its source
//! - [`Mutability::Immutable`]: everything else
//!
//! Paths that disagree collapse to `Immutable`. The emitter gives every
//! parameter classified `Mutable` somewhere a writable local copy, since
//! uniforms and inputs are read-only in the target language.

use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use strum::Display;

use crate::{
    analysis::{
        cfg::{InstrPos, IntermediaryCfg},
        dataflow::{
            framework::{AnalysisInfo, DataFlowAnalysis, Direction},
            lattice::MeetSemiLattice,
        },
    },
    ir::{CallValue, Instruction, Location, Value, Variable},
    resolve::{CallEffects, MutationTarget},
};

/// How a variable's storage may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Mutability {
    /// Never written through.
    #[strum(serialize = "immutable")]
    Immutable,
    /// A copy of storage that is written through.
    #[strum(serialize = "passive-mutable")]
    PassiveMutable,
    /// Written through in place.
    #[strum(serialize = "mutable")]
    Mutable,
}

/// Mutability analysis.
pub struct MutabilityAnalysis<'a> {
    effects: &'a dyn CallEffects,
}

impl<'a> MutabilityAnalysis<'a> {
    /// Creates the analysis; `effects` answers which arguments calls mutate.
    #[must_use]
    pub fn new(effects: &'a dyn CallEffects) -> Self {
        Self { effects }
    }

    fn apply_call(&self, classes: &mut HashMap<Variable, Mutability>, call: &CallValue) {
        for target in self.effects.mutated_args(call) {
            if let MutationTarget::Argument(position) = target {
                if let Some(Value::Variable(var)) = call.args.get(position).map(Value::storage_root)
                {
                    classes.insert(var.clone(), Mutability::Mutable);
                }
            }
        }
    }
}

impl DataFlowAnalysis for MutabilityAnalysis<'_> {
    type Lattice = MutabilityValue;
    const DIRECTION: Direction = Direction::Forward;
    const NAME: &'static str = "mutability";

    fn head_value(&self, _cfg: &IntermediaryCfg) -> MutabilityValue {
        MutabilityValue {
            reached: true,
            classes: HashMap::new(),
        }
    }

    fn top(&self, _cfg: &IntermediaryCfg) -> MutabilityValue {
        MutabilityValue {
            reached: false,
            classes: HashMap::new(),
        }
    }

    fn execute(&self, fact: &MutabilityValue, _pos: InstrPos, instr: &Instruction) -> MutabilityValue {
        if !fact.reached {
            return fact.clone();
        }
        let mut classes = fact.classes.clone();

        match instr {
            Instruction::Assign { location, value } => {
                for call in value.calls() {
                    self.apply_call(&mut classes, call);
                }
                match location {
                    Location::Variable(target) => {
                        let copied = match value {
                            Value::Variable(source) => classes.get(source).copied(),
                            _ => None,
                        };
                        if copied.is_some() {
                            classes.insert(target.clone(), Mutability::PassiveMutable);
                        } else {
                            classes.remove(target);
                        }
                    }
                    Location::ArrayElement { array: base, .. } | Location::Member { base, .. } => {
                        if let Value::Variable(var) = base.storage_root() {
                            classes.insert(var.clone(), Mutability::Mutable);
                        }
                    }
                    Location::Global(_) => {}
                }
            }
            Instruction::Call(call) => {
                for nested in call.args.iter().flat_map(Value::calls) {
                    self.apply_call(&mut classes, nested);
                }
                self.apply_call(&mut classes, call);
            }
            _ => {}
        }

        MutabilityValue {
            reached: true,
            classes,
        }
    }
}

/// Per-variable classification at one program point.
///
/// Only non-[`Immutable`](Mutability::Immutable) classifications are stored, so
/// equal facts have equal maps.
#[derive(Clone, PartialEq)]
pub struct MutabilityValue {
    reached: bool,
    classes: HashMap<Variable, Mutability>,
}

impl MutabilityValue {
    /// Returns the classification of `var`.
    #[must_use]
    pub fn get(&self, var: &Variable) -> Mutability {
        self.classes
            .get(var)
            .copied()
            .unwrap_or(Mutability::Immutable)
    }

    /// Returns `false` for the top element.
    #[must_use]
    pub const fn is_reached(&self) -> bool {
        self.reached
    }
}

impl fmt::Debug for MutabilityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.reached {
            return f.write_str("⊤");
        }
        let mut entries: Vec<_> = self
            .classes
            .iter()
            .map(|(var, class)| (var.to_string(), class.to_string()))
            .collect();
        entries.sort();
        f.debug_map().entries(entries).finish()
    }
}

impl MeetSemiLattice for MutabilityValue {
    /// Disagreement collapses to `Immutable`, which is the absence of an entry.
    fn meet(&self, other: &Self) -> Self {
        if !self.reached {
            return other.clone();
        }
        if !other.reached {
            return self.clone();
        }
        let classes = self
            .classes
            .iter()
            .filter(|(var, class)| other.classes.get(*var) == Some(*class))
            .map(|(var, class)| (var.clone(), *class))
            .collect();
        Self {
            reached: true,
            classes,
        }
    }
}

/// Returns every variable classified [`Mutability::Mutable`] after some
/// instruction.
#[must_use]
pub fn mutated_variables(info: &AnalysisInfo<MutabilityValue>) -> HashSet<Variable> {
    info.instructions()
        .flat_map(|(_, facts)| {
            facts
                .output
                .classes
                .iter()
                .filter(|(_, class)| **class == Mutability::Mutable)
                .map(|(var, _)| var.clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::dataflow::DataFlowSolver,
        ir::{CallSignature, LabelId, ShaderType},
        resolve::CallEffectTable,
    };

    fn arr(i: u32) -> Variable {
        Variable::local(i, ShaderType::runtime_array(ShaderType::FLOAT))
    }

    fn fill() -> CallSignature {
        CallSignature::new("Shader", "fill", "([F)V")
    }

    fn solve(cfg: &IntermediaryCfg) -> AnalysisInfo<MutabilityValue> {
        let effects = CallEffectTable::new().with(fill(), vec![MutationTarget::Argument(0)]);
        DataFlowSolver::new(MutabilityAnalysis::new(&effects))
            .solve(cfg)
            .unwrap()
    }

    #[test]
    fn test_classification() {
        let copy = Variable::stack(0, arr(0).ty);
        let cfg = IntermediaryCfg::build(&[
            Instruction::Call(CallValue::new(fill(), vec![Value::var(&arr(0))], ShaderType::Void)),
            Instruction::assign(&copy, Value::var(&arr(0))),
            Instruction::assign(&arr(1), Value::var(&arr(2))),
            Instruction::Return(None),
        ])
        .unwrap();
        let info = solve(&cfg);

        let at_exit = &info.block(cfg.exit()).unwrap().input;
        assert_eq!(at_exit.get(&arr(0)), Mutability::Mutable);
        assert_eq!(at_exit.get(&copy), Mutability::PassiveMutable);
        assert_eq!(at_exit.get(&arr(1)), Mutability::Immutable);
        assert_eq!(
            mutated_variables(&info).into_iter().collect::<Vec<_>>(),
            vec![arr(0)]
        );
    }

    #[test]
    fn test_element_store_is_mutation() {
        let cfg = IntermediaryCfg::build(&[
            Instruction::Assign {
                location: Location::ArrayElement {
                    array: Value::var(&arr(3)),
                    index: Value::int(0),
                },
                value: Value::Literal(crate::ir::Literal::Float(1.0)),
            },
            Instruction::Return(None),
        ])
        .unwrap();
        let info = solve(&cfg);
        assert!(mutated_variables(&info).contains(&arr(3)));
    }

    #[test]
    fn test_disagreement_collapses_to_immutable() {
        // if c { fill(l0) } return
        let cond = Variable::local(9, ShaderType::BOOL);
        let cfg = IntermediaryCfg::build(&[
            Instruction::JumpIf {
                condition: Value::var(&cond),
                target: LabelId(0),
            },
            Instruction::Call(CallValue::new(fill(), vec![Value::var(&arr(0))], ShaderType::Void)),
            Instruction::Label(LabelId(0)),
            Instruction::Return(None),
        ])
        .unwrap();
        let info = solve(&cfg);

        let at_exit = &info.block(cfg.exit()).unwrap().input;
        assert_eq!(at_exit.get(&arr(0)), Mutability::Immutable);
        assert!(mutated_variables(&info).contains(&arr(0)));
        assert_eq!(Mutability::PassiveMutable.to_string(), "passive-mutable");
    }
}
