//! Value tracking: forward copy and constant propagation for STACK variables.
//!
//! Each fact maps STACK variables to the value last assigned to them, as long as
//! that value would still evaluate to the same result. Writes invalidate
//! entries in both directions: an entry is dropped when the written storage
//! occurs in its value, and when its value occurs in the written storage. Calls
//! invalidate whatever the [`CallEffects`] collaborator says they may mutate.

use std::{collections::HashMap, fmt};

use crate::{
    analysis::{
        cfg::{InstrPos, IntermediaryCfg},
        dataflow::{
            framework::{DataFlowAnalysis, Direction},
            lattice::MeetSemiLattice,
        },
    },
    ir::{CallValue, Instruction, Location, Value, Variable},
    resolve::{CallEffects, MutationTarget},
};

/// Value-tracking analysis.
pub struct ValueTracking<'a> {
    effects: &'a dyn CallEffects,
}

impl<'a> ValueTracking<'a> {
    /// Creates the analysis; `effects` answers which storage calls may write.
    #[must_use]
    pub fn new(effects: &'a dyn CallEffects) -> Self {
        Self { effects }
    }

    /// Applies the writes of `call` to `map`.
    fn apply_call(&self, map: &mut HashMap<Variable, Value>, call: &CallValue) {
        let mut changed: Vec<Value> = Vec::new();
        for target in self.effects.mutated_args(call) {
            match target {
                MutationTarget::Argument(position) => {
                    let Some(arg) = call.args.get(position) else {
                        continue;
                    };
                    // A stack argument aliases whatever it was copied from
                    if let Value::Variable(var) = arg.storage_root() {
                        if let Some(tracked) = map.get(var) {
                            changed.push(tracked.clone());
                        }
                    }
                    changed.push(arg.clone());
                }
                MutationTarget::Global(global) => changed.push(Value::Global(global)),
            }
        }
        for written in &changed {
            invalidate(map, written);
        }
    }
}

/// Drops every entry the write to `written` may affect.
fn invalidate(map: &mut HashMap<Variable, Value>, written: &Value) {
    let root = written.storage_root();
    map.retain(|var, value| {
        let key = Value::Variable(var.clone());
        !(key == *root
            || value.is_invalidated_by_change_in(written)
            || written.is_invalidated_by_change_in(value))
    });
}

impl DataFlowAnalysis for ValueTracking<'_> {
    type Lattice = ValueTrackValue;
    const DIRECTION: Direction = Direction::Forward;
    const NAME: &'static str = "value-tracking";

    fn head_value(&self, _cfg: &IntermediaryCfg) -> ValueTrackValue {
        ValueTrackValue::empty()
    }

    fn top(&self, _cfg: &IntermediaryCfg) -> ValueTrackValue {
        ValueTrackValue::unreached()
    }

    fn execute(
        &self,
        fact: &ValueTrackValue,
        _pos: InstrPos,
        instr: &Instruction,
    ) -> ValueTrackValue {
        if !fact.reached {
            return fact.clone();
        }
        let mut map = fact.tracked.clone();

        match instr {
            Instruction::Assign { location, value } => {
                for call in value.calls() {
                    self.apply_call(&mut map, call);
                }
                invalidate(&mut map, &location.as_value());
                if let Location::Variable(var) = location {
                    let self_referential = value.read_variables().contains(var);
                    if var.is_stack() && !self_referential {
                        map.insert(var.clone(), value.clone());
                    }
                }
            }
            Instruction::Call(call) => {
                for nested in call.args.iter().flat_map(Value::calls) {
                    self.apply_call(&mut map, nested);
                }
                self.apply_call(&mut map, call);
            }
            _ => {}
        }

        ValueTrackValue {
            reached: true,
            tracked: map,
        }
    }
}

/// STACK variable to value map at one program point.
#[derive(Clone, PartialEq)]
pub struct ValueTrackValue {
    reached: bool,
    tracked: HashMap<Variable, Value>,
}

impl ValueTrackValue {
    /// A reached point with nothing tracked.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            reached: true,
            tracked: HashMap::new(),
        }
    }

    /// The top element: no path has reached this point.
    #[must_use]
    pub fn unreached() -> Self {
        Self {
            reached: false,
            tracked: HashMap::new(),
        }
    }

    /// Returns `false` for the top element.
    #[must_use]
    pub const fn is_reached(&self) -> bool {
        self.reached
    }

    /// Returns the value `var` is known to hold.
    #[must_use]
    pub fn get(&self, var: &Variable) -> Option<&Value> {
        self.tracked.get(var)
    }

    /// Returns the number of tracked variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    /// Returns `true` if nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    /// Iterates the tracked entries in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &Value)> {
        self.tracked.iter()
    }
}

impl fmt::Debug for ValueTrackValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.reached {
            return f.write_str("⊤");
        }
        let mut entries: Vec<_> = self
            .tracked
            .iter()
            .map(|(var, value)| (var.to_string(), value.to_string()))
            .collect();
        entries.sort();
        f.debug_map().entries(entries).finish()
    }
}

impl MeetSemiLattice for ValueTrackValue {
    /// Keeps an entry only when both sides map the variable to an equal value.
    fn meet(&self, other: &Self) -> Self {
        if !self.reached {
            return other.clone();
        }
        if !other.reached {
            return self.clone();
        }
        let tracked = self
            .tracked
            .iter()
            .filter(|(var, value)| other.tracked.get(*var) == Some(*value))
            .map(|(var, value)| (var.clone(), value.clone()))
            .collect();
        Self {
            reached: true,
            tracked,
        }
    }
}
