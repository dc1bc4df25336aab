//! Possible values and use tracking.
//!
//! A forward may-analysis: for each variable, the set of definitions whose
//! value it may hold. Definitions are identified by a [`DefToken`], the
//! position of the defining instruction; the value a variable holds on entry
//! to the method is the definition at [`DefToken::entry`].
//!
//! The finalize hook derives a use table mapping each definition to the
//! instructions that may read it, one entry per read occurrence. The inlining
//! pass uses it to find STACK values consumed exactly once.

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    sync::Arc,
};

use crate::{
    analysis::{
        cfg::{InstrPos, IntermediaryCfg},
        dataflow::{
            framework::{AnalysisInfo, DataFlowAnalysis, Direction},
            lattice::MeetSemiLattice,
            vartable::VariableTable,
        },
    },
    ir::{Instruction, Value, Variable},
    resolve::{CallEffects, MutationTarget},
};

/// Identity of one definition: the position of the defining instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefToken(pub InstrPos);

impl DefToken {
    /// The pseudo-definition of every variable's incoming value. The entry
    /// sentinel holds no instructions, so no real definition can collide.
    #[must_use]
    pub fn entry(cfg: &IntermediaryCfg) -> Self {
        DefToken(InstrPos::new(cfg.entry(), 0))
    }
}

impl fmt::Display for DefToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "def@{}", self.0)
    }
}

/// Possible-values analysis.
pub struct PossibleValues<'a> {
    table: Arc<VariableTable>,
    effects: &'a dyn CallEffects,
    uses: HashMap<DefToken, Vec<InstrPos>>,
}

impl<'a> PossibleValues<'a> {
    /// Creates the analysis over the variables of `table`.
    #[must_use]
    pub fn new(table: Arc<VariableTable>, effects: &'a dyn CallEffects) -> Self {
        Self {
            table,
            effects,
            uses: HashMap::new(),
        }
    }

    /// Returns the use table built by the last solve.
    #[must_use]
    pub fn into_uses(self) -> UseTable {
        UseTable { uses: self.uses }
    }
}

impl DataFlowAnalysis for PossibleValues<'_> {
    type Lattice = PossibleValuesValue;
    const DIRECTION: Direction = Direction::Forward;
    const NAME: &'static str = "possible-values";

    fn head_value(&self, cfg: &IntermediaryCfg) -> PossibleValuesValue {
        let entry = DefToken::entry(cfg);
        PossibleValuesValue {
            reached: true,
            defs: self
                .table
                .iter()
                .map(|var| (var.clone(), BTreeSet::from([entry])))
                .collect(),
        }
    }

    fn top(&self, _cfg: &IntermediaryCfg) -> PossibleValuesValue {
        PossibleValuesValue {
            reached: false,
            defs: HashMap::new(),
        }
    }

    fn execute(
        &self,
        fact: &PossibleValuesValue,
        pos: InstrPos,
        instr: &Instruction,
    ) -> PossibleValuesValue {
        if !fact.reached {
            return fact.clone();
        }
        let mut defs = fact.defs.clone();
        let token = DefToken(pos);

        let calls: Vec<_> = match instr {
            Instruction::Assign { value, .. } => value.calls(),
            Instruction::Call(call) => {
                let mut calls: Vec<_> = call.args.iter().flat_map(Value::calls).collect();
                calls.push(call);
                calls
            }
            _ => Vec::new(),
        };
        // A call writing through an argument may or may not define it
        for call in calls {
            for target in self.effects.mutated_args(call) {
                if let MutationTarget::Argument(position) = target {
                    if let Some(Value::Variable(var)) =
                        call.args.get(position).map(Value::storage_root)
                    {
                        defs.entry(var.clone()).or_default().insert(token);
                    }
                }
            }
        }

        if let Some(var) = instr.assigned_variable() {
            defs.insert(var.clone(), BTreeSet::from([token]));
        }

        PossibleValuesValue {
            reached: true,
            defs,
        }
    }

    fn finalize(&mut self, info: &AnalysisInfo<PossibleValuesValue>, cfg: &IntermediaryCfg) {
        self.uses.clear();
        for (pos, instr) in cfg.instructions() {
            let Some(before) = info.before(pos) else {
                continue;
            };
            instr.for_each_read(&mut |var| {
                for token in before.candidates(var) {
                    self.uses.entry(*token).or_default().push(pos);
                }
            });
        }
    }
}

/// Candidate definitions of each variable at one program point.
#[derive(Clone, PartialEq)]
pub struct PossibleValuesValue {
    reached: bool,
    defs: HashMap<Variable, BTreeSet<DefToken>>,
}

impl PossibleValuesValue {
    /// Returns the definitions `var` may hold, in position order.
    pub fn candidates(&self, var: &Variable) -> impl Iterator<Item = &DefToken> {
        self.defs.get(var).into_iter().flatten()
    }

    /// Returns the definition `var` holds if exactly one can reach this point.
    #[must_use]
    pub fn unique(&self, var: &Variable) -> Option<DefToken> {
        match self.defs.get(var) {
            Some(set) if set.len() == 1 => set.iter().next().copied(),
            _ => None,
        }
    }

    /// Returns `false` for the top element.
    #[must_use]
    pub const fn is_reached(&self) -> bool {
        self.reached
    }
}

impl fmt::Debug for PossibleValuesValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.reached {
            return f.write_str("⊤");
        }
        let mut entries: Vec<_> = self
            .defs
            .iter()
            .map(|(var, set)| (var.to_string(), set.iter().map(ToString::to_string).collect::<Vec<_>>()))
            .collect();
        entries.sort();
        f.debug_map().entries(entries).finish()
    }
}

impl MeetSemiLattice for PossibleValuesValue {
    /// Meet is per-variable union.
    fn meet(&self, other: &Self) -> Self {
        if !self.reached {
            return other.clone();
        }
        if !other.reached {
            return self.clone();
        }
        let mut defs = self.defs.clone();
        for (var, set) in &other.defs {
            defs.entry(var.clone()).or_default().extend(set.iter().copied());
        }
        Self {
            reached: true,
            defs,
        }
    }
}

/// Definition to reading instructions, one entry per read occurrence.
#[derive(Debug, Clone, Default)]
pub struct UseTable {
    uses: HashMap<DefToken, Vec<InstrPos>>,
}

impl UseTable {
    /// Returns the instructions that may read `token`'s value.
    #[must_use]
    pub fn uses_of(&self, token: DefToken) -> &[InstrPos] {
        self.uses.get(&token).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the single reading instruction when `token` is read exactly once.
    #[must_use]
    pub fn single_use(&self, token: DefToken) -> Option<InstrPos> {
        match self.uses_of(token) {
            [only] => Some(*only),
            _ => None,
        }
    }
}
