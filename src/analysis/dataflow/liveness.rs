//! Live variable analysis.
//!
//! Live variable analysis determines which variables may be read again before
//! being overwritten. A variable is live at a point if there exists a path from
//! that point to a read of the variable that does not pass through an
//! assignment to it.
//!
//! # Algorithm
//!
//! This is a backward analysis with the per-instruction transfer function:
//!
//! ```text
//! LIVE_before = READS ∪ (LIVE_after - { TARGET })
//! ```
//!
//! Stores through an array element or member do not kill the aggregate, and
//! read its root variable.
//!
//! # Use Cases
//!
//! - **Dead assignment removal**: an assignment whose target is not live
//!   afterwards, and whose value has no side effects, can be deleted
//! - **Inlining**: a STACK variable dead after its only use may be folded into
//!   that use

use std::sync::Arc;

use crate::{
    analysis::{
        cfg::{InstrPos, IntermediaryCfg},
        dataflow::{
            framework::{DataFlowAnalysis, Direction},
            lattice::MeetSemiLattice,
            vartable::VariableTable,
        },
    },
    ir::{Instruction, Variable},
    utils::BitSet,
};

/// Live variable analysis.
///
/// # Example
///
/// ```rust,ignore
/// use shaderlift::analysis::{DataFlowSolver, LiveVariables, VariableTable};
///
/// let table = VariableTable::from_cfg(&cfg, &params);
/// let info = DataFlowSolver::new(LiveVariables::new(table)).solve(&cfg)?;
///
/// if let Some(after) = info.after(pos) {
///     if !after.is_live(&var) {
///         println!("{var} is dead after {pos}");
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct LiveVariables {
    table: Arc<VariableTable>,
}

impl LiveVariables {
    /// Creates a new live variables analysis over `table`.
    #[must_use]
    pub fn new(table: Arc<VariableTable>) -> Self {
        Self { table }
    }

    fn empty(&self) -> LiveVarValue {
        LiveVarValue {
            table: Arc::clone(&self.table),
            live: self.table.empty_set(),
        }
    }
}

impl DataFlowAnalysis for LiveVariables {
    type Lattice = LiveVarValue;
    const DIRECTION: Direction = Direction::Backward;
    const NAME: &'static str = "live-variables";

    fn head_value(&self, _cfg: &IntermediaryCfg) -> LiveVarValue {
        // At method exit, no variables are live
        self.empty()
    }

    fn top(&self, _cfg: &IntermediaryCfg) -> LiveVarValue {
        self.empty()
    }

    fn execute(&self, after: &LiveVarValue, _pos: InstrPos, instr: &Instruction) -> LiveVarValue {
        let mut live = after.live.clone();

        if let Some(index) = instr
            .assigned_variable()
            .and_then(|var| self.table.index_of(var))
        {
            live.remove(index);
        }
        instr.for_each_read(&mut |var| {
            if let Some(index) = self.table.index_of(var) {
                live.insert(index);
            }
        });

        LiveVarValue {
            table: Arc::clone(&self.table),
            live,
        }
    }
}

/// Variables live at one program point.
#[derive(Clone)]
pub struct LiveVarValue {
    table: Arc<VariableTable>,
    live: BitSet,
}

impl LiveVarValue {
    /// Returns `true` if the given variable is live at this point.
    #[must_use]
    pub fn is_live(&self, var: &Variable) -> bool {
        self.table
            .index_of(var)
            .is_some_and(|index| self.live.contains(index))
    }

    /// Returns an iterator over all live variables.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> + '_ {
        self.live.iter().filter_map(|index| self.table.variable(index))
    }

    /// Returns the number of live variables.
    #[must_use]
    pub fn count(&self) -> usize {
        self.live.count()
    }

    /// Returns `true` if no variables are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Returns the underlying bit set.
    #[must_use]
    pub const fn as_bitset(&self) -> &BitSet {
        &self.live
    }
}

impl PartialEq for LiveVarValue {
    fn eq(&self, other: &Self) -> bool {
        self.live == other.live
    }
}

impl std::fmt::Debug for LiveVarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set()
            .entries(self.variables().map(ToString::to_string))
            .finish()
    }
}

impl MeetSemiLattice for LiveVarValue {
    /// Meet is union (a variable is live if it's live on ANY successor path).
    fn meet(&self, other: &Self) -> Self {
        let mut live = self.live.clone();
        live.union_with(&other.live);
        Self {
            table: Arc::clone(&self.table),
            live,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::dataflow::DataFlowSolver,
        ir::{BinaryOp, CompareOp, LabelId, Location, ShaderType, Value},
    };

    fn l(i: u32) -> Variable {
        Variable::local(i, ShaderType::INT)
    }

    fn solve(cfg: &IntermediaryCfg) -> crate::analysis::dataflow::AnalysisInfo<LiveVarValue> {
        let table = VariableTable::from_cfg(cfg, &[]);
        DataFlowSolver::new(LiveVariables::new(table))
            .solve(cfg)
            .unwrap()
    }

    #[test]
    fn test_liveness_dead_local() {
        // l1 = 1; return l0;  (l1 is never used)
        let cfg = IntermediaryCfg::build(&[
            Instruction::assign(&l(1), Value::int(1)),
            Instruction::Return(Some(Value::var(&l(0)))),
        ])
        .unwrap();
        let info = solve(&cfg);

        let body = cfg.block(cfg.entry()).unwrap().next[0];
        let after_store = info.after(InstrPos::new(body, 0)).unwrap();
        assert!(!after_store.is_live(&l(1)));
        assert!(after_store.is_live(&l(0)));
        assert_eq!(info.block(body).unwrap().input.count(), 1);
    }

    #[test]
    fn test_liveness_loop() {
        // l0 = 0; loop: if l0 >= 10 goto exit; l0 = l0 + 1; goto loop; exit: return l0
        let cfg = IntermediaryCfg::build(&[
            Instruction::assign(&l(0), Value::int(0)),
            Instruction::Label(LabelId(0)),
            Instruction::JumpIf {
                condition: Value::compare(CompareOp::Ge, Value::var(&l(0)), Value::int(10)),
                target: LabelId(1),
            },
            Instruction::assign(
                &l(0),
                Value::binary(BinaryOp::Add, Value::var(&l(0)), Value::int(1)),
            ),
            Instruction::Goto(LabelId(0)),
            Instruction::Label(LabelId(1)),
            Instruction::Return(Some(Value::var(&l(0)))),
        ])
        .unwrap();
        let info = solve(&cfg);

        assert!(info.block(cfg.entry()).unwrap().output.is_empty());
        let header = cfg.reverse_postorder()[2];
        assert!(info.block(header).unwrap().input.is_live(&l(0)));
        assert!(info.block(cfg.exit()).unwrap().input.is_empty());
    }

    #[test]
    fn test_element_store_reads_array() {
        let arr = Variable::local(0, ShaderType::runtime_array(ShaderType::INT));
        let cfg = IntermediaryCfg::build(&[
            Instruction::Assign {
                location: Location::ArrayElement {
                    array: Value::var(&arr),
                    index: Value::int(0),
                },
                value: Value::int(1),
            },
            Instruction::Return(None),
        ])
        .unwrap();
        let info = solve(&cfg);
        let body = cfg.block(cfg.entry()).unwrap().next[0];
        assert!(info.before(InstrPos::new(body, 0)).unwrap().is_live(&arr));
    }

    #[test]
    fn test_liveness_meet() {
        let cfg = IntermediaryCfg::build(&[Instruction::Return(Some(Value::binary(
            BinaryOp::Add,
            Value::var(&l(0)),
            Value::var(&l(1)),
        )))])
        .unwrap();
        let analysis = LiveVariables::new(VariableTable::from_cfg(&cfg, &[]));
        let pos = InstrPos::new(cfg.block(cfg.entry()).unwrap().next[0], 0);
        let ret = cfg.instruction(pos).unwrap();

        let a = analysis.execute(&analysis.empty(), pos, ret);
        let b = analysis.empty();
        assert_eq!(a.meet(&b), b.meet(&a));
        assert_eq!(a.meet(&a), a);
        assert_eq!(a.meet(&b).count(), 2);
    }
}
