//! Definite assignment analysis.
//!
//! A forward must-analysis: a variable is defined at a point if every path
//! from the entry assigns it first. Parameters count as assigned at the entry.
//! The emitter gives a zero initializer to every local that some read may
//! observe undefined.

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

/// Defined-variables analysis.
#[derive(Debug, Clone)]
pub struct DefinedVariables {
    table: Arc<VariableTable>,
    parameters: BitSet,
}

impl DefinedVariables {
    /// Creates the analysis; `parameters` are defined at the entry.
    #[must_use]
    pub fn new(table: Arc<VariableTable>, parameters: &[Variable]) -> Self {
        let parameters = table.set_of(parameters);
        Self { table, parameters }
    }
}

impl DataFlowAnalysis for DefinedVariables {
    type Lattice = DefinedValue;
    const DIRECTION: Direction = Direction::Forward;
    const NAME: &'static str = "defined-variables";

    fn head_value(&self, _cfg: &IntermediaryCfg) -> DefinedValue {
        DefinedValue {
            table: Arc::clone(&self.table),
            defined: self.parameters.clone(),
        }
    }

    fn top(&self, _cfg: &IntermediaryCfg) -> DefinedValue {
        // Intersection identity: nothing has disproved any variable yet
        DefinedValue {
            table: Arc::clone(&self.table),
            defined: BitSet::full(self.table.len()),
        }
    }

    fn execute(&self, fact: &DefinedValue, _pos: InstrPos, instr: &Instruction) -> DefinedValue {
        match instr.assigned_variable() {
            Some(var) => fact.with(var),
            None => fact.clone(),
        }
    }
}

/// Variables definitely assigned at one program point.
#[derive(Clone)]
pub struct DefinedValue {
    table: Arc<VariableTable>,
    defined: BitSet,
}

impl DefinedValue {
    /// Returns `true` if `var` is assigned on every path to this point.
    #[must_use]
    pub fn is_defined(&self, var: &Variable) -> bool {
        self.table
            .index_of(var)
            .is_some_and(|index| self.defined.contains(index))
    }

    /// Returns the defined variables.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> + '_ {
        self.defined
            .iter()
            .filter_map(|index| self.table.variable(index))
    }

    /// Returns the number of defined variables.
    #[must_use]
    pub fn count(&self) -> usize {
        self.defined.count()
    }

    fn with(&self, var: &Variable) -> Self {
        let mut defined = self.defined.clone();
        if let Some(index) = self.table.index_of(var) {
            defined.insert(index);
        }
        Self {
            table: Arc::clone(&self.table),
            defined,
        }
    }
}

impl PartialEq for DefinedValue {
    fn eq(&self, other: &Self) -> bool {
        self.defined == other.defined
    }
}

impl std::fmt::Debug for DefinedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set()
            .entries(self.variables().map(ToString::to_string))
            .finish()
    }
}

impl MeetSemiLattice for DefinedValue {
    /// Meet is intersection (a variable is defined only if defined on EVERY path).
    fn meet(&self, other: &Self) -> Self {
        let mut defined = self.defined.clone();
        defined.intersect_with(&other.defined);
        Self {
            table: Arc::clone(&self.table),
            defined,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::dataflow::DataFlowSolver,
        ir::{LabelId, ShaderType, Value},
    };

    fn l(i: u32) -> Variable {
        Variable::local(i, ShaderType::INT)
    }

    /// `if p { l1 = 1; l2 = 1 } else { l1 = 2 } return l1 + l2`
    fn diamond() -> IntermediaryCfg {
        IntermediaryCfg::build(&[
            Instruction::JumpIf {
                condition: Value::var(&l(0)),
                target: LabelId(0),
            },
            Instruction::assign(&l(1), Value::int(2)),
            Instruction::Goto(LabelId(1)),
            Instruction::Label(LabelId(0)),
            Instruction::assign(&l(1), Value::int(1)),
            Instruction::assign(&l(2), Value::int(1)),
            Instruction::Label(LabelId(1)),
            Instruction::Return(Some(Value::var(&l(1)))),
        ])
        .unwrap()
    }

    #[test]
    fn test_defined_at_merge_requires_all_paths() {
        let cfg = diamond();
        let table = VariableTable::from_cfg(&cfg, &[l(0)]);
        let info = DataFlowSolver::new(DefinedVariables::new(table, &[l(0)]))
            .solve(&cfg)
            .unwrap();

        let at_exit = &info.block(cfg.exit()).unwrap().input;
        assert!(at_exit.is_defined(&l(0)));
        assert!(at_exit.is_defined(&l(1)));
        assert!(!at_exit.is_defined(&l(2)));
        assert_eq!(at_exit.count(), 2);
    }

    #[test]
    fn test_meet_commutative_idempotent() {
        let cfg = diamond();
        let table = VariableTable::from_cfg(&cfg, &[]);
        let analysis = DefinedVariables::new(Arc::clone(&table), &[]);
        let a = analysis.head_value(&cfg).with(&l(1)).with(&l(2));
        let b = analysis.head_value(&cfg).with(&l(0)).with(&l(1));

        assert_eq!(a.meet(&b), b.meet(&a));
        assert_eq!(a.meet(&a), a);
        assert_eq!(analysis.top(&cfg).meet(&a), a);
        assert_eq!(a.meet(&b).variables().cloned().collect::<Vec<_>>(), vec![l(1)]);
    }
}
