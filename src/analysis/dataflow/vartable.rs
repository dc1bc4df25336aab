//! Dense numbering of the variables of one method.

use std::{collections::HashMap, sync::Arc};

use crate::{
    analysis::cfg::IntermediaryCfg,
    ir::Variable,
    utils::BitSet,
};

/// Assigns every variable read or written in a CFG a dense index, so set-valued
/// facts can be stored as [`BitSet`]s.
///
/// Indices follow first occurrence in block order. The table is shared by
/// reference count between all facts of an analysis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableTable {
    variables: Vec<Variable>,
    indices: HashMap<Variable, usize>,
}

impl VariableTable {
    /// Collects the variables of `cfg`, plus `extra` (typically parameters
    /// that the body never mentions).
    #[must_use]
    pub fn from_cfg(cfg: &IntermediaryCfg, extra: &[Variable]) -> Arc<Self> {
        let mut table = Self::default();
        for var in extra {
            table.insert(var);
        }
        for (_, instr) in cfg.instructions() {
            instr.for_each_read(&mut |var| {
                table.insert(var);
            });
            if let Some(var) = instr.assigned_variable() {
                table.insert(var);
            }
        }
        Arc::new(table)
    }

    fn insert(&mut self, var: &Variable) -> usize {
        if let Some(&index) = self.indices.get(var) {
            return index;
        }
        let index = self.variables.len();
        self.variables.push(var.clone());
        self.indices.insert(var.clone(), index);
        index
    }

    /// Returns the index of `var`.
    #[must_use]
    pub fn index_of(&self, var: &Variable) -> Option<usize> {
        self.indices.get(var).copied()
    }

    /// Returns the variable at `index`.
    #[must_use]
    pub fn variable(&self, index: usize) -> Option<&Variable> {
        self.variables.get(index)
    }

    /// Returns the number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Returns `true` if the method uses no variables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Iterates the variables in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }

    /// Returns an empty set sized for this table.
    #[must_use]
    pub fn empty_set(&self) -> BitSet {
        BitSet::new(self.len())
    }

    /// Returns a set of `vars`, ignoring variables not in the table.
    #[must_use]
    pub fn set_of<'a>(&self, vars: impl IntoIterator<Item = &'a Variable>) -> BitSet {
        let mut set = self.empty_set();
        for var in vars {
            if let Some(index) = self.index_of(var) {
                set.insert(index);
            }
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinaryOp, Instruction, ShaderType, Value};

    #[test]
    fn test_first_occurrence_order() {
        let a = Variable::local(0, ShaderType::INT);
        let b = Variable::local(1, ShaderType::INT);
        let s = Variable::stack(0, ShaderType::INT);
        let cfg = IntermediaryCfg::build(&[
            Instruction::assign(&s, Value::binary(BinaryOp::Add, Value::var(&b), Value::int(1))),
            Instruction::assign(&a, Value::var(&s)),
            Instruction::Return(None),
        ])
        .unwrap();

        let param = Variable::local(7, ShaderType::FLOAT);
        let table = VariableTable::from_cfg(&cfg, &[param.clone()]);
        assert_eq!(table.len(), 4);
        assert_eq!(table.index_of(&param), Some(0));
        assert_eq!(table.index_of(&b), Some(1));
        assert_eq!(table.index_of(&s), Some(2));
        assert_eq!(table.index_of(&a), Some(3));
        assert_eq!(table.variable(1), Some(&b));
        assert_eq!(table.index_of(&Variable::local(9, ShaderType::INT)), None);
    }
}
