//! Data flow analysis framework over the intermediary CFG.
//!
//! This module provides a generic framework for computing properties that
//! propagate along control flow edges. It supports both forward and backward
//! analyses using a worklist-based solver, with facts recorded per block and
//! per instruction position.
//!
//! # Architecture
//!
//! The framework is built around three core abstractions:
//!
//! - **Lattice**: Defines the domain of abstract values with a meet operation
//! - **Analysis**: Specifies the head value, the top element and the transfer function
//! - **Solver**: Iteratively computes fixpoints using a worklist algorithm
//!
//! # Analyses Provided
//!
//! | Analysis | Direction | Fact |
//! |----------|-----------|------|
//! | [`DefinedVariables`] | forward | variables assigned on every path |
//! | [`LiveVariables`] | backward | variables whose value may still be read |
//! | [`ValueTracking`] | forward | STACK variable to value map |
//! | [`MutabilityAnalysis`] | forward | per-variable [`Mutability`] |
//! | [`PossibleValues`] | forward | candidate definitions per variable, plus a [`UseTable`] |
//!
//! The analyses share no mutable state. Each reads the frozen CFG and produces
//! its own [`AnalysisInfo`], so independent analyses may run in parallel.
//!
//! # Example
//!
//! ```rust,ignore
//! use shaderlift::analysis::{DataFlowSolver, IntermediaryCfg, LiveVariables, VariableTable};
//!
//! let cfg = IntermediaryCfg::build(&instructions)?;
//! let table = VariableTable::from_cfg(&cfg, &params);
//!
//! let info = DataFlowSolver::new(LiveVariables::new(table)).solve(&cfg)?;
//! for (pos, facts) in info.instructions() {
//!     println!("{pos}: {:?}", facts.output);
//! }
//! ```
//!
//! # Thread Safety
//!
//! All fact types are `Send` and `Sync`.

mod defined;
mod framework;
mod lattice;
mod liveness;
mod mutability;
mod possible;
mod solver;
mod values;
mod vartable;

pub use defined::{DefinedValue, DefinedVariables};
pub use framework::{AnalysisInfo, DataFlowAnalysis, Direction, Facts};
pub use lattice::MeetSemiLattice;
pub use liveness::{LiveVarValue, LiveVariables};
pub use mutability::{mutated_variables, Mutability, MutabilityAnalysis, MutabilityValue};
pub use possible::{DefToken, PossibleValues, PossibleValuesValue, UseTable};
pub use solver::{DataFlowSolver, DEFAULT_MAX_LATTICE_HEIGHT};
pub use values::{ValueTrackValue, ValueTracking};
pub use vartable::VariableTable;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::IntermediaryCfg,
        ir::{BinaryOp, CompareOp, Instruction, LabelId, ShaderType, Value, Variable},
        resolve::CallEffectTable,
    };

    /// Nested counting loops over `i` and `j`.
    fn nested_loops() -> IntermediaryCfg {
        let i = Variable::local(0, ShaderType::INT);
        let j = Variable::local(1, ShaderType::INT);
        let inc = |v: &Variable| {
            Instruction::assign(v, Value::binary(BinaryOp::Add, Value::var(v), Value::int(1)))
        };
        IntermediaryCfg::build(&[
            Instruction::assign(&i, Value::int(0)),
            Instruction::Label(LabelId(0)),
            Instruction::JumpIf {
                condition: Value::compare(CompareOp::Ge, Value::var(&i), Value::int(5)),
                target: LabelId(3),
            },
            Instruction::assign(&j, Value::int(0)),
            Instruction::Label(LabelId(1)),
            Instruction::JumpIf {
                condition: Value::compare(CompareOp::Ge, Value::var(&j), Value::int(5)),
                target: LabelId(2),
            },
            inc(&j),
            Instruction::Goto(LabelId(1)),
            Instruction::Label(LabelId(2)),
            inc(&i),
            Instruction::Goto(LabelId(0)),
            Instruction::Label(LabelId(3)),
            Instruction::Return(Some(Value::var(&i))),
        ])
        .unwrap()
    }

    #[test]
    fn test_solver_convergence() {
        let cfg = nested_loops();
        let table = VariableTable::from_cfg(&cfg, &[]);
        let effects = CallEffectTable::new();
        let limit = cfg.block_count() * DEFAULT_MAX_LATTICE_HEIGHT;

        let defined = DataFlowSolver::new(DefinedVariables::new(table.clone(), &[]))
            .solve(&cfg)
            .unwrap();
        let live = DataFlowSolver::new(LiveVariables::new(table.clone()))
            .solve(&cfg)
            .unwrap();
        let values = DataFlowSolver::new(ValueTracking::new(&effects))
            .solve(&cfg)
            .unwrap();
        let possible = DataFlowSolver::new(PossibleValues::new(table, &effects))
            .solve(&cfg)
            .unwrap();

        for iterations in [
            defined.iterations(),
            live.iterations(),
            values.iterations(),
            possible.iterations(),
        ] {
            assert!(iterations <= limit);
        }

        let i = Variable::local(0, ShaderType::INT);
        let j = Variable::local(1, ShaderType::INT);
        let at_exit = &defined.block(cfg.exit()).unwrap().input;
        assert!(at_exit.is_defined(&i));
        assert!(!at_exit.is_defined(&j));
        assert!(live.block(cfg.entry()).unwrap().output.is_empty());
    }

    #[test]
    fn test_analysis_results_access() {
        let cfg = nested_loops();
        let table = VariableTable::from_cfg(&cfg, &[]);
        let info = DataFlowSolver::new(LiveVariables::new(table))
            .solve(&cfg)
            .unwrap();

        assert_eq!(info.block_count(), cfg.block_count());
        assert_eq!(info.instructions().count(), cfg.instruction_count());
        for (pos, facts) in info.instructions() {
            assert_eq!(info.at(pos), Some(facts));
        }
    }
}
