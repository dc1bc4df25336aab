//! Program analysis over lifted shader methods.
//!
//! This module turns a lifted instruction list into a control-flow graph and
//! computes the dataflow facts the optimisation passes and the emitter rely on.
//! It builds upon the generic graph infrastructure in [`crate::utils::graph`].
//!
//! # Architecture
//!
//! - [`cfg`] - Control Flow Graph construction, traversal and DOT export
//! - [`dataflow`] - Generic fixed-point solver and the five concrete analyses
//!
//! # Usage
//!
//! ```rust,ignore
//! use shaderlift::analysis::{DataFlowSolver, IntermediaryCfg, LiveVariables, VariableTable};
//!
//! let cfg = IntermediaryCfg::build(&instructions)?;
//!
//! // Access dominator tree (lazily computed)
//! let dominators = cfg.dominators();
//! assert!(dominators.dominates(cfg.entry(), cfg.exit()));
//!
//! let table = VariableTable::from_cfg(&cfg, &params);
//! let live = DataFlowSolver::new(LiveVariables::new(table)).solve(&cfg)?;
//! ```

pub mod cfg;
pub mod dataflow;

// Re-export primary types at module level
pub use cfg::{BasicBlock, CfgEdgeKind, InstrPos, IntermediaryCfg};
pub use dataflow::{
    mutated_variables, AnalysisInfo, DataFlowAnalysis, DataFlowSolver, DefToken, DefinedValue,
    DefinedVariables, Direction, Facts, LiveVarValue, LiveVariables, MeetSemiLattice, Mutability,
    MutabilityAnalysis, MutabilityValue, PossibleValues, PossibleValuesValue, UseTable,
    ValueTrackValue, ValueTracking, VariableTable, DEFAULT_MAX_LATTICE_HEIGHT,
};
