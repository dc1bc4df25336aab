//! The interface every optimisation pass implements.

use crate::{
    analysis::IntermediaryCfg,
    compiler::{CompilationContext, CompileOptions},
    ir::Variable,
    Result,
};

/// The part of a method the passes transform.
#[derive(Debug, Clone)]
pub struct MethodBody {
    /// Method name, for events and errors
    pub name: String,
    /// Parameter variables; defined on entry
    pub parameters: Vec<Variable>,
    /// Control-flow graph of the body
    pub cfg: IntermediaryCfg,
}

/// An optimisation pass over the CFG of one method.
///
/// Passes must be thread-safe (Send + Sync): one pass instance serves every
/// method of a [`Compiler::compile_all`](crate::compiler::Compiler::compile_all)
/// run. A pass never changes the shape of the graph, only its instructions, so
/// block ids stay valid across passes.
pub trait ShaderPass: Send + Sync {
    /// Unique name for logging and debugging.
    fn name(&self) -> &'static str;

    /// Get a description of what this pass does.
    fn description(&self) -> &'static str {
        "No description available"
    }

    /// Should this pass run under `options`?
    fn should_run(&self, _options: &CompileOptions) -> bool {
        true
    }

    /// Runs the pass on one method body.
    ///
    /// Returns `true` if any instruction changed. Events are collected in a
    /// local [`EventLog`](crate::compiler::EventLog) and merged into
    /// `ctx.events` once the pass succeeded.
    ///
    /// # Errors
    ///
    /// Returns an error if an analysis the pass relies on fails to converge or
    /// the body violates an invariant the pass depends on.
    fn run_on_method(&self, body: &mut MethodBody, ctx: &CompilationContext) -> Result<bool>;
}
