//! Dead assignment elimination.
//!
//! Removes assignments to variables that are not live afterwards, and
//! self-copies `x = x`. Removing one assignment can make the values it read
//! dead in turn, so the pass repeats until liveness is stable.
//!
//! An assignment whose value calls something with side effects is kept. When
//! the value is exactly such a call, the assignment is turned into a call
//! statement instead.

use crate::{
    analysis::{DataFlowSolver, IntermediaryCfg, LiveVariables, VariableTable},
    compiler::{pass::ShaderPass, CompilationContext, CompileOptions, EventKind, EventLog},
    ir::{Instruction, Location, Value},
    resolve::CallEffects,
    Result,
};

use super::MethodBody;

/// Maximum iterations for the fixed-point loop.
const MAX_ITERATIONS: usize = 100;

/// Dead assignment elimination pass.
#[derive(Debug)]
pub struct DeadAssignmentPass {
    max_lattice_height: usize,
}

impl DeadAssignmentPass {
    /// Creates the pass; `max_lattice_height` bounds its liveness solves.
    #[must_use]
    pub fn new(max_lattice_height: usize) -> Self {
        Self { max_lattice_height }
    }

    fn run_iteration(
        &self,
        body: &MethodBody,
        effects: &dyn CallEffects,
        changes: &EventLog,
    ) -> Result<Option<IntermediaryCfg>> {
        let table = VariableTable::from_cfg(&body.cfg, &body.parameters);
        let live = DataFlowSolver::new(LiveVariables::new(table))
            .with_max_lattice_height(self.max_lattice_height)
            .solve(&body.cfg)?;

        let mut changed = false;
        let cfg = body.cfg.map_instructions(|pos, instr| {
            let Instruction::Assign {
                location: Location::Variable(var),
                value,
            } = instr
            else {
                return Some(instr.clone());
            };
            let self_copy = matches!(value, Value::Variable(v) if v == var);
            let dead = live.after(pos).is_some_and(|facts| !facts.is_live(var));
            if !self_copy && !dead {
                return Some(instr.clone());
            }

            let pure = value.calls().into_iter().all(|call| effects.is_pure(call));
            let replacement = match value {
                _ if pure => None,
                Value::Call(call) => Some(Instruction::Call(call.clone())),
                _ => return Some(instr.clone()),
            };
            changed = true;
            changes
                .record(EventKind::AssignmentRemoved)
                .at(&body.name, pos.block)
                .pass(self.name())
                .message(instr.to_string());
            replacement
        });

        Ok(changed.then_some(cfg))
    }
}

impl ShaderPass for DeadAssignmentPass {
    fn name(&self) -> &'static str {
        "dead-assignment-elimination"
    }

    fn description(&self) -> &'static str {
        "Removes assignments whose value is never read"
    }

    fn should_run(&self, options: &CompileOptions) -> bool {
        options.eliminate_dead_assignments
    }

    fn run_on_method(&self, body: &mut MethodBody, ctx: &CompilationContext) -> Result<bool> {
        let changes = EventLog::new();
        let effects = ctx.effects.as_ref();

        for _ in 0..MAX_ITERATIONS {
            match self.run_iteration(body, effects, &changes)? {
                Some(cfg) => body.cfg = cfg,
                None => break,
            }
        }

        let changed = !changes.is_empty();
        if changed {
            ctx.events.merge(&changes);
        }
        Ok(changed)
    }
}
