//! Stack value inlining.
//!
//! Lifted bytecode routes every intermediate result through a STACK variable:
//! `a + b * c` arrives as three or four assignments. This pass moves the value
//! of such an assignment into the instructions that read it and deletes the
//! assignment, rebuilding the expression tree.
//!
//! # Conditions
//!
//! A STACK assignment `s = v` at `d` is inlined into its reads when:
//!
//! 1. every read of `s` that may see `d` sees only `d` (possible values),
//! 2. `s` still holds exactly `v` at every read, so nothing `v` depends on was
//!    written in between (value tracking),
//! 3. `v` may move at all: no reads of buffer or shared memory, no calls with
//!    side effects,
//! 4. `v` is read once, or evaluating it repeatedly is harmless.
//!
//! Chains are resolved over several rounds: within one round an instruction
//! is either the source or the target of inlining, never both, so each round
//! only moves values whose facts are current. Analyses are recomputed between
//! rounds.

use std::collections::HashMap;

use crate::{
    analysis::{
        DataFlowSolver, DefToken, InstrPos, IntermediaryCfg, PossibleValues, ValueTracking,
        VariableTable,
    },
    compiler::{pass::ShaderPass, CompilationContext, CompileOptions, EventKind, EventLog},
    ir::{Instruction, Location, Value, Variable},
    resolve::CallEffects,
    Result,
};

use super::MethodBody;

/// Maximum rounds per run, bounding chain resolution on pathological input.
const MAX_ITERATIONS: usize = 100;

/// Stack value inlining pass.
#[derive(Debug)]
pub struct InlineValuesPass {
    max_lattice_height: usize,
}

impl InlineValuesPass {
    /// Creates the pass; `max_lattice_height` bounds its dataflow solves.
    #[must_use]
    pub fn new(max_lattice_height: usize) -> Self {
        Self { max_lattice_height }
    }

    /// Performs one round. Returns the rewritten graph, or `None` if nothing
    /// could be inlined.
    fn run_round(
        &self,
        body: &MethodBody,
        effects: &dyn CallEffects,
        changes: &EventLog,
    ) -> Result<Option<IntermediaryCfg>> {
        let cfg = &body.cfg;
        let table = VariableTable::from_cfg(cfg, &body.parameters);

        let mut solver = DataFlowSolver::new(PossibleValues::new(table, effects))
            .with_max_lattice_height(self.max_lattice_height);
        let possible = solver.solve(cfg)?;
        let uses = solver.into_analysis().into_uses();
        let values = DataFlowSolver::new(ValueTracking::new(effects))
            .with_max_lattice_height(self.max_lattice_height)
            .solve(cfg)?;

        let mut donors: HashMap<InstrPos, (Variable, Value)> = HashMap::new();
        let mut substitutions: HashMap<InstrPos, Vec<(Variable, Value)>> = HashMap::new();

        for (pos, instr) in cfg.instructions() {
            let Instruction::Assign {
                location: Location::Variable(var),
                value,
            } = instr
            else {
                continue;
            };
            if !var.is_stack() || !movable(value, effects) {
                continue;
            }

            let token = DefToken(pos);
            let sites = uses.uses_of(token);
            if sites.is_empty() || (sites.len() > 1 && !value.duplicate_inline_safe()) {
                continue;
            }
            let reaches = sites.iter().all(|&site| {
                possible.before(site).and_then(|facts| facts.unique(var)) == Some(token)
                    && values.before(site).and_then(|facts| facts.get(var)) == Some(value)
            });
            if !reaches {
                continue;
            }

            // Sources and targets of this round must be disjoint
            if substitutions.contains_key(&pos)
                || sites
                    .iter()
                    .any(|site| *site == pos || donors.contains_key(site))
            {
                continue;
            }
            donors.insert(pos, (var.clone(), value.clone()));
            for &site in sites {
                let entry = substitutions.entry(site).or_default();
                if !entry.iter().any(|(v, _)| v == var) {
                    entry.push((var.clone(), value.clone()));
                }
            }
        }

        if donors.is_empty() {
            return Ok(None);
        }

        let rewritten = cfg.map_instructions(|pos, instr| {
            if let Some((var, value)) = donors.get(&pos) {
                changes
                    .record(EventKind::ValueInlined)
                    .at(&body.name, pos.block)
                    .pass(self.name())
                    .message(format!("{var} -> {value}"));
                return None;
            }
            match substitutions.get(&pos) {
                Some(subs) => Some(instr.map_values(|value| substitute_all(value, subs))),
                None => Some(instr.clone()),
            }
        });
        Ok(Some(rewritten))
    }
}

fn movable(value: &Value, effects: &dyn CallEffects) -> bool {
    value.may_inline() && value.calls().into_iter().all(|call| effects.is_pure(call))
}

/// Replaces all listed variables at once, so a substituted value is never
/// rewritten again.
fn substitute_all(value: &Value, subs: &[(Variable, Value)]) -> Value {
    value.rewrite(&mut |v| match v {
        Value::Variable(var) => subs
            .iter()
            .find(|(candidate, _)| candidate == var)
            .map(|(_, replacement)| replacement.clone()),
        _ => None,
    })
}

impl ShaderPass for InlineValuesPass {
    fn name(&self) -> &'static str {
        "inline-values"
    }

    fn description(&self) -> &'static str {
        "Moves stack values into the instructions reading them"
    }

    fn should_run(&self, options: &CompileOptions) -> bool {
        options.inline_values
    }

    fn run_on_method(&self, body: &mut MethodBody, ctx: &CompilationContext) -> Result<bool> {
        let changes = EventLog::new();
        let effects = ctx.effects.as_ref();

        for _ in 0..MAX_ITERATIONS {
            match self.run_round(body, effects, &changes)? {
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
