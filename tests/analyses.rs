//! Dataflow analysis properties over generated programs.
//!
//! The generated bodies come from the same builder the structuring tests use,
//! so they carry loops, multi-way switches and early exits. Every check here
//! goes through the public analysis API only.

mod common;

use common::programs::{self, local, stack};
use proptest::prelude::*;
use shaderlift::{
    analysis::{
        AnalysisInfo, DataFlowSolver, DefinedVariables, InstrPos, IntermediaryCfg,
        LiveVariables, MeetSemiLattice, ValueTracking, VariableTable,
    },
    ir::{BinaryOp, CallSignature, CallValue, Instruction, ShaderType, Value, Variable},
    resolve::{CallEffectTable, MutationTarget},
};

/// Upper bound on worklist iterations for a lattice of the given height.
///
/// Every block is visited once up front; afterwards a block is only revisited
/// when a neighbour's fact changed, and each fact changes at most `height`
/// times.
fn iteration_bound(cfg: &IntermediaryCfg, height: usize) -> usize {
    let edges: usize = cfg.blocks().map(|(_, block)| block.next.len()).sum();
    cfg.block_count() + height * edges
}

fn sample_facts<L: Clone>(info: &AnalysisInfo<L>, limit: usize) -> Vec<L> {
    info.instructions()
        .take(limit)
        .flat_map(|(_, facts)| [facts.input.clone(), facts.output.clone()])
        .collect()
}

fn check_meet_laws<L: MeetSemiLattice>(facts: &[L]) -> Result<(), TestCaseError> {
    for a in facts {
        prop_assert_eq!(&a.meet(a), a);
        for b in facts {
            let ab = a.meet(b);
            prop_assert_eq!(&ab, &b.meet(a));
            // The meet is a lower bound of both sides
            prop_assert_eq!(&ab.meet(a), &ab);
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn built_cfg_has_no_mergeable_pair(blocks in programs::program(7)) {
        let cfg = IntermediaryCfg::build(&programs::build(&blocks)).unwrap();
        for (id, block) in cfg.blocks() {
            let [next] = block.next.as_slice() else {
                continue;
            };
            let successor = cfg.block(*next).unwrap();
            let mergeable = *next != id
                && successor.prev.as_slice() == [id]
                && block.mergable
                && successor.mergable;
            prop_assert!(!mergeable, "{} and {} left unmerged", id, next);
        }
    }

    #[test]
    fn defined_variables_properties(blocks in programs::program(6)) {
        let cfg = IntermediaryCfg::build(&programs::build(&blocks)).unwrap();
        let table = VariableTable::from_cfg(&cfg, &[]);
        let height = table.len() + 1;

        let mut solver = DataFlowSolver::new(DefinedVariables::new(table.clone(), &[]));
        let info = solver.solve(&cfg).unwrap();
        prop_assert!(info.iterations() <= iteration_bound(&cfg, height));

        // Assignments only ever add definitions
        for (_, facts) in info.instructions() {
            for var in facts.input.variables() {
                prop_assert!(facts.output.is_defined(var));
            }
        }

        // The loop counter is written at the top of every block, so it is
        // defined after the first instruction of any block that reads it
        let counter = local(3);
        for (pos, facts) in info.instructions() {
            if let Some(Instruction::JumpIf { condition, .. }) = cfg.instruction(pos) {
                if condition.read_variables().contains(&counter) {
                    prop_assert!(facts.input.is_defined(&counter));
                }
            }
        }

        check_meet_laws(&sample_facts(&info, 12))?;
    }

    #[test]
    fn live_variables_properties(blocks in programs::program(6)) {
        let cfg = IntermediaryCfg::build(&programs::build(&blocks)).unwrap();
        let table = VariableTable::from_cfg(&cfg, &[]);
        let height = table.len() + 1;

        let mut solver = DataFlowSolver::new(LiveVariables::new(table));
        let info = solver.solve(&cfg).unwrap();
        prop_assert!(info.iterations() <= iteration_bound(&cfg, height));

        for (pos, facts) in info.instructions() {
            let Some(instr) = cfg.instruction(pos) else {
                continue;
            };
            // Whatever an instruction reads is live just before it
            let mut reads = Vec::new();
            instr.for_each_read(&mut |var| reads.push(var.clone()));
            for var in &reads {
                prop_assert!(facts.input.is_live(var), "{instr:?} reads {var}");
            }
        }

        check_meet_laws(&sample_facts(&info, 12))?;
    }
}

fn operand() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::var(&local(0))),
        Just(Value::var(&local(1))),
        (-8i32..8).prop_map(Value::int),
    ]
}

fn expression() -> impl Strategy<Value = Value> {
    operand().prop_recursive(3, 12, 2, |inner| {
        (
            prop_oneof![
                Just(BinaryOp::Add),
                Just(BinaryOp::Xor),
                Just(BinaryOp::Mul)
            ],
            inner.clone(),
            inner,
        )
            .prop_map(|(op, lhs, rhs)| Value::binary(op, lhs, rhs))
    })
}

fn scramble() -> CallSignature {
    CallSignature::new("test/Kernel", "scramble", "(II)I")
}

fn mutating_effects(position: usize) -> CallEffectTable {
    CallEffectTable::new().with(scramble(), vec![MutationTarget::Argument(position)])
}

fn position_of(cfg: &IntermediaryCfg, wanted: impl Fn(&Instruction) -> bool) -> InstrPos {
    cfg.instructions()
        .find(|(_, instr)| wanted(instr))
        .map(|(pos, _)| pos)
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn call_invalidates_tracked_readers(tracked in prop::collection::vec(expression(), 1..5)) {
        let result = local(2);
        let mut body: Vec<Instruction> = tracked
            .iter()
            .enumerate()
            .map(|(i, value)| Instruction::assign(&stack(i as u32), value.clone()))
            .collect();
        let call = CallValue::new(
            scramble(),
            vec![Value::var(&local(0)), Value::var(&local(1))],
            ShaderType::INT,
        );
        body.push(Instruction::assign(&result, Value::Call(call)));
        body.push(Instruction::Return(None));

        let cfg = IntermediaryCfg::build(&body).unwrap();
        let effects = mutating_effects(1);
        let info = DataFlowSolver::new(ValueTracking::new(&effects))
            .solve(&cfg)
            .unwrap();

        let at_call = position_of(&cfg, |instr| instr.assigned_variable() == Some(&result));
        let before = info.before(at_call).unwrap();
        let after = info.after(at_call).unwrap();

        let written = Value::var(&local(1));
        for (i, value) in tracked.iter().enumerate() {
            let var = stack(i as u32);
            prop_assert_eq!(before.get(&var), Some(value));
            let survives = !value.contains(&written);
            prop_assert_eq!(after.get(&var).is_some(), survives, "{}", value);
        }
    }
}

#[test]
fn test_call_through_stack_alias() {
    let (l0, l1) = (local(0), local(1));
    let signature = CallSignature::new("test/Kernel", "reset", "(I)V");
    let body = vec![
        Instruction::assign(&stack(0), Value::var(&l1)),
        Instruction::assign(
            &stack(1),
            Value::binary(BinaryOp::Mul, Value::var(&l1), Value::int(2)),
        ),
        Instruction::assign(
            &stack(2),
            Value::binary(BinaryOp::Add, Value::var(&l0), Value::int(1)),
        ),
        Instruction::Call(CallValue::new(
            signature.clone(),
            vec![Value::var(&stack(0))],
            ShaderType::Void,
        )),
        Instruction::Return(None),
    ];

    let cfg = IntermediaryCfg::build(&body).unwrap();
    let effects = CallEffectTable::new().with(signature, vec![MutationTarget::Argument(0)]);
    let info = DataFlowSolver::new(ValueTracking::new(&effects))
        .solve(&cfg)
        .unwrap();

    let at_call = position_of(&cfg, |instr| matches!(instr, Instruction::Call(_)));
    let after = info.after(at_call).unwrap();

    // The argument slot and everything reading what it aliases are gone
    assert!(after.get(&stack(0)).is_none());
    assert!(after.get(&stack(1)).is_none());
    assert_eq!(
        after.get(&stack(2)),
        Some(&Value::binary(BinaryOp::Add, Value::var(&l0), Value::int(1)))
    );
}

#[test]
fn test_pure_call_keeps_tracked_values() {
    let l1: Variable = local(1);
    let body = vec![
        Instruction::assign(&stack(0), Value::var(&l1)),
        Instruction::assign(
            &local(2),
            Value::Call(CallValue::new(scramble(), vec![Value::var(&l1)], ShaderType::INT)),
        ),
        Instruction::Return(None),
    ];

    let cfg = IntermediaryCfg::build(&body).unwrap();
    let effects = CallEffectTable::new();
    let info = DataFlowSolver::new(ValueTracking::new(&effects))
        .solve(&cfg)
        .unwrap();

    let at_call = position_of(&cfg, |instr| instr.assigned_variable() == Some(&local(2)));
    assert_eq!(info.after(at_call).unwrap().get(&stack(0)), Some(&Value::var(&l1)));
}
