//! Control flow structuring integration tests.
//!
//! These tests drive the structurer through the public compiler API:
//! 1. Generate or write a lifted body with arbitrary jumps
//! 2. Lower it with [`Compiler::lower`]
//! 3. Check the tree is free of jumps and labels
//! 4. Run the flat body and the tree through the reference interpreter and
//!    compare buffer contents

mod common;

use common::{
    programs::{self, local, results},
    Machine, SHADER_CLASS,
};
use proptest::prelude::*;
use shaderlift::{
    compiler::{CompileOptions, Compiler, EventKind, Parameter, ShaderMethod, ShaderStage},
    ir::{BinaryOp, CompareOp, Instruction, LabelId, Literal, Location, Value},
    structure::Node,
    Error,
};

const BUDGET: usize = 100_000;

fn compiler(options: CompileOptions) -> Compiler {
    Compiler::with_context(options, common::context())
}

fn method(body: Vec<Instruction>) -> ShaderMethod {
    ShaderMethod::new(SHADER_CLASS, "run", ShaderStage::Compute).with_body(body)
}

fn has_control(nodes: &[Node]) -> bool {
    let mut found = false;
    for node in nodes {
        node.walk(&mut |n| {
            if let Node::Instruction(instr) = n {
                found |= instr.is_control() || instr.is_cfg_only();
            }
        });
    }
    found
}

/// Asserts that lowering `body` keeps the buffer writes of the flat program.
fn check_equivalent(body: &[Instruction], options: CompileOptions) -> Result<(), TestCaseError> {
    let compiler = compiler(options);
    let lowered = match compiler.lower(&method(body.to_vec())) {
        Ok(lowered) => lowered,
        Err(Error::UnsupportedConstruct { .. }) => {
            return Err(TestCaseError::reject("split budget exceeded"));
        }
        Err(e) => return Err(TestCaseError::fail(format!("lowering failed: {e}"))),
    };
    let tree = &lowered.structured.method;
    prop_assert!(!has_control(&tree.body), "{tree}");

    let expected = Machine::new(BUDGET).run_flat(body);
    let actual = Machine::new(BUDGET).run_method(tree);
    prop_assert_eq!(&expected, &actual, "{}", tree);
    prop_assert!(expected.is_ok());
    Ok(())
}

/// Programs over the split budget are rejected rather than passed; more than
/// a handful of them fails the run.
fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 256,
        max_global_rejects: 32,
        ..ProptestConfig::default()
    }
}

proptest! {
    #![proptest_config(config())]

    #[test]
    fn random_programs_keep_semantics_unoptimized(blocks in programs::program(7)) {
        check_equivalent(&programs::build(&blocks), CompileOptions::minimal())?;
    }

    #[test]
    fn random_programs_keep_semantics_optimized(blocks in programs::program(7)) {
        check_equivalent(&programs::build(&blocks), CompileOptions::default())?;
    }

    #[test]
    fn random_programs_emit(blocks in programs::program(6)) {
        let compiler = compiler(CompileOptions::default());
        match compiler.compile(&method(programs::build(&blocks))) {
            Ok(shader) => {
                prop_assert_eq!(shader.source.matches("void main()").count(), 1);
                prop_assert!(!shader.source.contains("goto"));
            }
            Err(Error::UnsupportedConstruct { .. }) => {
                return Err(TestCaseError::reject("split budget exceeded"));
            }
            Err(e) => return Err(TestCaseError::fail(format!("compile failed: {e}"))),
        }
    }
}

/// `if (mode < 0) goto b; a: l1 += 1; if (l1 < 5) goto b; leave; b: l1 += 2; if (l1 < 9) goto a; leave`
fn two_entry_loop() -> Vec<Instruction> {
    let mode = local(0);
    let acc = local(1);
    let bump = |by: i32| {
        Instruction::assign(
            &acc,
            Value::binary(BinaryOp::Add, Value::var(&acc), Value::int(by)),
        )
    };
    let below = |bound: i32, target: u32| Instruction::JumpIf {
        condition: Value::compare(CompareOp::Lt, Value::var(&acc), Value::int(bound)),
        target: LabelId(target),
    };
    vec![
        Instruction::JumpIf {
            condition: Value::compare(CompareOp::Lt, Value::var(&mode), Value::int(0)),
            target: LabelId(1),
        },
        Instruction::Label(LabelId(0)),
        bump(1),
        below(5, 1),
        Instruction::Goto(LabelId(2)),
        Instruction::Label(LabelId(1)),
        bump(2),
        below(9, 0),
        Instruction::Label(LabelId(2)),
        Instruction::Assign {
            location: Location::ArrayElement {
                array: Value::Global(results()),
                index: Value::int(0),
            },
            value: Value::var(&acc),
        },
        Instruction::Return(None),
    ]
}

#[test]
fn test_irreducible_loop_is_split() {
    let body = two_entry_loop();
    let compiler = compiler(CompileOptions::default());
    let shader_method = method(body.clone()).with_parameters(vec![Parameter::new("mode", local(0))]);

    let lowered = compiler.lower(&shader_method).unwrap();
    assert!(lowered.structured.stats.node_splits > 0);
    assert!(lowered.structured.stats.loops > 0);
    assert!(compiler.context().events.has(EventKind::NodeSplit));

    for mode in [-3, 0, 7] {
        let flat = Machine::new(BUDGET)
            .with_variable(&local(0), Literal::Int(mode))
            .run_flat(&body)
            .unwrap();
        let tree = Machine::new(BUDGET)
            .with_variable(&local(0), Literal::Int(mode))
            .run_method(&lowered.structured.method)
            .unwrap();
        assert_eq!(flat, tree, "mode {mode}");
    }

    let shader = compiler.compile(&shader_method).unwrap();
    assert!(shader.source.contains("uniform int mode;"), "{}", shader.source);
    assert!(shader.source.contains("while (true)"), "{}", shader.source);
}

#[test]
fn test_split_budget_exceeded() {
    let compiler = compiler(CompileOptions::default().with_max_node_splits(0));
    let result = compiler.lower(&method(two_entry_loop()));
    assert!(matches!(result, Err(Error::UnsupportedConstruct { .. })));
}

#[test]
fn test_dangling_label_rejected() {
    let compiler = compiler(CompileOptions::default());
    let result = compiler.lower(&method(vec![
        Instruction::Goto(LabelId(9)),
        Instruction::Return(None),
    ]));
    assert!(matches!(result, Err(Error::DanglingLabel(LabelId(9)))));
}
