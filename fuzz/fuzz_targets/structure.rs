#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use shaderlift::{
    compiler::{CompilationContext, CompileOptions, Compiler, ShaderMethod, ShaderStage},
    ir::{BinaryOp, CompareOp, Instruction, LabelId, Literal, ShaderType, Value, Variable},
    resolve::{ClassDescriptor, MemoryResolver, ResolverChain},
};

const LABELS: u8 = 8;

fn local(index: u8) -> Variable {
    Variable::local(u32::from(index % 4), ShaderType::INT)
}

fn decode(data: &[u8]) -> Vec<Instruction> {
    let mut body: Vec<Instruction> = data
        .chunks_exact(3)
        .map(|chunk| {
            let (op, a, b) = (chunk[0], chunk[1], chunk[2]);
            let label = LabelId(u32::from(a % LABELS));
            match op % 6 {
                0 => Instruction::Label(label),
                1 => Instruction::Goto(label),
                2 => Instruction::JumpIf {
                    condition: Value::compare(
                        CompareOp::Lt,
                        Value::var(&local(b)),
                        Value::int(i32::from(b >> 2)),
                    ),
                    target: label,
                },
                3 => Instruction::Switch {
                    value: Value::var(&local(b)),
                    cases: vec![
                        (Literal::Int(0), label),
                        (Literal::Int(1), LabelId(u32::from(b % LABELS))),
                    ],
                    default: LabelId(u32::from(a.wrapping_add(1) % LABELS)),
                },
                4 => Instruction::Return(None),
                _ => Instruction::assign(
                    &local(a),
                    Value::binary(BinaryOp::Add, Value::var(&local(b)), Value::int(i32::from(b))),
                ),
            }
        })
        .collect();
    body.push(Instruction::Return(None));
    body
}

fuzz_target!(|data: &[u8]| {
    let classes = MemoryResolver::new(0)
        .with_class(ClassDescriptor::new("shaderlift/Shader", None))
        .with_class(ClassDescriptor::new("fuzz/Kernel", Some("shaderlift/Shader")));
    let context = CompilationContext::new()
        .with_resolvers(ResolverChain::new().with_class_resolver(Arc::new(classes)));
    let compiler = Compiler::with_context(CompileOptions::default(), context);

    let method =
        ShaderMethod::new("fuzz/Kernel", "run", ShaderStage::Compute).with_body(decode(data));
    let _ = compiler.compile(&method);
});
