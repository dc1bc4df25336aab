//! Shared helpers for the integration tests.
//!
//! Provides a reference interpreter for lifted instruction lists and for
//! structured method trees, so a test can check that lowering a method keeps
//! its observable behaviour: the returned value and every buffer write.

#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc};

use shaderlift::{
    compiler::CompilationContext,
    ir::{
        GlobalRef, Instruction, LabelId, Literal, Location, ScalarKind, ShaderType, Value,
        Variable,
    },
    resolve::{ClassDescriptor, MemoryResolver, ResolverChain},
    structure::{Method, Node, StructureId},
};

/// Base class every test shader derives from.
pub const SHADER_BASE: &str = "shaderlift/Shader";

/// Class declaring the test shaders.
pub const SHADER_CLASS: &str = "test/Kernel";

/// A context whose resolver knows [`SHADER_BASE`] and [`SHADER_CLASS`].
pub fn context() -> CompilationContext {
    let resolver = Arc::new(
        MemoryResolver::new(0)
            .with_class(ClassDescriptor::new(SHADER_BASE, None))
            .with_class(ClassDescriptor::new(SHADER_CLASS, Some(SHADER_BASE))),
    );
    CompilationContext::new().with_resolvers(
        ResolverChain::new()
            .with_class_resolver(resolver.clone())
            .with_annotation_resolver(resolver),
    )
}

/// Why an interpretation stopped without returning.
#[derive(Debug, Clone, PartialEq)]
pub enum Trap {
    /// The step budget ran out.
    OutOfSteps,
    /// The program did something the interpreter does not model.
    Unsupported(String),
}

/// Observable result of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// The returned value, if any
    pub returned: Option<Literal>,
    /// Final contents of every written buffer
    pub buffers: HashMap<String, HashMap<i32, Literal>>,
}

/// Interpreter state shared by both execution modes.
#[derive(Debug, Default)]
pub struct Machine {
    variables: HashMap<Variable, Literal>,
    buffers: HashMap<String, HashMap<i32, Literal>>,
    globals: HashMap<String, Literal>,
    steps: usize,
    budget: usize,
}

enum Flow {
    Next,
    Break(StructureId),
    Continue(StructureId),
    Return(Option<Literal>),
}

fn zero(ty: &ShaderType) -> Literal {
    match ty.scalar_kind() {
        Some(ScalarKind::Bool) => Literal::Bool(false),
        Some(ScalarKind::UInt) => Literal::UInt(0),
        Some(ScalarKind::Float) => Literal::Float(0.0),
        _ => Literal::Int(0),
    }
}

impl Machine {
    /// Creates a machine that traps after `budget` executed statements.
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            ..Self::default()
        }
    }

    /// Sets a variable before the run.
    pub fn with_variable(mut self, var: &Variable, value: Literal) -> Self {
        self.variables.insert(var.clone(), value);
        self
    }

    /// Sets a scalar global (a uniform or a built-in) before the run.
    pub fn with_global(mut self, name: &str, value: Literal) -> Self {
        self.globals.insert(name.to_string(), value);
        self
    }

    fn tick(&mut self) -> Result<(), Trap> {
        self.steps += 1;
        if self.steps > self.budget {
            return Err(Trap::OutOfSteps);
        }
        Ok(())
    }

    fn outcome(self, returned: Option<Literal>) -> Outcome {
        Outcome {
            returned,
            buffers: self.buffers,
        }
    }

    fn read_global(&self, global: &GlobalRef) -> Result<Literal, Trap> {
        if let Some(literal) = global.constant_value() {
            return Ok(literal);
        }
        Ok(self
            .globals
            .get(&global.name)
            .copied()
            .unwrap_or_else(|| zero(&global.ty)))
    }

    /// Evaluates a value in the current state.
    pub fn eval(&self, value: &Value) -> Result<Literal, Trap> {
        let unsupported = || Trap::Unsupported(value.to_string());
        match value {
            Value::Variable(var) => Ok(self
                .variables
                .get(var)
                .copied()
                .unwrap_or_else(|| zero(&var.ty))),
            Value::Literal(literal) | Value::Constant { literal, .. } => Ok(*literal),
            Value::Global(global) => self.read_global(global),
            Value::Member { base, member, .. } => match &**base {
                Value::Global(global) => Ok(self
                    .globals
                    .get(&format!("{}.{member}", global.name))
                    .copied()
                    .unwrap_or(Literal::UInt(0))),
                _ => Err(unsupported()),
            },
            Value::ArrayElement { array, index, ty } => match &**array {
                Value::Global(global) => {
                    let index = self.eval(index)?.as_i32().ok_or_else(unsupported)?;
                    Ok(self
                        .buffers
                        .get(&global.name)
                        .and_then(|cells| cells.get(&index))
                        .copied()
                        .unwrap_or_else(|| zero(ty)))
                }
                _ => Err(unsupported()),
            },
            Value::Unary { op, operand, .. } => {
                Literal::apply_unary(*op, self.eval(operand)?).ok_or_else(unsupported)
            }
            Value::Binary { op, lhs, rhs, .. } => {
                Literal::apply_binary(*op, self.eval(lhs)?, self.eval(rhs)?)
                    .ok_or_else(unsupported)
            }
            Value::Compare { op, lhs, rhs } => {
                Literal::apply_compare(*op, self.eval(lhs)?, self.eval(rhs)?)
                    .ok_or_else(unsupported)
            }
            Value::Cast { value: inner, ty } => {
                let kind = ty.scalar_kind().ok_or_else(unsupported)?;
                Ok(self.eval(inner)?.cast(kind))
            }
            Value::Call(_) => Err(unsupported()),
        }
    }

    fn store(&mut self, location: &Location, value: Literal) -> Result<(), Trap> {
        match location {
            Location::Variable(var) => {
                self.variables.insert(var.clone(), value);
            }
            Location::Global(global) => {
                self.globals.insert(global.name.clone(), value);
            }
            Location::ArrayElement {
                array: Value::Global(global),
                index,
            } => {
                let index = self
                    .eval(index)?
                    .as_i32()
                    .ok_or_else(|| Trap::Unsupported(index.to_string()))?;
                self.buffers
                    .entry(global.name.clone())
                    .or_default()
                    .insert(index, value);
            }
            other => return Err(Trap::Unsupported(format!("store to {other:?}"))),
        }
        Ok(())
    }

    fn execute(&mut self, instr: &Instruction) -> Result<(), Trap> {
        match instr {
            Instruction::Assign { location, value } => {
                let value = self.eval(value)?;
                self.store(location, value)
            }
            other => Err(Trap::Unsupported(other.to_string())),
        }
    }

    /// Runs a flat instruction list, following labels and jumps.
    pub fn run_flat(mut self, body: &[Instruction]) -> Result<Outcome, Trap> {
        let labels: HashMap<LabelId, usize> = body
            .iter()
            .enumerate()
            .filter_map(|(i, instr)| match instr {
                Instruction::Label(label) => Some((*label, i)),
                _ => None,
            })
            .collect();
        let target = |label: &LabelId| {
            labels
                .get(label)
                .copied()
                .ok_or_else(|| Trap::Unsupported(format!("missing {label}")))
        };

        let mut pc = 0;
        while let Some(instr) = body.get(pc) {
            self.tick()?;
            pc += 1;
            match instr {
                Instruction::Label(_) => {}
                Instruction::Goto(label) => pc = target(label)?,
                Instruction::JumpIf { condition, target: label } => {
                    if self.eval(condition)?.as_bool() {
                        pc = target(label)?;
                    }
                }
                Instruction::Switch {
                    value,
                    cases,
                    default,
                } => {
                    let selector = self.eval(value)?;
                    let label = cases
                        .iter()
                        .find(|(case, _)| case.as_i32() == selector.as_i32())
                        .map_or(default, |(_, label)| label);
                    pc = target(label)?;
                }
                Instruction::Return(value) => {
                    let returned = value.as_ref().map(|v| self.eval(v)).transpose()?;
                    return Ok(self.outcome(returned));
                }
                other => self.execute(other)?,
            }
        }
        Ok(self.outcome(None))
    }

    /// Runs a structured method tree.
    pub fn run_method(mut self, method: &Method) -> Result<Outcome, Trap> {
        match self.run_list(&method.body)? {
            Flow::Return(returned) => Ok(self.outcome(returned)),
            Flow::Next => Ok(self.outcome(None)),
            Flow::Break(id) | Flow::Continue(id) => {
                Err(Trap::Unsupported(format!("jump to {id} escaped the method")))
            }
        }
    }

    fn run_list(&mut self, nodes: &[Node]) -> Result<Flow, Trap> {
        for node in nodes {
            match self.run_node(node)? {
                Flow::Next => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Next)
    }

    fn run_node(&mut self, node: &Node) -> Result<Flow, Trap> {
        self.tick()?;
        match node {
            Node::Instruction(instr) => {
                self.execute(instr)?;
                Ok(Flow::Next)
            }
            Node::Return(value) => {
                let returned = value.as_ref().map(|v| self.eval(v)).transpose()?;
                Ok(Flow::Return(returned))
            }
            Node::Break(id) => Ok(Flow::Break(*id)),
            Node::Continue(id) => Ok(Flow::Continue(*id)),
            Node::If { condition, then } => {
                if self.eval(condition)?.as_bool() {
                    self.run_list(then)
                } else {
                    Ok(Flow::Next)
                }
            }
            Node::IfElse {
                condition,
                then,
                otherwise,
            } => {
                if self.eval(condition)?.as_bool() {
                    self.run_list(then)
                } else {
                    self.run_list(otherwise)
                }
            }
            Node::Loop { id, body } => loop {
                self.tick()?;
                match self.run_list(body)? {
                    Flow::Next => {}
                    Flow::Continue(target) if target == *id => {}
                    Flow::Break(target) if target == *id => return Ok(Flow::Next),
                    flow => return Ok(flow),
                }
            },
            Node::LabelledBlock { id, body } => match self.run_list(body)? {
                Flow::Break(target) if target == *id => Ok(Flow::Next),
                flow => Ok(flow),
            },
        }
    }
}

/// Random lifted programs: a chain of labelled blocks with arbitrary jumps
/// between them, irreducible shapes included.
///
/// Every block starts by bumping a step counter and leaving once it passes
/// [`COUNTER_LIMIT`], so every generated program terminates. All exits run
/// through one block that stores `l0..l2` to [`results`].
pub mod programs {
    use proptest::prelude::*;
    use shaderlift::ir::{
        BinaryOp, CompareOp, GlobalKind, GlobalRef, Instruction, LabelId, Literal, Location,
        ShaderType, Value, Variable,
    };

    /// Block entries after which a program leaves.
    pub const COUNTER_LIMIT: i32 = 40;

    /// One `l[dst] = l[src] op constant`, lifted through the stack.
    #[derive(Debug, Clone)]
    pub struct Op {
        pub dst: u32,
        pub src: u32,
        pub op: BinaryOp,
        pub constant: i32,
    }

    /// How a block ends. Targets are reduced modulo the block count.
    #[derive(Debug, Clone)]
    pub enum Exit {
        Fall,
        Goto(usize),
        Branch { var: u32, bound: i32, target: usize },
        Switch { var: u32, first: usize, second: usize, default: usize },
        Leave,
    }

    /// A generated block.
    #[derive(Debug, Clone)]
    pub struct BlockShape {
        pub ops: Vec<Op>,
        pub exit: Exit,
    }

    /// The output buffer every program writes.
    pub fn results() -> GlobalRef {
        GlobalRef::new(
            "results",
            ShaderType::runtime_array(ShaderType::INT),
            GlobalKind::Buffer,
        )
    }

    /// Local `l{index}`.
    pub fn local(index: u32) -> Variable {
        Variable::local(index, ShaderType::INT)
    }

    /// Stack slot `s{index}`.
    pub fn stack(index: u32) -> Variable {
        Variable::stack(index, ShaderType::INT)
    }

    fn op() -> impl Strategy<Value = Op> {
        let ops = vec![
            BinaryOp::Add,
            BinaryOp::Sub,
            BinaryOp::Mul,
            BinaryOp::Xor,
            BinaryOp::And,
            BinaryOp::Or,
        ];
        (0..3u32, 0..3u32, prop::sample::select(ops), -8..8i32).prop_map(
            |(dst, src, op, constant)| Op {
                dst,
                src,
                op,
                constant,
            },
        )
    }

    fn exit() -> impl Strategy<Value = Exit> {
        prop_oneof![
            Just(Exit::Fall),
            any::<usize>().prop_map(Exit::Goto),
            (0..3u32, -8..8i32, any::<usize>()).prop_map(|(var, bound, target)| Exit::Branch {
                var,
                bound,
                target
            }),
            (0..3u32, any::<usize>(), any::<usize>(), any::<usize>()).prop_map(
                |(var, first, second, default)| Exit::Switch {
                    var,
                    first,
                    second,
                    default
                }
            ),
            Just(Exit::Leave),
        ]
    }

    /// Strategy for programs of one to `max_blocks` blocks.
    pub fn program(max_blocks: usize) -> impl Strategy<Value = Vec<BlockShape>> {
        let block = (prop::collection::vec(op(), 0..3), exit())
            .prop_map(|(ops, exit)| BlockShape { ops, exit });
        prop::collection::vec(block, 1..=max_blocks)
    }

    /// Lowers generated blocks to a lifted instruction list.
    pub fn build(blocks: &[BlockShape]) -> Vec<Instruction> {
        let count = blocks.len();
        let label = |target: usize| LabelId((target % count) as u32);
        let exit = LabelId(count as u32);
        let counter = local(3);
        let (s0, s1) = (stack(0), stack(1));

        let mut body = Vec::new();
        for (index, block) in blocks.iter().enumerate() {
            body.push(Instruction::Label(LabelId(index as u32)));
            body.push(Instruction::assign(
                &counter,
                Value::binary(BinaryOp::Add, Value::var(&counter), Value::int(1)),
            ));
            body.push(Instruction::JumpIf {
                condition: Value::compare(
                    CompareOp::Gt,
                    Value::var(&counter),
                    Value::int(COUNTER_LIMIT),
                ),
                target: exit,
            });

            for op in &block.ops {
                body.push(Instruction::assign(&s0, Value::var(&local(op.src))));
                body.push(Instruction::assign(&s1, Value::int(op.constant)));
                body.push(Instruction::assign(
                    &s0,
                    Value::binary(op.op, Value::var(&s0), Value::var(&s1)),
                ));
                body.push(Instruction::assign(&local(op.dst), Value::var(&s0)));
            }

            match &block.exit {
                Exit::Fall => {}
                Exit::Goto(target) => body.push(Instruction::Goto(label(*target))),
                Exit::Branch { var, bound, target } => {
                    body.push(Instruction::assign(&s0, Value::var(&local(*var))));
                    body.push(Instruction::assign(&s1, Value::int(*bound)));
                    body.push(Instruction::JumpIf {
                        condition: Value::compare(
                            CompareOp::Lt,
                            Value::var(&s0),
                            Value::var(&s1),
                        ),
                        target: label(*target),
                    });
                }
                Exit::Switch {
                    var,
                    first,
                    second,
                    default,
                } => {
                    body.push(Instruction::assign(&s0, Value::var(&local(*var))));
                    body.push(Instruction::assign(&s1, Value::int(3)));
                    body.push(Instruction::assign(
                        &s0,
                        Value::binary(BinaryOp::And, Value::var(&s0), Value::var(&s1)),
                    ));
                    body.push(Instruction::Switch {
                        value: Value::var(&s0),
                        cases: vec![
                            (Literal::Int(0), label(*first)),
                            (Literal::Int(1), label(*second)),
                        ],
                        default: label(*default),
                    });
                }
                Exit::Leave => body.push(Instruction::Goto(exit)),
            }
        }

        body.push(Instruction::Label(exit));
        for index in 0..3 {
            body.push(Instruction::Assign {
                location: Location::ArrayElement {
                    array: Value::Global(results()),
                    index: Value::int(index),
                },
                value: Value::var(&local(index as u32)),
            });
        }
        body.push(Instruction::Return(None));
        body
    }
}
