//! GLSL source emission.
//!
//! Turns a structured [`Method`] into one compilation unit: the `#version`
//! line, layout headers, declarations of every global, parameter and constant
//! the body uses, helper fragments, and `void main()`.
//!
//! GLSL has no labelled `break`. Labelled blocks become `do { } while (false)`
//! and loops `while (true) { }`; a jump that does not target the innermost of
//! those stores a code in `_jump`, breaks out, and every enclosing construct it
//! crosses re-dispatches on the code after its closing brace.

use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    fmt::{self, Write},
};

use crate::{
    compiler::{
        CompilationContext, CompileOptions, EventKind, HoistedConstant, ShaderMethod, ShaderStage,
    },
    emit::{
        names::NameTable,
        visitor::{walk_nodes, AstVisitor},
        SourceFragment,
    },
    ir::{
        BinaryOp, CompareOp, GlobalKind, GlobalRef, Instruction, Literal, Location, ScalarKind,
        ShaderType, UnaryOp, Value, Variable,
    },
    resolve::Annotation,
    structure::{Method, Node, StructureId},
    Error, Result,
};

const ATOM: u8 = 0;
const UNARY: u8 = 3;
const INDENT: &str = "    ";

/// Facts about the method body the emitter needs beyond the tree itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitFacts {
    /// Variables some path may read before assigning; declared with a zero
    /// initializer
    pub maybe_undefined: HashSet<Variable>,
    /// Parameters the body writes, directly or in place; read through a
    /// writable copy
    pub written_parameters: HashSet<Variable>,
}

/// The emitted source of one shader stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledShader {
    /// Stage the source is written for
    pub stage: ShaderStage,
    /// Name of the compiled host method
    pub entry: String,
    /// The complete compilation unit
    pub source: String,
}

impl fmt::Display for CompiledShader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Writes GLSL for structured methods.
pub struct GlslEmitter<'a> {
    ctx: &'a CompilationContext,
    options: &'a CompileOptions,
}

impl<'a> GlslEmitter<'a> {
    /// Creates an emitter rendering through the collaborators of `ctx`.
    #[must_use]
    pub fn new(ctx: &'a CompilationContext, options: &'a CompileOptions) -> Self {
        Self { ctx, options }
    }

    /// Emits `method`, the structured body of `shader`, as a complete
    /// compilation unit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedConstruct`] if the entry method returns a
    /// value, [`Error::InternalConsistency`] if the tree still contains CFG-only
    /// instructions or a jump to a construct that does not enclose it, and any
    /// error of the rendering collaborators.
    pub fn emit(
        &self,
        shader: &ShaderMethod,
        method: &Method,
        facts: &EmitFacts,
    ) -> Result<CompiledShader> {
        if shader.return_type != ShaderType::Void {
            return Err(Error::UnsupportedConstruct {
                method: shader.name.clone(),
                message: format!("entry method returns {}", shader.return_type),
            });
        }

        let mut names = NameTable::new();
        let mut shadows = Vec::new();
        for parameter in &shader.parameters {
            names.add_parameter(&parameter.variable, &parameter.name);
        }
        for parameter in &shader.parameters {
            if facts.written_parameters.contains(&parameter.variable) {
                shadows.push((
                    parameter.variable.clone(),
                    names.add_shadow(&parameter.variable),
                ));
            }
        }
        let locals = body_variables(method, shader);
        for var in &locals {
            names.add_variable(var);
        }

        let mut writer = BodyWriter {
            ctx: self.ctx,
            options: self.options,
            method: &shader.name,
            names: &names,
            out: String::new(),
            depth: 1,
            constructs: Vec::new(),
            uses_jump: false,
            constants: BTreeMap::new(),
            globals: Vec::new(),
            fragments: Vec::new(),
        };
        walk_nodes(&mut writer, &method.body)?;

        let mut source = String::new();
        writeln!(source, "#version {}", self.options.glsl_version)?;
        if shader.stage == ShaderStage::Compute {
            let (x, y, z) = self.local_size(shader);
            writeln!(
                source,
                "layout(local_size_x = {x}, local_size_y = {y}, local_size_z = {z}) in;"
            )?;
        }

        let mut header = String::new();
        for constant in writer.constants.values() {
            writeln!(
                header,
                "const {} = {};",
                self.declare(&constant.ty, &constant.name)?,
                self.ctx.types.literal(&constant.literal)
            )?;
            self.ctx
                .events
                .record(EventKind::ConstantHoisted)
                .method(&shader.name)
                .message(format!("{} = {}", constant.name, constant.literal));
        }
        for global in &writer.globals {
            self.declare_global(&mut header, shader, global)?;
        }
        for (index, parameter) in shader.parameters.iter().enumerate() {
            let signature = shader.signature();
            let binding = binding_of(&self.ctx.resolvers.parameter_annotations(&signature, index));
            let decl = self.declare(&parameter.variable.ty, &names.name(&parameter.variable))?;
            match binding {
                Some(location) => writeln!(header, "layout(location = {location}) uniform {decl};")?,
                None => writeln!(header, "uniform {decl};")?,
            }
        }
        if !header.is_empty() {
            source.push('\n');
            source.push_str(&header);
        }
        for fragment in &writer.fragments {
            source.push('\n');
            source.push_str(fragment.source.trim_end());
            source.push('\n');
        }

        source.push_str("\nvoid main() {\n");
        for (var, shadow) in &shadows {
            writeln!(
                source,
                "{INDENT}{} = {};",
                self.declare(&var.ty, shadow)?,
                names.name(var)
            )?;
            self.ctx
                .events
                .record(EventKind::ParameterShadowed)
                .method(&shader.name)
                .message(format!("{} copied to {shadow}", names.name(var)));
        }
        if writer.uses_jump {
            writeln!(source, "{INDENT}int _jump = 0;")?;
        }
        for var in &locals {
            let decl = self.declare(&var.ty, &names.name(var))?;
            match self.ctx.types.zero_value(&var.ty) {
                Some(zero) if facts.maybe_undefined.contains(var) => {
                    writeln!(source, "{INDENT}{decl} = {zero};")?;
                }
                _ => writeln!(source, "{INDENT}{decl};")?,
            }
        }
        source.push_str(&writer.out);
        source.push_str("}\n");

        Ok(CompiledShader {
            stage: shader.stage,
            entry: shader.name.clone(),
            source,
        })
    }

    fn local_size(&self, shader: &ShaderMethod) -> (u32, u32, u32) {
        self.ctx
            .resolvers
            .method_annotations(&shader.signature())
            .iter()
            .find_map(|annotation| match annotation {
                Annotation::LocalSize { x, y, z } => Some((*x, *y, *z)),
                _ => None,
            })
            .unwrap_or((1, 1, 1))
    }

    fn declare_global(
        &self,
        out: &mut String,
        shader: &ShaderMethod,
        global: &GlobalRef,
    ) -> Result<()> {
        let binding = binding_of(
            &self
                .ctx
                .resolvers
                .field_annotations(&shader.class, &global.name),
        );
        let decl = self.declare(&global.ty, &global.name)?;
        let location = |qualifier: &str| match binding {
            Some(b) => format!("layout(location = {b}) {qualifier} {decl};"),
            None => format!("{qualifier} {decl};"),
        };
        match &global.kind {
            GlobalKind::Builtin | GlobalKind::Constant(_) => {}
            GlobalKind::Buffer => {
                let layout = match binding {
                    Some(b) => format!("std430, binding = {b}"),
                    None => "std430".to_string(),
                };
                writeln!(
                    out,
                    "layout({layout}) buffer {}_block {{\n{INDENT}{decl};\n}};",
                    global.name
                )?;
            }
            GlobalKind::Shared => writeln!(out, "shared {decl};")?,
            GlobalKind::Uniform => writeln!(out, "{}", location("uniform"))?,
            GlobalKind::Input => writeln!(out, "{}", location("in"))?,
            GlobalKind::Output => writeln!(out, "{}", location("out"))?,
        }
        Ok(())
    }

    /// Returns `type name` with array dimensions after the name.
    fn declare(&self, ty: &ShaderType, name: &str) -> Result<String> {
        let mut dims = String::new();
        let mut base = ty;
        while let ShaderType::Array { element, length } = base {
            match length {
                Some(len) => write!(dims, "[{len}]")?,
                None => dims.push_str("[]"),
            }
            base = element;
        }
        Ok(format!("{} {name}{dims}", self.ctx.types.type_name(base)?))
    }
}

fn binding_of(annotations: &[Annotation]) -> Option<u32> {
    annotations.iter().find_map(|annotation| match annotation {
        Annotation::Binding(index) => Some(*index),
        _ => None,
    })
}

/// Variables the body reads or writes, parameters excluded, in a stable order.
fn body_variables(method: &Method, shader: &ShaderMethod) -> Vec<Variable> {
    let parameters: HashSet<&Variable> = shader.parameters.iter().map(|p| &p.variable).collect();
    let mut seen = HashSet::new();
    let mut add = |var: &Variable| {
        if !parameters.contains(var) {
            seen.insert(var.clone());
        }
    };
    method.walk(|node| match node {
        Node::Instruction(instruction) => {
            instruction.for_each_read(&mut add);
            if let Some(var) = instruction.assigned_variable() {
                add(var);
            }
        }
        Node::Return(Some(value))
        | Node::If {
            condition: value, ..
        }
        | Node::IfElse {
            condition: value, ..
        } => value.for_each_variable(&mut add),
        _ => {}
    });
    let mut vars: Vec<Variable> = seen.into_iter().collect();
    vars.sort_by_key(|var| (var.kind, var.index, var.ty.to_string()));
    vars
}

const fn break_code(id: StructureId) -> u32 {
    2 * (id.0 + 1)
}

const fn continue_code(id: StructureId) -> u32 {
    2 * (id.0 + 1) + 1
}

struct Construct {
    id: StructureId,
    is_loop: bool,
    /// Jump codes of non-local jumps leaving this construct
    escaping: BTreeSet<u32>,
}

struct Expr {
    text: String,
    prec: u8,
}

impl Expr {
    fn atom(text: String) -> Self {
        Self { text, prec: ATOM }
    }

    /// Returns the text, parenthesized if it binds looser than `max`.
    fn wrap(self, max: u8) -> String {
        if self.prec > max {
            format!("({})", self.text)
        } else {
            self.text
        }
    }
}

struct BodyWriter<'a> {
    ctx: &'a CompilationContext,
    options: &'a CompileOptions,
    method: &'a str,
    names: &'a NameTable,
    out: String,
    depth: usize,
    constructs: Vec<Construct>,
    uses_jump: bool,
    constants: BTreeMap<String, HoistedConstant>,
    globals: Vec<GlobalRef>,
    fragments: Vec<SourceFragment>,
}

impl BodyWriter<'_> {
    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn use_fragment(&mut self, fragment: SourceFragment) -> Result<()> {
        self.ctx.register_fragment(&fragment)?;
        if !self.fragments.iter().any(|f| f.id == fragment.id) {
            self.fragments.push(fragment);
        }
        Ok(())
    }

    fn use_global(&mut self, global: &GlobalRef) {
        if !matches!(global.kind, GlobalKind::Builtin | GlobalKind::Constant(_))
            && !self.globals.contains(global)
        {
            self.globals.push(global.clone());
        }
    }

    fn constant(&mut self, global: &GlobalRef) -> Result<Expr> {
        let Some(literal) = global.constant_value() else {
            return Err(consistency_error!("{} is not a constant", global.name));
        };
        if !self.options.hoist_constants {
            return Ok(self.literal(literal));
        }
        let hoisted = self.ctx.hoist_constant(global)?;
        let name = hoisted.name.clone();
        self.constants.insert(name.clone(), hoisted);
        Ok(Expr::atom(name))
    }

    fn literal(&self, literal: Literal) -> Expr {
        let text = self.ctx.types.literal(&literal);
        let prec = if text.starts_with('-') { UNARY } else { ATOM };
        Expr { text, prec }
    }

    fn expr(&mut self, value: &Value) -> Result<Expr> {
        Ok(match value {
            Value::Variable(var) => Expr::atom(self.names.body_name(var)),
            Value::Literal(literal) => self.literal(*literal),
            Value::Constant { literal, original } => match &**original {
                Value::Global(global) if global.constant_value().is_some() => {
                    self.constant(global)?
                }
                _ => self.literal(*literal),
            },
            Value::Global(global) if global.constant_value().is_some() => self.constant(global)?,
            Value::Global(global) => {
                self.use_global(global);
                Expr::atom(global.name.clone())
            }
            Value::Member { base, member, .. } => {
                let base = self.expr(base)?.wrap(ATOM);
                Expr::atom(format!("{base}.{member}"))
            }
            Value::ArrayElement { array, index, .. } => {
                let array = self.expr(array)?.wrap(ATOM);
                let index = self.expr(index)?.text;
                Expr::atom(format!("{array}[{index}]"))
            }
            Value::Unary { op, operand, .. } => {
                let operand = self.expr(operand)?.wrap(ATOM);
                let op = match op {
                    UnaryOp::Neg => "-",
                    UnaryOp::Not => "!",
                    UnaryOp::BitNot => "~",
                };
                Expr {
                    text: format!("{op}{operand}"),
                    prec: UNARY,
                }
            }
            Value::Binary { op, lhs, rhs, ty } => self.binary(*op, lhs, rhs, ty)?,
            Value::Compare { op, lhs, rhs } => {
                let prec = match op {
                    CompareOp::Eq | CompareOp::Ne => 8,
                    _ => 7,
                };
                let lhs = self.expr(lhs)?.wrap(prec);
                let rhs = self.expr(rhs)?.wrap(prec - 1);
                Expr {
                    text: format!("{lhs} {op} {rhs}"),
                    prec,
                }
            }
            Value::Cast { value, ty } => {
                let inner = self.expr(value)?.text;
                Expr::atom(format!("{}({inner})", self.ctx.types.type_name(ty)?))
            }
            Value::Call(call) => {
                let mut args = Vec::with_capacity(call.args.len());
                for arg in &call.args {
                    args.push(self.expr(arg)?.text);
                }
                let rendered = self.ctx.calls.render_call(call, &args)?;
                for fragment in rendered.fragments {
                    self.use_fragment(fragment)?;
                }
                let prec = if is_atomic_text(&rendered.text) { ATOM } else { 15 };
                Expr {
                    text: rendered.text,
                    prec,
                }
            }
        })
    }

    fn binary(&mut self, op: BinaryOp, lhs: &Value, rhs: &Value, ty: &ShaderType) -> Result<Expr> {
        let kind = ty.scalar_kind();
        let boolean = kind == Some(ScalarKind::Bool);

        if op == BinaryOp::UShr && kind == Some(ScalarKind::Int) {
            let unsigned = match ty {
                ShaderType::Vector { size, .. } => ShaderType::vector(ScalarKind::UInt, *size),
                _ => ShaderType::UINT,
            };
            let signed = self.ctx.types.type_name(ty)?;
            let unsigned = self.ctx.types.type_name(&unsigned)?;
            let lhs = self.expr(lhs)?.text;
            let rhs = self.expr(rhs)?.wrap(5);
            return Ok(Expr::atom(format!("{signed}({unsigned}({lhs}) >> {rhs})")));
        }
        if op == BinaryOp::Rem && kind == Some(ScalarKind::Float) {
            self.use_fragment(SourceFragment::new("_fmod", FMOD_SOURCE))?;
            let lhs = self.expr(lhs)?.text;
            let rhs = self.expr(rhs)?.text;
            return Ok(Expr::atom(format!("_fmod({lhs}, {rhs})")));
        }

        let (symbol, prec) = match op {
            BinaryOp::And if boolean => ("&&", 12),
            BinaryOp::Xor if boolean => ("^^", 13),
            BinaryOp::Or if boolean => ("||", 14),
            _ if boolean => {
                return Err(Error::TypeMismatch(format!(
                    "operator {op} on bool in {}",
                    self.method
                )))
            }
            BinaryOp::Mul => ("*", 4),
            BinaryOp::Div => ("/", 4),
            BinaryOp::Rem => ("%", 4),
            BinaryOp::Add => ("+", 5),
            BinaryOp::Sub => ("-", 5),
            BinaryOp::Shl => ("<<", 6),
            BinaryOp::Shr | BinaryOp::UShr => (">>", 6),
            BinaryOp::And => ("&", 9),
            BinaryOp::Xor => ("^", 10),
            BinaryOp::Or => ("|", 11),
        };
        let lhs = self.expr(lhs)?.wrap(prec);
        let rhs = self.expr(rhs)?.wrap(prec - 1);
        Ok(Expr {
            text: format!("{lhs} {symbol} {rhs}"),
            prec,
        })
    }

    fn location(&mut self, location: &Location) -> Result<String> {
        Ok(match location {
            Location::Variable(var) => self.names.body_name(var),
            Location::Global(global) => {
                self.use_global(global);
                global.name.clone()
            }
            Location::ArrayElement { array, index } => {
                let array = self.expr(array)?.wrap(ATOM);
                let index = self.expr(index)?.text;
                format!("{array}[{index}]")
            }
            Location::Member { base, member, .. } => {
                let base = self.expr(base)?.wrap(ATOM);
                format!("{base}.{member}")
            }
        })
    }

    /// Emits a jump to `target`, routed through `_jump` unless `target` is
    /// the innermost construct.
    fn jump(&mut self, target: StructureId, is_continue: bool) -> Result<()> {
        let direct = self
            .constructs
            .last()
            .is_some_and(|c| c.id == target && (!is_continue || c.is_loop));
        let keyword = if is_continue { "continue;" } else { "break;" };
        if direct {
            self.line(keyword);
            return Ok(());
        }

        let Some(position) = self.constructs.iter().rposition(|c| c.id == target) else {
            return Err(consistency_error!(
                "jump to {} outside its construct in {}",
                target,
                self.method
            ));
        };
        let code = if is_continue {
            continue_code(target)
        } else {
            break_code(target)
        };
        for construct in &mut self.constructs[position + 1..] {
            construct.escaping.insert(code);
        }
        self.uses_jump = true;
        self.line(&format!("_jump = {code};"));
        self.line("break;");
        Ok(())
    }

    /// Closes a construct and dispatches the jumps that left it.
    fn close(&mut self, id: StructureId, closing: &str) -> Result<()> {
        let Some(construct) = self.constructs.pop() else {
            return Err(consistency_error!("unbalanced construct {}", id));
        };
        self.depth -= 1;
        self.line(closing);
        if construct.escaping.is_empty() {
            return Ok(());
        }
        let Some(parent) = self.constructs.last() else {
            return Err(consistency_error!("jump escapes the body of {}", self.method));
        };
        let (parent_break, parent_continue) = (break_code(parent.id), continue_code(parent.id));
        let parent_is_loop = parent.is_loop;
        let mut propagate = false;
        for code in construct.escaping {
            let keyword = if code == parent_break {
                "break;"
            } else if code == parent_continue && parent_is_loop {
                "continue;"
            } else {
                propagate = true;
                continue;
            };
            self.line(&format!("if (_jump == {code}) {{"));
            self.depth += 1;
            self.line("_jump = 0;");
            self.line(keyword);
            self.depth -= 1;
            self.line("}");
        }
        if propagate {
            self.line("if (_jump != 0) {");
            self.depth += 1;
            self.line("break;");
            self.depth -= 1;
            self.line("}");
        }
        Ok(())
    }
}

impl AstVisitor for BodyWriter<'_> {
    fn visit_instruction(&mut self, instruction: &Instruction) -> Result<()> {
        let text = match instruction {
            Instruction::Assign { location, value } => {
                let target = self.location(location)?;
                let value = self.expr(value)?.text;
                format!("{target} = {value};")
            }
            Instruction::Call(call) => {
                let value = self.expr(&Value::Call(call.clone()))?.text;
                format!("{value};")
            }
            Instruction::Return(value) => return self.visit_return(value.as_ref()),
            other => {
                return Err(consistency_error!(
                    "{} survived structuring in {}",
                    other,
                    self.method
                ))
            }
        };
        self.line(&text);
        Ok(())
    }

    fn visit_return(&mut self, value: Option<&Value>) -> Result<()> {
        let text = match value {
            Some(value) => format!("return {};", self.expr(value)?.text),
            None => "return;".to_string(),
        };
        self.line(&text);
        Ok(())
    }

    fn visit_break(&mut self, target: StructureId) -> Result<()> {
        self.jump(target, false)
    }

    fn visit_continue(&mut self, target: StructureId) -> Result<()> {
        self.jump(target, true)
    }

    fn enter_if(&mut self, condition: &Value) -> Result<()> {
        let condition = self.expr(condition)?.text;
        self.line(&format!("if ({condition}) {{"));
        self.depth += 1;
        Ok(())
    }

    fn enter_else(&mut self) -> Result<()> {
        self.depth -= 1;
        self.line("} else {");
        self.depth += 1;
        Ok(())
    }

    fn exit_if(&mut self) -> Result<()> {
        self.depth -= 1;
        self.line("}");
        Ok(())
    }

    fn enter_loop(&mut self, id: StructureId) -> Result<()> {
        self.line("while (true) {");
        self.depth += 1;
        self.constructs.push(Construct {
            id,
            is_loop: true,
            escaping: BTreeSet::new(),
        });
        Ok(())
    }

    fn exit_loop(&mut self, id: StructureId) -> Result<()> {
        self.close(id, "}")
    }

    fn enter_block(&mut self, id: StructureId) -> Result<()> {
        self.line("do {");
        self.depth += 1;
        self.constructs.push(Construct {
            id,
            is_loop: false,
            escaping: BTreeSet::new(),
        });
        Ok(())
    }

    fn exit_block(&mut self, id: StructureId) -> Result<()> {
        self.close(id, "} while (false);")
    }
}

/// Returns `true` for a plain identifier or a single call `name(...)`.
fn is_atomic_text(text: &str) -> bool {
    let ident_len = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
        .unwrap_or(text.len());
    if ident_len == text.len() {
        return ident_len > 0;
    }
    if ident_len == 0 || !text[ident_len..].starts_with('(') || !text.ends_with(')') {
        return false;
    }
    let mut depth = 0usize;
    for (i, c) in text.char_indices().skip(ident_len) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 && i != text.len() - 1 {
                    return false;
                }
            }
            _ => {}
        }
    }
    true
}

const FMOD_SOURCE: &str = "\
float _fmod(float a, float b) { return a - b * trunc(a / b); }
vec2 _fmod(vec2 a, vec2 b) { return a - b * trunc(a / b); }
vec3 _fmod(vec3 a, vec3 b) { return a - b * trunc(a / b); }
vec4 _fmod(vec4 a, vec4 b) { return a - b * trunc(a / b); }";
