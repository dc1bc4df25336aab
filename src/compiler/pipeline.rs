//! The compile pipeline of one shader method.
//!
//! ```text
//! Vec<Instruction> ──build──► IntermediaryCfg ──passes──► IntermediaryCfg
//!        ──analyze_all──► EmitFacts
//!        ──Structurer──► Method ──GlslEmitter──► CompiledShader
//! ```
//!
//! Every stage is a pure function of its input and the shared
//! [`CompilationContext`]; the only shared mutable state is the context's
//! append-only registries and event log. Methods of one program can therefore
//! be compiled in parallel with [`Compiler::compile_all`].

use std::{collections::HashSet, sync::Arc};

use rayon::prelude::*;

use crate::{
    analysis::{
        mutated_variables, AnalysisInfo, DataFlowSolver, DefinedValue, DefinedVariables,
        IntermediaryCfg, LiveVarValue, LiveVariables, MutabilityAnalysis, MutabilityValue,
        PossibleValues, PossibleValuesValue, UseTable, ValueTrackValue, ValueTracking,
        VariableTable,
    },
    compiler::{
        pass::{MethodBody, ShaderPass},
        passes::{ConstantFoldingPass, DeadAssignmentPass, InlineValuesPass},
        CompilationContext, CompileOptions, EventKind, ShaderStage,
    },
    emit::{CompiledShader, EmitFacts, GlslEmitter},
    ir::{CallSignature, Instruction, ShaderType, Variable},
    resolve::CallEffects,
    structure::{Structured, Structurer},
    Error, Result,
};

/// A named method parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Source name, used for the emitted uniform
    pub name: String,
    /// The LOCAL variable holding the parameter in the body
    pub variable: Variable,
}

impl Parameter {
    /// Creates a parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, variable: Variable) -> Self {
        Self {
            name: name.into(),
            variable,
        }
    }
}

/// A lifted host method to be compiled into one shader stage.
#[derive(Debug, Clone)]
pub struct ShaderMethod {
    /// Binary name of the declaring class
    pub class: String,
    /// Method name
    pub name: String,
    /// Method descriptor
    pub descriptor: String,
    /// Target stage
    pub stage: ShaderStage,
    /// Parameters, in declaration order
    pub parameters: Vec<Parameter>,
    /// Return type; entry methods return `void`
    pub return_type: ShaderType,
    /// Lifted body with labels placed
    pub body: Vec<Instruction>,
}

impl ShaderMethod {
    /// Creates an empty `void` method without parameters.
    #[must_use]
    pub fn new(class: impl Into<String>, name: impl Into<String>, stage: ShaderStage) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
            descriptor: "()V".to_string(),
            stage,
            parameters: Vec::new(),
            return_type: ShaderType::Void,
            body: Vec::new(),
        }
    }

    /// Sets the method descriptor.
    #[must_use]
    pub fn with_descriptor(mut self, descriptor: impl Into<String>) -> Self {
        self.descriptor = descriptor.into();
        self
    }

    /// Sets the parameters.
    #[must_use]
    pub fn with_parameters(mut self, parameters: Vec<Parameter>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Sets the return type.
    #[must_use]
    pub fn with_return_type(mut self, return_type: ShaderType) -> Self {
        self.return_type = return_type;
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: Vec<Instruction>) -> Self {
        self.body = body;
        self
    }

    /// Returns the signature annotations of this method are keyed by.
    #[must_use]
    pub fn signature(&self) -> CallSignature {
        CallSignature::new(&self.class, &self.name, &self.descriptor)
    }

    /// Returns the parameter variables.
    #[must_use]
    pub fn parameter_variables(&self) -> Vec<Variable> {
        self.parameters.iter().map(|p| p.variable.clone()).collect()
    }
}

/// The converged results of all five analyses over one graph.
#[derive(Debug)]
pub struct MethodAnalyses {
    /// Definitely assigned variables
    pub defined: AnalysisInfo<DefinedValue>,
    /// Live variables
    pub live: AnalysisInfo<LiveVarValue>,
    /// Tracked STACK values
    pub values: AnalysisInfo<ValueTrackValue>,
    /// Mutability classes
    pub mutability: AnalysisInfo<MutabilityValue>,
    /// Candidate definitions
    pub possible: AnalysisInfo<PossibleValuesValue>,
    /// Reads of each definition
    pub uses: UseTable,
}

impl MethodAnalyses {
    /// Derives the facts the emitter needs for declarations.
    #[must_use]
    pub fn emit_facts(&self, cfg: &IntermediaryCfg, parameters: &[Variable]) -> EmitFacts {
        let params: HashSet<&Variable> = parameters.iter().collect();

        let mut maybe_undefined = HashSet::new();
        let mut assigned = HashSet::new();
        for (pos, instr) in cfg.instructions() {
            if let Some(defined) = self.defined.before(pos) {
                instr.for_each_read(&mut |var| {
                    if !params.contains(var) && !defined.is_defined(var) {
                        maybe_undefined.insert(var.clone());
                    }
                });
            }
            if let Some(var) = instr.assigned_variable() {
                assigned.insert(var.clone());
            }
        }

        let mutated = mutated_variables(&self.mutability);
        let written_parameters = parameters
            .iter()
            .filter(|p| assigned.contains(*p) || mutated.contains(*p))
            .cloned()
            .collect();

        EmitFacts {
            maybe_undefined,
            written_parameters,
        }
    }

    /// Returns the solver iterations of each analysis, by analysis name.
    #[must_use]
    pub fn iterations(&self) -> [(&'static str, usize); 5] {
        [
            ("defined-variables", self.defined.iterations()),
            ("live-variables", self.live.iterations()),
            ("value-tracking", self.values.iterations()),
            ("mutability", self.mutability.iterations()),
            ("possible-values", self.possible.iterations()),
        ]
    }
}

/// Runs the five analyses over `cfg` in parallel.
///
/// The analyses share nothing but the frozen graph and the variable table, so
/// they are solved on the rayon pool.
///
/// # Errors
///
/// Returns [`Error::NoFixedPoint`] if an analysis does not converge within
/// `blocks × max_lattice_height` iterations.
pub fn analyze_all(
    cfg: &IntermediaryCfg,
    parameters: &[Variable],
    effects: &dyn CallEffects,
    max_lattice_height: usize,
) -> Result<MethodAnalyses> {
    let table = VariableTable::from_cfg(cfg, parameters);

    let ((defined, live), (values, (mutability, possible))) = rayon::join(
        || {
            rayon::join(
                || {
                    DataFlowSolver::new(DefinedVariables::new(Arc::clone(&table), parameters))
                        .with_max_lattice_height(max_lattice_height)
                        .solve(cfg)
                },
                || {
                    DataFlowSolver::new(LiveVariables::new(Arc::clone(&table)))
                        .with_max_lattice_height(max_lattice_height)
                        .solve(cfg)
                },
            )
        },
        || {
            rayon::join(
                || {
                    DataFlowSolver::new(ValueTracking::new(effects))
                        .with_max_lattice_height(max_lattice_height)
                        .solve(cfg)
                },
                || {
                    rayon::join(
                        || {
                            DataFlowSolver::new(MutabilityAnalysis::new(effects))
                                .with_max_lattice_height(max_lattice_height)
                                .solve(cfg)
                        },
                        || {
                            let mut solver =
                                DataFlowSolver::new(PossibleValues::new(Arc::clone(&table), effects))
                                    .with_max_lattice_height(max_lattice_height);
                            let info = solver.solve(cfg)?;
                            Ok::<_, Error>((info, solver.into_analysis().into_uses()))
                        },
                    )
                },
            )
        },
    );

    let (possible, uses) = possible?;
    Ok(MethodAnalyses {
        defined: defined?,
        live: live?,
        values: values?,
        mutability: mutability?,
        possible,
        uses,
    })
}

/// A method taken through every stage but emission.
#[derive(Debug)]
pub struct LoweredMethod {
    /// The optimised graph
    pub body: MethodBody,
    /// Declaration facts for the emitter
    pub facts: EmitFacts,
    /// The structured tree
    pub structured: Structured,
}

/// Compiles lifted shader methods into GLSL.
///
/// A compiler owns its [`CompileOptions`] and shares one
/// [`CompilationContext`] across every method it compiles, so hoisted constant
/// names and helper fragments are consistent across the stages of a program.
///
/// # Examples
///
/// ```rust,ignore
/// use shaderlift::compiler::{CompilationContext, CompileOptions, Compiler};
///
/// let context = CompilationContext::new().with_resolvers(resolvers);
/// let compiler = Compiler::with_context(CompileOptions::default(), context);
/// let shader = compiler.compile(&method)?;
/// println!("{}", shader.source);
/// ```
pub struct Compiler {
    options: CompileOptions,
    context: Arc<CompilationContext>,
    passes: Vec<Box<dyn ShaderPass>>,
}

impl Compiler {
    /// Creates a compiler with a fresh default context.
    #[must_use]
    pub fn new(options: CompileOptions) -> Self {
        Self::with_context(options, CompilationContext::new())
    }

    /// Creates a compiler sharing `context`.
    #[must_use]
    pub fn with_context(options: CompileOptions, context: CompilationContext) -> Self {
        let height = options.max_lattice_height;
        Self {
            options,
            context: Arc::new(context),
            passes: vec![
                Box::new(ConstantFoldingPass::new()),
                Box::new(InlineValuesPass::new(height)),
                Box::new(DeadAssignmentPass::new(height)),
            ],
        }
    }

    /// Returns the options.
    #[must_use]
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Returns the shared context.
    #[must_use]
    pub fn context(&self) -> &Arc<CompilationContext> {
        &self.context
    }

    /// Compiles one method.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedConstruct`] if the declaring class does not
    /// derive from the shader base type or the body has a shape the structurer
    /// or emitter cannot express, [`Error::Resolution`] if the class chain
    /// cannot be resolved, and any error of the stages below.
    pub fn compile(&self, method: &ShaderMethod) -> Result<CompiledShader> {
        let ctx = &self.context;
        ctx.events
            .record(EventKind::MethodCompileStarted)
            .method(&method.name)
            .message(format!(
                "{}.{}{} ({})",
                method.class, method.name, method.descriptor, method.stage
            ));

        let lowered = self.lower(method)?;
        let shader = GlslEmitter::new(ctx, &self.options).emit(
            method,
            &lowered.structured.method,
            &lowered.facts,
        )?;

        ctx.events
            .record(EventKind::SourceEmitted)
            .method(&method.name)
            .message(format!("{} lines", shader.source.lines().count()));
        ctx.events
            .record(EventKind::MethodCompileCompleted)
            .method(&method.name);
        log::debug!(
            "{}: emitted {} bytes of {} source",
            method.name,
            shader.source.len(),
            shader.stage
        );
        Ok(shader)
    }

    /// Compiles every method on the rayon pool.
    ///
    /// Results are returned in input order; one failing method does not stop
    /// the others.
    #[must_use]
    pub fn compile_all(&self, methods: &[ShaderMethod]) -> Vec<Result<CompiledShader>> {
        methods.par_iter().map(|m| self.compile(m)).collect()
    }

    /// Takes `method` through every stage except emission.
    ///
    /// # Errors
    ///
    /// See [`Compiler::compile`].
    pub fn lower(&self, method: &ShaderMethod) -> Result<LoweredMethod> {
        let ctx = &self.context;
        let base = &self.options.shader_base_type;
        if !ctx.resolvers.derives_from(&method.class, base)? {
            return Err(Error::UnsupportedConstruct {
                method: method.name.clone(),
                message: format!("{} does not derive from {base}", method.class),
            });
        }
        ctx.events
            .record(EventKind::ClassResolved)
            .method(&method.name)
            .message(method.class.clone());

        let cfg = IntermediaryCfg::build(&method.body)?;
        ctx.events
            .record(EventKind::BlocksMerged)
            .method(&method.name)
            .message(format!(
                "{} instructions in {} blocks",
                method.body.len(),
                cfg.block_count()
            ));

        let parameters = method.parameter_variables();
        let mut body = MethodBody {
            name: method.name.clone(),
            parameters: parameters.clone(),
            cfg,
        };
        self.run_passes(&mut body)?;

        let analyses = analyze_all(
            &body.cfg,
            &parameters,
            ctx.effects.as_ref(),
            self.options.max_lattice_height,
        )?;
        for (analysis, iterations) in analyses.iterations() {
            ctx.events
                .record(EventKind::AnalysisConverged)
                .method(&method.name)
                .message(format!("{analysis} after {iterations} iterations"));
        }
        let facts = analyses.emit_facts(&body.cfg, &parameters);

        let structured = Structurer::new()
            .with_max_node_splits(self.options.max_node_splits)
            .with_simplify(self.options.simplify_structure)
            .structure(
                &method.name,
                parameters,
                method.return_type.clone(),
                &body.cfg,
            )?;
        if structured.stats.node_splits > 0 {
            ctx.events
                .record(EventKind::NodeSplit)
                .method(&method.name)
                .message(format!("{} blocks cloned", structured.stats.node_splits));
        }
        ctx.events
            .record(EventKind::ControlFlowStructured)
            .method(&method.name)
            .message(format!(
                "{} loops, {} labelled blocks",
                structured.stats.loops, structured.stats.labelled_blocks
            ));

        Ok(LoweredMethod {
            body,
            facts,
            structured,
        })
    }

    /// Runs the pass group until a round changes nothing.
    fn run_passes(&self, body: &mut MethodBody) -> Result<()> {
        if !self.options.optimizes() {
            return Ok(());
        }
        for round in 0..self.options.max_pass_iterations {
            let mut changed = false;
            for pass in &self.passes {
                if !pass.should_run(&self.options) {
                    continue;
                }
                log::trace!("{}: round {round}, running {}", body.name, pass.name());
                if pass.run_on_method(body, &self.context)? {
                    changed = true;
                    self.context
                        .events
                        .record(EventKind::PassCompleted)
                        .method(&body.name)
                        .pass(pass.name())
                        .message(pass.description());
                }
            }
            if !changed {
                break;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Compiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler")
            .field("options", &self.options)
            .field(
                "passes",
                &self.passes.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::{BinaryOp, GlobalKind, GlobalRef, Location, Value},
        resolve::{Annotation, ClassDescriptor, MemoryResolver, ResolverChain},
    };

    fn context() -> CompilationContext {
        let resolver = MemoryResolver::new(0)
            .with_class(ClassDescriptor::new("shaderlift/Shader", None))
            .with_class(ClassDescriptor::new("app/Kernel", Some("shaderlift/Shader")))
            .with_class(ClassDescriptor::new("app/Plain", None))
            .with_method_annotation(
                &CallSignature::new("app/Kernel", "run", "()V"),
                Annotation::LocalSize { x: 64, y: 1, z: 1 },
            )
            .with_field_annotation("app/Kernel", "results", Annotation::Binding(1));
        let resolver = Arc::new(resolver);
        CompilationContext::new().with_resolvers(
            ResolverChain::new()
                .with_class_resolver(resolver.clone())
                .with_annotation_resolver(resolver),
        )
    }

    fn kernel() -> ShaderMethod {
        let results = GlobalRef::new(
            "results",
            ShaderType::runtime_array(ShaderType::INT),
            GlobalKind::Buffer,
        );
        let s0 = Variable::stack(0, ShaderType::INT);
        let s1 = Variable::stack(1, ShaderType::INT);
        let l0 = Variable::local(0, ShaderType::INT);
        ShaderMethod::new("app/Kernel", "run", ShaderStage::Compute).with_body(vec![
            Instruction::assign(&s0, Value::int(20)),
            Instruction::assign(&s1, Value::int(22)),
            Instruction::assign(
                &l0,
                Value::binary(BinaryOp::Add, Value::var(&s0), Value::var(&s1)),
            ),
            Instruction::Assign {
                location: Location::ArrayElement {
                    array: Value::Global(results),
                    index: Value::int(0),
                },
                value: Value::var(&l0),
            },
            Instruction::Return(None),
        ])
    }

    #[test]
    fn test_compile_optimized() {
        let compiler = Compiler::with_context(CompileOptions::default(), context());
        let shader = compiler.compile(&kernel()).unwrap();

        assert_eq!(shader.stage, ShaderStage::Compute);
        assert!(shader
            .source
            .contains("layout(local_size_x = 64, local_size_y = 1, local_size_z = 1) in;"));
        assert!(shader
            .source
            .contains("layout(std430, binding = 1) buffer results_block {"));
        assert!(shader.source.contains("    l0 = 42;\n"), "{}", shader.source);
        assert!(shader.source.contains("    results[0] = l0;\n"), "{}", shader.source);

        let events = &compiler.context().events;
        assert!(events.has(EventKind::MethodCompileCompleted));
        assert!(events.has(EventKind::ValueInlined));
        assert!(events.has(EventKind::ConstantFolded));
    }

    #[test]
    fn test_compile_minimal_keeps_stack_values() {
        let compiler = Compiler::with_context(CompileOptions::minimal(), context());
        let shader = compiler.compile(&kernel()).unwrap();
        assert!(shader.source.contains("    s0 = 20;\n"), "{}", shader.source);
        assert!(shader.source.contains("    l0 = s0 + s1;\n"), "{}", shader.source);
        assert!(!compiler.context().events.has(EventKind::ValueInlined));
    }

    #[test]
    fn test_rejects_non_shader_class() {
        let compiler = Compiler::with_context(CompileOptions::default(), context());
        let mut method = kernel();
        method.class = "app/Plain".into();
        assert!(matches!(
            compiler.compile(&method),
            Err(Error::UnsupportedConstruct { .. })
        ));

        method.class = "app/Missing".into();
        assert!(matches!(compiler.compile(&method), Err(Error::Resolution(_))));
    }

    #[test]
    fn test_compile_all_in_order() {
        let compiler = Compiler::with_context(CompileOptions::default(), context());
        let mut broken = kernel();
        broken.class = "app/Plain".into();
        let results = compiler.compile_all(&[kernel(), broken, kernel()]);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert_eq!(
            results[0].as_ref().unwrap().source,
            results[2].as_ref().unwrap().source
        );
    }

    #[test]
    fn test_emit_facts() {
        let p = Variable::local(0, ShaderType::INT);
        let l1 = Variable::local(1, ShaderType::INT);
        let cfg = IntermediaryCfg::build(&[
            Instruction::assign(&p, Value::binary(BinaryOp::Add, Value::var(&p), Value::var(&l1))),
            Instruction::Return(None),
        ])
        .unwrap();
        let effects = crate::resolve::CallEffectTable::new();
        let analyses =
            analyze_all(&cfg, &[p.clone()], &effects, crate::analysis::DEFAULT_MAX_LATTICE_HEIGHT)
                .unwrap();
        let facts = analyses.emit_facts(&cfg, &[p.clone()]);
        assert!(facts.maybe_undefined.contains(&l1));
        assert!(!facts.maybe_undefined.contains(&p));
        assert!(facts.written_parameters.contains(&p));
    }

    #[test]
    fn test_analysis_budget_exhausted() {
        let l0 = Variable::local(0, ShaderType::INT);
        let cfg = IntermediaryCfg::build(&[
            Instruction::assign(&l0, Value::int(1)),
            Instruction::Return(None),
        ])
        .unwrap();
        let effects = crate::resolve::CallEffectTable::new();
        let result = analyze_all(&cfg, &[], &effects, 0);
        assert!(matches!(result, Err(Error::NoFixedPoint { .. })));
    }
}
