//! Shared state of one program compile.
//!
//! The [`CompilationContext`] holds everything compiles of several methods of
//! the same program share: the resolvers, the rendering collaborators, the
//! registry of hoisted constant names and emitted source fragments, and the
//! [`EventLog`].

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::{mapref::entry::Entry, DashMap};

use crate::{
    compiler::events::EventLog,
    emit::{CallRenderer, CallTable, GlslTypes, SourceFragment, TypeRenderer},
    ir::{GlobalRef, Literal, ShaderType},
    resolve::{CallEffectTable, CallEffects, ResolverChain},
    Error, Result,
};

/// A constant global emitted as a named `const` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoistedConstant {
    /// Identifier in the emitted source
    pub name: String,
    /// Declared type
    pub ty: ShaderType,
    /// Value
    pub literal: Literal,
    /// The global the declaration stands for
    pub global: GlobalRef,
}

/// Compilation context shared by every method of a program.
///
/// All registries are append-only and use thread-safe maps, so one context can
/// serve methods compiled in parallel.
pub struct CompilationContext {
    /// Class and annotation resolvers, with the resolved-class cache.
    pub resolvers: ResolverChain,

    /// Side-effect queries for calls.
    pub effects: Arc<dyn CallEffects>,

    /// Type and literal spelling.
    pub types: Arc<dyn TypeRenderer>,

    /// Call spelling.
    pub calls: Arc<dyn CallRenderer>,

    /// Accumulated events from all compiles.
    pub events: EventLog,

    /// Hoisted constants by emitted name.
    constants: DashMap<String, HoistedConstant>,

    /// Emitted name of each hoisted global.
    constant_names: DashMap<GlobalRef, String>,

    /// Source fragments by id.
    fragments: DashMap<String, SourceFragment>,

    /// When the context was created.
    start_time: Instant,
}

impl Default for CompilationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CompilationContext {
    /// Creates a context with no resolvers, no registered call effects and the
    /// GLSL renderers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            resolvers: ResolverChain::new(),
            effects: Arc::new(CallEffectTable::new()),
            types: Arc::new(GlslTypes),
            calls: Arc::new(CallTable::new()),
            events: EventLog::new(),
            constants: DashMap::new(),
            constant_names: DashMap::new(),
            fragments: DashMap::new(),
            start_time: Instant::now(),
        }
    }

    /// Replaces the resolver chain.
    #[must_use]
    pub fn with_resolvers(mut self, resolvers: ResolverChain) -> Self {
        self.resolvers = resolvers;
        self
    }

    /// Replaces the call-effect collaborator.
    #[must_use]
    pub fn with_effects(mut self, effects: Arc<dyn CallEffects>) -> Self {
        self.effects = effects;
        self
    }

    /// Replaces the type renderer.
    #[must_use]
    pub fn with_types(mut self, types: Arc<dyn TypeRenderer>) -> Self {
        self.types = types;
        self
    }

    /// Replaces the call renderer.
    #[must_use]
    pub fn with_calls(mut self, calls: Arc<dyn CallRenderer>) -> Self {
        self.calls = calls;
        self
    }

    /// Returns the elapsed time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    // ── Constant hoisting ───────────────────────────────────────────────

    /// Returns the emitted name of a constant global, registering it on first
    /// use.
    ///
    /// The same global always receives the same name. Distinct globals whose
    /// names collide are told apart by a numeric suffix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if `global` is not a constant.
    pub fn hoist_constant(&self, global: &GlobalRef) -> Result<HoistedConstant> {
        let Some(literal) = global.constant_value() else {
            return Err(Error::TypeMismatch(format!(
                "{} is not a constant global",
                global.name
            )));
        };
        if let Some(name) = self.constant_names.get(global) {
            if let Some(existing) = self.constants.get(name.value()) {
                return Ok(existing.clone());
            }
        }

        let base = global.name.clone();
        let mut name = base.clone();
        let mut suffix = 1;
        let hoisted = loop {
            match self.constants.entry(name.clone()) {
                Entry::Vacant(vacant) => {
                    let hoisted = HoistedConstant {
                        name: name.clone(),
                        ty: global.ty.clone(),
                        literal,
                        global: global.clone(),
                    };
                    vacant.insert(hoisted.clone());
                    break hoisted;
                }
                Entry::Occupied(occupied) if occupied.get().global == *global => {
                    break occupied.get().clone();
                }
                Entry::Occupied(_) => {
                    name = format!("{base}_{suffix}");
                    suffix += 1;
                }
            }
        };
        self.constant_names
            .insert(global.clone(), hoisted.name.clone());
        Ok(hoisted)
    }

    /// Returns every hoisted constant, sorted by name.
    #[must_use]
    pub fn hoisted_constants(&self) -> Vec<HoistedConstant> {
        let mut all: Vec<_> = self.constants.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    // ── Source fragments ────────────────────────────────────────────────

    /// Registers a fragment.
    ///
    /// Returns `true` the first time an id is seen.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolution`] if a different fragment was already
    /// registered under the same id.
    pub fn register_fragment(&self, fragment: &SourceFragment) -> Result<bool> {
        match self.fragments.entry(fragment.id.clone()) {
            Entry::Vacant(vacant) => {
                vacant.insert(fragment.clone());
                Ok(true)
            }
            Entry::Occupied(occupied) if occupied.get() == fragment => Ok(false),
            Entry::Occupied(_) => Err(Error::Resolution(format!(
                "conflicting definitions of source fragment {}",
                fragment.id
            ))),
        }
    }

    /// Returns the number of registered fragments.
    #[must_use]
    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }
}

impl std::fmt::Debug for CompilationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompilationContext")
            .field("resolvers", &self.resolvers)
            .field("constants", &self.constants.len())
            .field("fragments", &self.fragments.len())
            .field("events", &self.events.len())
            .finish_non_exhaustive()
    }
}
