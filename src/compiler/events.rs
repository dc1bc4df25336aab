//! Event log of the shader compile pipeline.
//!
//! Every stage records what it did: blocks merged by the CFG builder, values
//! inlined and constants folded by the passes, nodes split by the structurer,
//! fixed points reached by the analyses. Nothing in the pipeline reads events
//! back; they exist for callers and tests, and [`CompileStats`] condenses them
//! into counters.
//!
//! # Architecture
//!
//! - [`Event`] - A single recorded event
//! - [`EventLog`] - Append-only collection with query and summary helpers
//! - [`EventBuilder`] - Fluent API for creating events
//!
//! # Example
//!
//! ```rust,ignore
//! use shaderlift::compiler::{EventKind, EventLog};
//!
//! let log = EventLog::new();
//! log.record(EventKind::ValueInlined)
//!     .at("main", block)
//!     .message("s0 -> (l0 ^ l1)");
//! println!("{}", log.summary());
//! ```

use std::{collections::BTreeMap, fmt};

use strum::{Display, EnumIter, IntoEnumIterator};

use crate::utils::graph::NodeId;

/// Pipeline stage an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Stage {
    /// Front matter: class resolution and method bookkeeping.
    Driver,
    /// CFG construction.
    Cfg,
    /// Dataflow analyses.
    Analysis,
    /// Optimisation passes.
    Pass,
    /// Control flow structuring.
    Structure,
    /// Source emission.
    Emit,
}

/// Categories of events that can be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
pub enum EventKind {
    /// A class was resolved through the resolver chain.
    #[strum(to_string = "class resolved")]
    ClassResolved,
    /// Compilation of a method started.
    #[strum(to_string = "method compile started")]
    MethodCompileStarted,
    /// Compilation of a method completed.
    #[strum(to_string = "method compile completed")]
    MethodCompileCompleted,

    /// Straight-line blocks were merged while building a CFG.
    #[strum(to_string = "blocks merged")]
    BlocksMerged,

    /// A dataflow analysis reached its fixed point.
    #[strum(to_string = "analysis converged")]
    AnalysisConverged,

    /// An expression was replaced by its constant value.
    #[strum(to_string = "constant folded")]
    ConstantFolded,
    /// A single-use stack value was inlined into its use.
    #[strum(to_string = "value inlined")]
    ValueInlined,
    /// A dead assignment was removed.
    #[strum(to_string = "assignment removed")]
    AssignmentRemoved,
    /// One pass of the optimisation group ran.
    #[strum(to_string = "pass completed")]
    PassCompleted,

    /// A block was cloned to make the graph reducible.
    #[strum(to_string = "node split")]
    NodeSplit,
    /// A CFG was turned into a structured tree.
    #[strum(to_string = "control flow structured")]
    ControlFlowStructured,

    /// A constant global was emitted as a named `const`.
    #[strum(to_string = "constant hoisted")]
    ConstantHoisted,
    /// A parameter received a writable local copy.
    #[strum(to_string = "parameter shadowed")]
    ParameterShadowed,
    /// Shader source was emitted.
    #[strum(to_string = "source emitted")]
    SourceEmitted,
}

impl EventKind {
    /// Returns the stage that records this kind.
    #[must_use]
    pub const fn stage(self) -> Stage {
        match self {
            Self::ClassResolved | Self::MethodCompileStarted | Self::MethodCompileCompleted => {
                Stage::Driver
            }
            Self::BlocksMerged => Stage::Cfg,
            Self::AnalysisConverged => Stage::Analysis,
            Self::ConstantFolded
            | Self::ValueInlined
            | Self::AssignmentRemoved
            | Self::PassCompleted => Stage::Pass,
            Self::NodeSplit | Self::ControlFlowStructured => Stage::Structure,
            Self::ConstantHoisted | Self::ParameterShadowed | Self::SourceEmitted => Stage::Emit,
        }
    }

    /// Returns true if the event stands for a change to the code being
    /// compiled, as opposed to bookkeeping.
    #[must_use]
    pub const fn changes_code(self) -> bool {
        matches!(
            self,
            Self::BlocksMerged
                | Self::ConstantFolded
                | Self::ValueInlined
                | Self::AssignmentRemoved
                | Self::NodeSplit
                | Self::ConstantHoisted
                | Self::ParameterShadowed
        )
    }
}

/// A single logged event.
#[derive(Debug, Clone)]
pub struct Event {
    /// The type of event.
    pub kind: EventKind,
    /// Name of the method being compiled, if any.
    pub method: Option<String>,
    /// CFG block the event concerns.
    pub block: Option<NodeId>,
    /// Human-readable detail; the kind's name when none was given.
    pub message: String,
    /// Name of the pass that recorded the event.
    pub pass: Option<&'static str>,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind)?;
        if let Some(method) = &self.method {
            write!(f, " {method}")?;
            if let Some(block) = self.block {
                write!(f, "@{block}")?;
            }
        }
        write!(f, " {}", self.message)
    }
}

/// Builder for creating events with a fluent API.
///
/// Created by [`EventLog::record`]. The event is added to the log when the
/// builder is dropped.
///
/// ```rust,ignore
/// log.record(EventKind::NodeSplit)
///     .at("main", block)
///     .message("cloned 2 blocks");
/// ```
pub struct EventBuilder<'a> {
    log: &'a EventLog,
    event: Option<Event>,
}

impl EventBuilder<'_> {
    fn update(mut self, f: impl FnOnce(&mut Event)) -> Self {
        if let Some(event) = self.event.as_mut() {
            f(event);
        }
        self
    }

    /// Sets the method and block where the event occurred.
    pub fn at(self, method: impl Into<String>, block: NodeId) -> Self {
        let method = method.into();
        self.update(|e| {
            e.method = Some(method);
            e.block = Some(block);
        })
    }

    /// Sets only the method, for method-level events.
    pub fn method(self, method: impl Into<String>) -> Self {
        let method = method.into();
        self.update(|e| e.method = Some(method))
    }

    /// Sets the detail message.
    pub fn message(self, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        self.update(|e| e.message = msg)
    }

    /// Attributes the event to a pass.
    pub fn pass(self, name: &'static str) -> Self {
        self.update(|e| e.pass = Some(name))
    }
}

impl Drop for EventBuilder<'_> {
    fn drop(&mut self) {
        if let Some(mut event) = self.event.take() {
            if event.message.is_empty() {
                event.message = event.kind.to_string();
            }
            self.log.events.push(event);
        }
    }
}

/// Append-only collection of compile events.
///
/// Passes record into a private log and [`merge`](Self::merge) it into the
/// shared one when they commit their rewrite. Appends go through `&self` and
/// may come from any thread.
#[derive(Debug, Default)]
pub struct EventLog {
    events: boxcar::Vec<Event>,
}

impl EventLog {
    /// Creates an empty event log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no events have been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.count() == 0
    }

    /// Returns the total number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Starts building a new event of the given kind.
    ///
    /// The event is added when the builder is dropped.
    pub fn record(&self, kind: EventKind) -> EventBuilder<'_> {
        EventBuilder {
            log: self,
            event: Some(Event {
                kind,
                method: None,
                block: None,
                message: String::new(),
                pass: None,
            }),
        }
    }

    /// Appends copies of every event of `other`.
    pub fn merge(&self, other: &EventLog) {
        for event in other.iter() {
            self.events.push(event.clone());
        }
    }

    /// Returns true if any event of the given kind exists.
    #[must_use]
    pub fn has(&self, kind: EventKind) -> bool {
        self.iter().any(|e| e.kind == kind)
    }

    /// Counts events of the given kind.
    #[must_use]
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.iter().filter(|e| e.kind == kind).count()
    }

    /// Returns an iterator over all events, in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|(_, e)| e)
    }

    /// Returns the events recorded for `method`.
    pub fn for_method<'a>(&'a self, method: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.iter()
            .filter(move |e| e.method.as_deref() == Some(method))
    }

    /// Returns the events recorded by `stage`.
    pub fn for_stage(&self, stage: Stage) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(move |e| e.kind.stage() == stage)
    }

    /// Condenses the log into counters.
    #[must_use]
    pub fn stats(&self) -> CompileStats {
        CompileStats::from_events(self.iter())
    }

    /// Lists how often each code-changing kind occurred, or `no changes`.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut counts: BTreeMap<EventKind, usize> = BTreeMap::new();
        for event in self.iter().filter(|e| e.kind.changes_code()) {
            *counts.entry(event.kind).or_default() += 1;
        }
        if counts.is_empty() {
            return "no changes".to_string();
        }
        EventKind::iter()
            .filter_map(|kind| counts.get(&kind).map(|count| format!("{count} {kind}")))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Counters derived from compile events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileStats {
    /// Methods that completed compilation.
    pub methods: usize,
    /// Blocks absorbed into a predecessor.
    pub blocks_merged: usize,
    /// Expressions folded to constants.
    pub constants_folded: usize,
    /// Stack values inlined into their use.
    pub values_inlined: usize,
    /// Dead assignments removed.
    pub assignments_removed: usize,
    /// Optimisation pass runs.
    pub pass_runs: usize,
    /// Blocks cloned by node splitting.
    pub nodes_split: usize,
    /// Constants emitted as named `const`s.
    pub constants_hoisted: usize,
    /// Parameters given a local copy.
    pub parameters_shadowed: usize,
}

impl CompileStats {
    fn from_events<'a>(events: impl Iterator<Item = &'a Event>) -> Self {
        let mut stats = Self::default();
        for event in events {
            let counter = match event.kind {
                EventKind::MethodCompileCompleted => &mut stats.methods,
                EventKind::BlocksMerged => &mut stats.blocks_merged,
                EventKind::ConstantFolded => &mut stats.constants_folded,
                EventKind::ValueInlined => &mut stats.values_inlined,
                EventKind::AssignmentRemoved => &mut stats.assignments_removed,
                EventKind::PassCompleted => &mut stats.pass_runs,
                EventKind::NodeSplit => &mut stats.nodes_split,
                EventKind::ConstantHoisted => &mut stats.constants_hoisted,
                EventKind::ParameterShadowed => &mut stats.parameters_shadowed,
                _ => continue,
            };
            *counter += 1;
        }
        stats
    }
}

impl fmt::Display for CompileStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} methods: {} inlined, {} folded, {} removed, {} split",
            self.methods,
            self.values_inlined,
            self.constants_folded,
            self.assignments_removed,
            self.nodes_split
        )
    }
}
