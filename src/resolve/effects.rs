//! Call side-effect queries.
//!
//! Value tracking and inlining never look into callees. Whether a call may
//! write through one of its arguments, or to program-scope storage, is answered
//! by a [`CallEffects`] implementation, normally a [`CallEffectTable`] filled by
//! the front end from the host program's extension metadata.

use std::collections::HashMap;

use crate::ir::{CallSignature, CallValue, GlobalRef};

/// Storage a call may write.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MutationTarget {
    /// The referent of the argument at this position (receiver is position 0
    /// for instance methods).
    Argument(usize),
    /// A named program-scope resource.
    Global(GlobalRef),
}

/// Answers which storage a call may mutate.
///
/// Implementations must be deterministic: analyses running in parallel ask the
/// same question and must agree.
pub trait CallEffects: Send + Sync {
    /// Returns everything `call` may write. An empty list means the call is
    /// pure.
    fn mutated_args(&self, call: &CallValue) -> Vec<MutationTarget>;

    /// Returns `true` if `call` writes nothing.
    fn is_pure(&self, call: &CallValue) -> bool {
        self.mutated_args(call).is_empty()
    }
}

/// Side table of call effects keyed by [`CallSignature`].
///
/// Calls without an entry are treated as pure; built-in functions of the
/// target language need no registration.
#[derive(Debug, Clone, Default)]
pub struct CallEffectTable {
    effects: HashMap<CallSignature, Vec<MutationTarget>>,
}

impl CallEffectTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the effects of a callee, replacing any earlier entry.
    #[must_use]
    pub fn with(mut self, signature: CallSignature, targets: Vec<MutationTarget>) -> Self {
        self.insert(signature, targets);
        self
    }

    /// Registers the effects of a callee, replacing any earlier entry.
    pub fn insert(&mut self, signature: CallSignature, targets: Vec<MutationTarget>) {
        self.effects.insert(signature, targets);
    }

    /// Returns the number of registered callees.
    #[must_use]
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Returns `true` if no callee is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

impl CallEffects for CallEffectTable {
    fn mutated_args(&self, call: &CallValue) -> Vec<MutationTarget> {
        self.effects
            .get(&call.signature)
            .cloned()
            .unwrap_or_default()
    }
}
