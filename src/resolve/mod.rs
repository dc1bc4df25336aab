//! Narrow query interfaces to the host program's metadata.
//!
//! The core never parses class files or reflects over annotations itself.
//! Everything it needs to know about the host program is asked through the
//! traits in this module:
//!
//! - [`ClassResolver`] - binary name to [`ClassDescriptor`]
//! - [`AnnotationResolver`] - annotations on classes, fields, methods and parameters
//! - [`CallEffects`] - which storage a call may write
//!
//! Several resolvers can be combined in a [`ResolverChain`], which asks them in
//! descending [`priority`](ClassResolver::priority) order.

mod chain;
mod class;
mod effects;
mod memory;

pub use chain::ResolverChain;
pub use class::{Annotation, ClassDescriptor};
pub use effects::{CallEffectTable, CallEffects, MutationTarget};
pub use memory::MemoryResolver;

use crate::ir::CallSignature;

/// Finds classes by binary name.
pub trait ClassResolver: Send + Sync {
    /// Resolvers with higher priority are asked first.
    fn priority(&self) -> i32 {
        0
    }

    /// Returns the class, or `None` if this resolver does not know it.
    fn try_resolve(&self, binary_name: &str) -> Option<ClassDescriptor>;
}

/// Lists annotations attached to host program elements.
///
/// Every query defaults to "no annotations", so a resolver only implements the
/// targets it knows about.
pub trait AnnotationResolver: Send + Sync {
    /// Resolvers with higher priority contribute first.
    fn priority(&self) -> i32 {
        0
    }

    /// Annotations on a class.
    fn class_annotations(&self, _class: &str) -> Vec<Annotation> {
        Vec::new()
    }

    /// Annotations on a field of `class`.
    fn field_annotations(&self, _class: &str, _field: &str) -> Vec<Annotation> {
        Vec::new()
    }

    /// Annotations on a method.
    fn method_annotations(&self, _method: &CallSignature) -> Vec<Annotation> {
        Vec::new()
    }

    /// Annotations on the parameter at `index`, receiver excluded.
    fn parameter_annotations(&self, _method: &CallSignature, _index: usize) -> Vec<Annotation> {
        Vec::new()
    }
}
