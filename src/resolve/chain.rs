//! Priority-ordered resolver chain with a success-only cache.

use std::sync::Arc;

use dashmap::DashMap;

use crate::{
    ir::CallSignature,
    resolve::{Annotation, AnnotationResolver, ClassDescriptor, ClassResolver},
    Error, Result,
};

/// Consults every registered resolver, highest priority first.
///
/// Resolved classes are cached for the lifetime of the chain. Failures are not
/// cached: a class that could not be found is looked up again on the next
/// request, so a resolver that learns about it later is still consulted.
///
/// # Thread Safety
///
/// The cache is a [`DashMap`], so one chain can serve several compiles running
/// on different threads.
#[derive(Default)]
pub struct ResolverChain {
    classes: Vec<Arc<dyn ClassResolver>>,
    annotations: Vec<Arc<dyn AnnotationResolver>>,
    cache: DashMap<String, Arc<ClassDescriptor>>,
}

impl ResolverChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a class resolver. Resolvers of equal priority keep their
    /// registration order.
    #[must_use]
    pub fn with_class_resolver(mut self, resolver: Arc<dyn ClassResolver>) -> Self {
        self.classes.push(resolver);
        self.classes
            .sort_by_key(|r| std::cmp::Reverse(r.priority()));
        self
    }

    /// Adds an annotation resolver.
    #[must_use]
    pub fn with_annotation_resolver(mut self, resolver: Arc<dyn AnnotationResolver>) -> Self {
        self.annotations.push(resolver);
        self.annotations
            .sort_by_key(|r| std::cmp::Reverse(r.priority()));
        self
    }

    /// Resolves a class by binary name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolution`] if no resolver knows the class.
    pub fn resolve(&self, binary_name: &str) -> Result<Arc<ClassDescriptor>> {
        if let Some(cached) = self.cache.get(binary_name) {
            return Ok(Arc::clone(cached.value()));
        }

        let found = self
            .classes
            .iter()
            .find_map(|resolver| resolver.try_resolve(binary_name))
            .ok_or_else(|| Error::Resolution(format!("class {binary_name} not found")))?;

        log::trace!("resolved class {binary_name}");
        let descriptor = Arc::new(found);
        self.cache
            .insert(binary_name.to_string(), Arc::clone(&descriptor));
        Ok(descriptor)
    }

    /// Returns `true` if `class` is `base` or derives from it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolution`] if a class in the superclass chain cannot
    /// be resolved, or [`Error::UnsupportedConstruct`] if the chain is cyclic.
    pub fn derives_from(&self, class: &str, base: &str) -> Result<bool> {
        let mut current = class.to_string();
        let mut seen = Vec::new();
        loop {
            if current == base {
                return Ok(true);
            }
            if seen.contains(&current) {
                return Err(Error::UnsupportedConstruct {
                    method: class.to_string(),
                    message: format!("cyclic superclass chain through {current}"),
                });
            }
            let descriptor = self.resolve(&current)?;
            let Some(parent) = descriptor.super_name.clone() else {
                return Ok(false);
            };
            seen.push(std::mem::replace(&mut current, parent));
        }
    }

    /// Returns the number of cached classes.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Annotations of a class, concatenated by descending resolver priority.
    #[must_use]
    pub fn class_annotations(&self, class: &str) -> Vec<Annotation> {
        self.collect(|r| r.class_annotations(class))
    }

    /// Annotations of a field.
    #[must_use]
    pub fn field_annotations(&self, class: &str, field: &str) -> Vec<Annotation> {
        self.collect(|r| r.field_annotations(class, field))
    }

    /// Annotations of a method.
    #[must_use]
    pub fn method_annotations(&self, method: &CallSignature) -> Vec<Annotation> {
        self.collect(|r| r.method_annotations(method))
    }

    /// Annotations of the parameter at `index` (receiver excluded).
    #[must_use]
    pub fn parameter_annotations(&self, method: &CallSignature, index: usize) -> Vec<Annotation> {
        self.collect(|r| r.parameter_annotations(method, index))
    }

    fn collect<F>(&self, f: F) -> Vec<Annotation>
    where
        F: Fn(&dyn AnnotationResolver) -> Vec<Annotation>,
    {
        self.annotations
            .iter()
            .flat_map(|resolver| f(resolver.as_ref()))
            .collect()
    }
}

impl std::fmt::Debug for ResolverChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverChain")
            .field("class_resolvers", &self.classes.len())
            .field("annotation_resolvers", &self.annotations.len())
            .field("cached", &self.cache.len())
            .finish()
    }
}
