//! In-memory resolver for embedders that already hold their metadata.

use std::collections::HashMap;

use crate::{
    ir::CallSignature,
    resolve::{Annotation, AnnotationResolver, ClassDescriptor, ClassResolver},
};

/// A resolver answering from maps filled up front.
///
/// Implements both [`ClassResolver`] and [`AnnotationResolver`].
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    priority: i32,
    classes: HashMap<String, ClassDescriptor>,
    class_annotations: HashMap<String, Vec<Annotation>>,
    field_annotations: HashMap<(String, String), Vec<Annotation>>,
    method_annotations: HashMap<CallSignature, Vec<Annotation>>,
    parameter_annotations: HashMap<(CallSignature, usize), Vec<Annotation>>,
}

impl MemoryResolver {
    /// Creates an empty resolver with the given priority.
    #[must_use]
    pub fn new(priority: i32) -> Self {
        Self {
            priority,
            ..Self::default()
        }
    }

    /// Adds a class.
    #[must_use]
    pub fn with_class(mut self, class: ClassDescriptor) -> Self {
        self.classes.insert(class.binary_name.clone(), class);
        self
    }

    /// Adds a class annotation.
    #[must_use]
    pub fn with_class_annotation(mut self, class: &str, annotation: Annotation) -> Self {
        self.class_annotations
            .entry(class.to_string())
            .or_default()
            .push(annotation);
        self
    }

    /// Adds a field annotation.
    #[must_use]
    pub fn with_field_annotation(mut self, class: &str, field: &str, annotation: Annotation) -> Self {
        self.field_annotations
            .entry((class.to_string(), field.to_string()))
            .or_default()
            .push(annotation);
        self
    }

    /// Adds a method annotation.
    #[must_use]
    pub fn with_method_annotation(mut self, method: &CallSignature, annotation: Annotation) -> Self {
        self.method_annotations
            .entry(method.clone())
            .or_default()
            .push(annotation);
        self
    }

    /// Adds a parameter annotation.
    #[must_use]
    pub fn with_parameter_annotation(
        mut self,
        method: &CallSignature,
        index: usize,
        annotation: Annotation,
    ) -> Self {
        self.parameter_annotations
            .entry((method.clone(), index))
            .or_default()
            .push(annotation);
        self
    }
}

impl ClassResolver for MemoryResolver {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn try_resolve(&self, binary_name: &str) -> Option<ClassDescriptor> {
        self.classes.get(binary_name).cloned()
    }
}

impl AnnotationResolver for MemoryResolver {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn class_annotations(&self, class: &str) -> Vec<Annotation> {
        self.class_annotations.get(class).cloned().unwrap_or_default()
    }

    fn field_annotations(&self, class: &str, field: &str) -> Vec<Annotation> {
        self.field_annotations
            .get(&(class.to_string(), field.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    fn method_annotations(&self, method: &CallSignature) -> Vec<Annotation> {
        self.method_annotations
            .get(method)
            .cloned()
            .unwrap_or_default()
    }

    fn parameter_annotations(&self, method: &CallSignature, index: usize) -> Vec<Annotation> {
        self.parameter_annotations
            .get(&(method.clone(), index))
            .cloned()
            .unwrap_or_default()
    }
}
