//! Compile configuration.

use strum::{Display, EnumIter, EnumString};

use crate::{analysis::DEFAULT_MAX_LATTICE_HEIGHT, structure::DEFAULT_MAX_NODE_SPLITS};

/// Pipeline stage a shader method is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ShaderStage {
    /// Compute shader; carries a local work-group size.
    Compute,
    /// Vertex shader.
    Vertex,
    /// Fragment shader.
    Fragment,
}

/// Configuration of a [`Compiler`](crate::compiler::Compiler).
///
/// The default runs every optimisation; [`CompileOptions::minimal`] runs none
/// and keeps the output close to the lifted bytecode, which is what the
/// structuring tests compare against.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct CompileOptions {
    /// GLSL version written to the `#version` header (default: 430)
    pub glsl_version: u32,

    /// Inline single-use stack values into their use site
    pub inline_values: bool,

    /// Replace expressions over literals and constant globals by their value
    pub fold_constants: bool,

    /// Emit constant globals as named `const` declarations instead of literals
    pub hoist_constants: bool,

    /// Remove assignments whose value is never read
    pub eliminate_dead_assignments: bool,

    /// Run the tree simplification after structuring
    pub simplify_structure: bool,

    /// Maximum number of blocks node splitting may clone (default: 64)
    pub max_node_splits: usize,

    /// Maximum rounds of the inline/fold/eliminate pass group (default: 8)
    pub max_pass_iterations: usize,

    /// Per-block iteration factor of the dataflow solver (default: 1024)
    pub max_lattice_height: usize,

    /// Binary name of the class every shader must derive from
    pub shader_base_type: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            glsl_version: 430,
            inline_values: true,
            fold_constants: true,
            hoist_constants: true,
            eliminate_dead_assignments: true,
            simplify_structure: true,
            max_node_splits: DEFAULT_MAX_NODE_SPLITS,
            max_pass_iterations: 8,
            max_lattice_height: DEFAULT_MAX_LATTICE_HEIGHT,
            shader_base_type: "shaderlift/Shader".to_string(),
        }
    }
}

impl CompileOptions {
    /// Creates a configuration running every optimisation.
    #[must_use]
    pub fn optimized() -> Self {
        Self::default()
    }

    /// Creates a configuration running no optimisation.
    ///
    /// Stack values stay as separate assignments, constant globals are
    /// written as literals where they are read, and the structured tree is
    /// emitted unsimplified.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            inline_values: false,
            fold_constants: false,
            hoist_constants: false,
            eliminate_dead_assignments: false,
            simplify_structure: false,
            max_pass_iterations: 0,
            ..Self::default()
        }
    }

    /// Sets the GLSL version.
    #[must_use]
    pub fn with_glsl_version(mut self, version: u32) -> Self {
        self.glsl_version = version;
        self
    }

    /// Enables or disables stack value inlining.
    #[must_use]
    pub fn with_inline_values(mut self, enabled: bool) -> Self {
        self.inline_values = enabled;
        self
    }

    /// Enables or disables constant folding.
    #[must_use]
    pub fn with_fold_constants(mut self, enabled: bool) -> Self {
        self.fold_constants = enabled;
        self
    }

    /// Enables or disables constant hoisting.
    #[must_use]
    pub fn with_hoist_constants(mut self, enabled: bool) -> Self {
        self.hoist_constants = enabled;
        self
    }

    /// Enables or disables dead assignment elimination.
    #[must_use]
    pub fn with_eliminate_dead_assignments(mut self, enabled: bool) -> Self {
        self.eliminate_dead_assignments = enabled;
        self
    }

    /// Enables or disables the tree simplification.
    #[must_use]
    pub fn with_simplify_structure(mut self, enabled: bool) -> Self {
        self.simplify_structure = enabled;
        self
    }

    /// Sets the node splitting budget.
    #[must_use]
    pub fn with_max_node_splits(mut self, max: usize) -> Self {
        self.max_node_splits = max;
        self
    }

    /// Sets the maximum number of pass rounds.
    #[must_use]
    pub fn with_max_pass_iterations(mut self, max: usize) -> Self {
        self.max_pass_iterations = max;
        self
    }

    /// Sets the dataflow iteration factor.
    #[must_use]
    pub fn with_max_lattice_height(mut self, height: usize) -> Self {
        self.max_lattice_height = height;
        self
    }

    /// Sets the binary name of the shader base class.
    #[must_use]
    pub fn with_shader_base_type(mut self, name: impl Into<String>) -> Self {
        self.shader_base_type = name.into();
        self
    }

    /// Returns `true` if any value-level optimisation is enabled.
    #[must_use]
    pub fn optimizes(&self) -> bool {
        self.max_pass_iterations > 0
            && (self.inline_values || self.fold_constants || self.eliminate_dead_assignments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_presets() {
        let optimized = CompileOptions::optimized();
        assert!(optimized.optimizes());
        assert_eq!(optimized, CompileOptions::default());

        let minimal = CompileOptions::minimal();
        assert!(!minimal.optimizes());
        assert!(!minimal.simplify_structure);
        assert_eq!(minimal.glsl_version, 430);
    }

    #[test]
    fn test_setters() {
        let options = CompileOptions::default()
            .with_glsl_version(450)
            .with_inline_values(false)
            .with_max_node_splits(3)
            .with_shader_base_type("demo/Kernel");
        assert_eq!(options.glsl_version, 450);
        assert!(!options.inline_values);
        assert_eq!(options.max_node_splits, 3);
        assert_eq!(options.shader_base_type, "demo/Kernel");
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(ShaderStage::Compute.to_string(), "compute");
        assert_eq!(ShaderStage::from_str("fragment").unwrap(), ShaderStage::Fragment);
        assert_eq!(ShaderStage::iter().count(), 3);
    }
}
