//! Identifier assignment for emitted variables.

use std::collections::{HashMap, HashSet};

use crate::ir::{Variable, VariableKind};

const RESERVED: &[&str] = &[
    "attribute", "bool", "break", "buffer", "case", "const", "continue", "default", "discard",
    "do", "else", "false", "float", "for", "highp", "if", "in", "inout", "int", "invariant",
    "layout", "lowp", "main", "mediump", "out", "precision", "return", "shared", "struct",
    "switch", "true", "uint", "uniform", "void", "while",
];

/// Maps every variable of one method to a unique identifier.
///
/// Parameters keep their (sanitized) source names. Locals become `l{index}` and
/// stack slots `s{index}`; a slot reused at another type gets a numeric suffix.
#[derive(Debug, Default)]
pub(crate) struct NameTable {
    names: HashMap<Variable, String>,
    shadows: HashMap<Variable, String>,
    taken: HashSet<String>,
}

impl NameTable {
    pub(crate) fn new() -> Self {
        let mut table = Self::default();
        table.taken.insert("_jump".to_string());
        table
    }

    /// Names a parameter after its source name.
    pub(crate) fn add_parameter(&mut self, var: &Variable, name: &str) -> String {
        let base = sanitize(name);
        let unique = self.claim(&base);
        self.names.insert(var.clone(), unique.clone());
        unique
    }

    /// Gives a parameter a writable copy; the body then refers to the copy.
    pub(crate) fn add_shadow(&mut self, var: &Variable) -> String {
        let base = format!("{}_copy", self.name(var));
        let unique = self.claim(&base);
        self.shadows.insert(var.clone(), unique.clone());
        unique
    }

    /// Names a body variable if it has no name yet.
    pub(crate) fn add_variable(&mut self, var: &Variable) {
        if self.names.contains_key(var) {
            return;
        }
        let prefix = match var.kind {
            VariableKind::Local => 'l',
            VariableKind::Stack => 's',
        };
        let unique = self.claim(&format!("{prefix}{}", var.index));
        self.names.insert(var.clone(), unique);
    }

    /// Returns the declared name of `var`, ignoring shadows.
    pub(crate) fn name(&self, var: &Variable) -> String {
        self.names
            .get(var)
            .cloned()
            .unwrap_or_else(|| var.to_string())
    }

    /// Returns the name the body uses for `var`.
    pub(crate) fn body_name(&self, var: &Variable) -> String {
        self.shadows
            .get(var)
            .cloned()
            .unwrap_or_else(|| self.name(var))
    }

    fn claim(&mut self, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut suffix = 1;
        while self.taken.contains(&candidate) {
            candidate = format!("{base}_{suffix}");
            suffix += 1;
        }
        self.taken.insert(candidate.clone());
        candidate
    }
}

/// Turns a host identifier into a valid, non-reserved GLSL identifier.
fn sanitize(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    while out.contains("__") {
        out = out.replace("__", "_");
    }
    if out.is_empty()
        || out.starts_with(|c: char| c.is_ascii_digit())
        || out.starts_with("gl_")
        || RESERVED.contains(&out.as_str())
    {
        out.insert_str(0, "p_");
    }
    out
}
