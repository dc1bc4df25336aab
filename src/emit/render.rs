//! Text rendering collaborators.
//!
//! The emitter decides statement structure; how a type, literal or call is
//! spelled in the target language is delegated to a [`TypeRenderer`] and a
//! [`CallRenderer`]. The defaults, [`GlslTypes`] and [`CallTable`], cover GLSL
//! 4.x built-ins and a table of host calls registered by the front end.

use std::collections::HashMap;

use crate::{
    ir::{CallSignature, CallValue, Literal, ScalarKind, ShaderType},
    Error, Result,
};

/// Spells types and literals.
pub trait TypeRenderer: Send + Sync {
    /// Returns the name of `ty` as used in declarations and constructors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedConstruct`] for types the target cannot
    /// express.
    fn type_name(&self, ty: &ShaderType) -> Result<String>;

    /// Returns the source text of a literal.
    fn literal(&self, literal: &Literal) -> String;

    /// Returns an expression producing the zero value of `ty`, or `None` if the
    /// type has no constructor form (arrays, structures).
    fn zero_value(&self, ty: &ShaderType) -> Option<String>;
}

/// GLSL spelling of the IR types.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlslTypes;

impl TypeRenderer for GlslTypes {
    fn type_name(&self, ty: &ShaderType) -> Result<String> {
        match ty {
            ShaderType::Vector { size, .. } if !(2..=4).contains(size) => {
                Err(Error::UnsupportedConstruct {
                    method: String::new(),
                    message: format!("vector of {size} components"),
                })
            }
            ShaderType::Matrix { columns, rows }
                if !(2..=4).contains(columns) || !(2..=4).contains(rows) =>
            {
                Err(Error::UnsupportedConstruct {
                    method: String::new(),
                    message: format!("{columns}x{rows} matrix"),
                })
            }
            other => Ok(other.to_string()),
        }
    }

    fn literal(&self, literal: &Literal) -> String {
        match literal {
            Literal::Float(v) if v.is_nan() => "uintBitsToFloat(0x7fc00000u)".to_string(),
            Literal::Float(v) if v.is_infinite() && *v > 0.0 => {
                "uintBitsToFloat(0x7f800000u)".to_string()
            }
            Literal::Float(v) if v.is_infinite() => "uintBitsToFloat(0xff800000u)".to_string(),
            Literal::Int(i32::MIN) => "int(0x80000000u)".to_string(),
            other => other.to_string(),
        }
    }

    fn zero_value(&self, ty: &ShaderType) -> Option<String> {
        let zero = |kind: ScalarKind| match kind {
            ScalarKind::Bool => "false",
            ScalarKind::Int => "0",
            ScalarKind::UInt => "0u",
            ScalarKind::Float => "0.0",
        };
        match ty {
            ShaderType::Scalar(kind) => Some(zero(*kind).to_string()),
            ShaderType::Vector { scalar, .. } => Some(format!("{ty}({})", zero(*scalar))),
            ShaderType::Matrix { .. } => Some(format!("{ty}(0.0)")),
            _ => None,
        }
    }
}

/// A top-level definition a rendered call depends on, such as a helper
/// function. Fragments with the same id are emitted once per shader.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceFragment {
    /// Deduplication key
    pub id: String,
    /// Source text, emitted verbatim before the entry function
    pub source: String,
}

impl SourceFragment {
    /// Creates a fragment.
    #[must_use]
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
        }
    }
}

/// The text of one call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCall {
    /// Expression text
    pub text: String,
    /// Definitions the expression needs
    pub fragments: Vec<SourceFragment>,
}

/// Spells calls.
pub trait CallRenderer: Send + Sync {
    /// Renders `call` given the already rendered argument texts, receiver
    /// first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolution`] if the call has no rendering.
    fn render_call(&self, call: &CallValue, args: &[String]) -> Result<RenderedCall>;
}

/// How a registered callee is spelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallTemplate {
    /// A function call `name(args...)`.
    Function(String),
    /// Free-form text where `$0`, `$1`, ... stand for the arguments.
    Pattern(String),
}

#[derive(Debug, Clone)]
struct CallEntry {
    template: CallTemplate,
    fragments: Vec<SourceFragment>,
}

/// Table of call renderings keyed by [`CallSignature`].
///
/// Calls without an entry render as `name(args...)` using the callee's method
/// name, which covers the built-in functions the host exposes under their
/// target-language names.
#[derive(Debug, Clone, Default)]
pub struct CallTable {
    entries: HashMap<CallSignature, CallEntry>,
    strict: bool,
}

impl CallTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes unregistered calls an error instead of rendering them by name.
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Registers the rendering of a callee.
    #[must_use]
    pub fn with(mut self, signature: CallSignature, template: CallTemplate) -> Self {
        self.entries.insert(
            signature,
            CallEntry {
                template,
                fragments: Vec::new(),
            },
        );
        self
    }

    /// Registers a callee that needs a helper definition.
    #[must_use]
    pub fn with_fragment(
        mut self,
        signature: CallSignature,
        template: CallTemplate,
        fragment: SourceFragment,
    ) -> Self {
        self.entries.insert(
            signature,
            CallEntry {
                template,
                fragments: vec![fragment],
            },
        );
        self
    }

    /// Returns the number of registered callees.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no callee is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CallRenderer for CallTable {
    fn render_call(&self, call: &CallValue, args: &[String]) -> Result<RenderedCall> {
        let Some(entry) = self.entries.get(&call.signature) else {
            if self.strict {
                return Err(Error::Resolution(format!(
                    "no rendering for call {}",
                    call.signature
                )));
            }
            return Ok(RenderedCall {
                text: format!("{}({})", call.signature.name, args.join(", ")),
                fragments: Vec::new(),
            });
        };

        let text = match &entry.template {
            CallTemplate::Function(name) => format!("{name}({})", args.join(", ")),
            CallTemplate::Pattern(pattern) => expand(pattern, args, &call.signature)?,
        };
        Ok(RenderedCall {
            text,
            fragments: entry.fragments.clone(),
        })
    }
}

/// Substitutes `$n` placeholders in `pattern`.
fn expand(pattern: &str, args: &[String], signature: &CallSignature) -> Result<String> {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        let mut digits = String::new();
        while let Some(&d) = chars.peek() {
            if !d.is_ascii_digit() {
                break;
            }
            digits.push(d);
            chars.next();
        }
        if digits.is_empty() {
            out.push('$');
            continue;
        }
        let index: usize = digits.parse().map_err(|_| {
            Error::Resolution(format!("bad placeholder ${digits} for {signature}"))
        })?;
        let arg = args.get(index).ok_or_else(|| {
            Error::Resolution(format!(
                "placeholder ${index} out of range for {signature} with {} arguments",
                args.len()
            ))
        })?;
        out.push_str(arg);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Value;

    fn call(name: &str, argc: usize) -> CallValue {
        CallValue::new(
            CallSignature::new("Shader", name, "()V"),
            vec![Value::int(0); argc],
            ShaderType::INT,
        )
    }

    #[test]
    fn test_glsl_literals() {
        let types = GlslTypes;
        assert_eq!(types.literal(&Literal::Float(2.0)), "2.0");
        assert_eq!(types.literal(&Literal::UInt(7)), "7u");
        assert_eq!(
            types.literal(&Literal::Float(f32::NAN)),
            "uintBitsToFloat(0x7fc00000u)"
        );
        assert_eq!(types.literal(&Literal::Int(i32::MIN)), "int(0x80000000u)");
    }

    #[test]
    fn test_glsl_zero_values() {
        let types = GlslTypes;
        assert_eq!(types.zero_value(&ShaderType::UINT).as_deref(), Some("0u"));
        assert_eq!(
            types
                .zero_value(&ShaderType::vector(ScalarKind::Float, 3))
                .as_deref(),
            Some("vec3(0.0)")
        );
        assert_eq!(
            types.zero_value(&ShaderType::runtime_array(ShaderType::INT)),
            None
        );
        assert!(types
            .type_name(&ShaderType::vector(ScalarKind::Int, 5))
            .is_err());
    }

    #[test]
    fn test_call_table_templates() {
        let table = CallTable::new()
            .with(
                CallSignature::new("Shader", "barrier", "()V"),
                CallTemplate::Function("barrier".into()),
            )
            .with_fragment(
                CallSignature::new("Shader", "lerp", "()V"),
                CallTemplate::Pattern("mix($1, $2, $0)".into()),
                SourceFragment::new("lerp", "// uses mix"),
            );

        let barrier = table.render_call(&call("barrier", 0), &[]).unwrap();
        assert_eq!(barrier.text, "barrier()");
        assert!(barrier.fragments.is_empty());

        let args = ["t".to_string(), "a".to_string(), "b".to_string()];
        let lerp = table.render_call(&call("lerp", 3), &args).unwrap();
        assert_eq!(lerp.text, "mix(a, b, t)");
        assert_eq!(lerp.fragments.len(), 1);

        let fallback = table.render_call(&call("max", 2), &args[..2]).unwrap();
        assert_eq!(fallback.text, "max(t, a)");
    }

    #[test]
    fn test_call_table_errors() {
        let table = CallTable::new().with(
            CallSignature::new("Shader", "bad", "()V"),
            CallTemplate::Pattern("f($3)".into()),
        );
        assert!(matches!(
            table.render_call(&call("bad", 1), &["x".into()]),
            Err(Error::Resolution(_))
        ));
        assert!(matches!(
            CallTable::new().strict().render_call(&call("max", 0), &[]),
            Err(Error::Resolution(_))
        ));
    }
}
