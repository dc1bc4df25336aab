use thiserror::Error;

use crate::ir::LabelId;

macro_rules! consistency_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::InternalConsistency {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::InternalConsistency {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which covers every failure a shader compile can produce.
///
/// There is no partial-success mode: any of these aborts the compile of the method
/// that raised it. Errors are deterministic functions of the input, so callers
/// should not retry.
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::UnsupportedConstruct`] - An input shape the core has no rule for
/// - [`Error::DanglingLabel`] - A jump names a label that was never placed
/// - [`Error::TypeMismatch`] - Operands of incompatible types reached an operation
///
/// ## Collaborator Errors
/// - [`Error::Resolution`] - No resolver could locate a class or capability
///
/// ## Internal Errors
/// - [`Error::InternalConsistency`] - A stage produced output violating a pipeline invariant
/// - [`Error::NoFixedPoint`] - A dataflow analysis failed to converge
///
/// # Examples
///
/// ```rust,ignore
/// use shaderlift::{Compiler, Error};
///
/// match compiler.compile(&method) {
///     Ok(shader) => println!("{}", shader.source),
///     Err(Error::UnsupportedConstruct { method, message }) => {
///         eprintln!("{method}: {message}");
///     }
///     Err(e) => eprintln!("compile failed: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The input contains a construct the structurer or emitter has no rule for.
    ///
    /// Raised for shapes such as irreducible regions that node splitting could not
    /// resolve within the configured budget, or a class that does not derive from
    /// the shader base type.
    #[error("Unsupported construct in {method}: {message}")]
    UnsupportedConstruct {
        /// The method being compiled
        method: String,
        /// What was not supported
        message: String,
    },

    /// No resolver could locate a referenced class or capability.
    #[error("Failed to resolve - {0}")]
    Resolution(String),

    /// A pipeline invariant was violated.
    ///
    /// This indicates a bug in an earlier stage, for example a `Goto` surviving
    /// structuring. It is never recovered from.
    ///
    /// # Fields
    ///
    /// * `message` - Description of the violated invariant
    /// * `file` - Source file where the violation was detected
    /// * `line` - Source line where the violation was detected
    #[error("Internal consistency - {file}:{line}: {message}")]
    InternalConsistency {
        /// The message to be printed for the InternalConsistency error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A jump instruction references a label that is not placed in the body.
    #[error("Jump to undefined label {0}")]
    DanglingLabel(LabelId),

    /// A dataflow analysis did not reach a fixed point within its iteration budget.
    ///
    /// Only an analysis whose transfer or meet function is not monotone can cause this.
    #[error("Analysis {analysis} did not converge after {iterations} iterations")]
    NoFixedPoint {
        /// Name of the analysis
        analysis: &'static str,
        /// Iterations performed before giving up
        iterations: usize,
    },

    /// Operands of incompatible types met in an operation.
    #[error("Type mismatch - {0}")]
    TypeMismatch(String),

    /// Writing the generated source failed.
    #[error("{0}")]
    Format(#[from] std::fmt::Error),
}
