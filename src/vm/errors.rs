//! VM errors

use thiserror::Error;

use crate::runtime::memory::Slot;
use crate::runtime::value::ValueKind;
use crate::util::string::StrError;

/// VM result
pub type VMResult<T> = Result<T, VMError>;

/// VM errors
///
/// The core never aborts on these; the host decides whether to stop, log
/// and continue, or report them to the script author.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VMError {
    /// Name not bound in the local context or the global table
    #[error("Undefined symbol: {0}")]
    UndefinedSymbol(String),

    /// Raised by builtins when a slot holds the wrong kind of value
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: ValueKind,
        found: ValueKind,
    },

    /// Parser hit end of input inside an open group or quote
    #[error("Unterminated expression: {0}")]
    UnterminatedExpression(String),

    /// Slot out of range, released, or from an older generation
    #[error("Invalid handle: {0}")]
    InvalidHandle(Slot),

    /// Nesting exceeded the configured depth
    #[error("Stack overflow: nesting exceeds {0} levels")]
    StackOverflow(usize),

    #[error("Arity mismatch: {name} expects {expected} argument(s), got {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    /// An argument expression evaluated to no value
    #[error("Expression produced no value")]
    NoValue,

    #[error("Index out of bounds: {0}")]
    IndexOutOfBounds(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl From<StrError> for VMError {
    fn from(err: StrError) -> Self {
        match err {
            StrError::OutOfRange { .. } => VMError::IndexOutOfBounds(err.to_string()),
            StrError::Unterminated(_)
            | StrError::Unbalanced(_)
            | StrError::Mismatched { .. } => VMError::UnterminatedExpression(err.to_string()),
        }
    }
}
