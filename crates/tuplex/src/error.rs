//! Error types for tuplex operations

use thiserror::Error;

/// Main error type for structural and programmer errors.
///
/// Expected runtime conditions (division by zero and friends) never show up
/// here: actions report them in-band with [`Signal::Raise`](crate::Signal).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TuplexError {
    /// A value of one type was used where another type was required
    #[error("Incompatible type: expected {expected}, got {got}")]
    IncompatibleType {
        /// Expected type
        expected: String,
        /// Actual type received
        got: String,
    },

    /// The tuple's permissions (or its kind) forbid the operation
    #[error("Access denied: cannot {operation} in {kind} tuple")]
    AccessDenied {
        /// What was attempted (`add`, `remove`, `modify`, ...)
        operation: String,
        /// Kind tag of the tuple that refused
        kind: String,
    },

    /// Typed access with a native type that does not match the cell's type
    #[error("Wrong type: cannot access {actual} as {requested}")]
    WrongType {
        /// Native type that was requested
        requested: String,
        /// Logical type of the cell
        actual: String,
    },

    /// Missing attribute, type, tuple or action
    #[error("Not found: {0}")]
    NotFound(String),

    /// A name that must be unique was registered twice
    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    /// Parsing finished with at least one reported error
    #[error("Invalid expression: {}", errors.join("; "))]
    InvalidExpression {
        /// Every error message forwarded to the diagnostics sink
        errors: Vec<String>,
    },

    /// An action popped more values than were pushed
    #[error("Stack underflow in action `{action}`")]
    StackUnderflow {
        /// Name of the offending action
        action: String,
    },

    /// Nesting limit from [`EvalContext`](crate::EvalContext) exceeded
    #[error("Nesting depth {depth} exceeds limit {max}")]
    DepthExceeded {
        /// Depth reached
        depth: usize,
        /// Configured limit
        max: usize,
    },
}

impl TuplexError {
    /// Shorthand for an [`AccessDenied`](TuplexError::AccessDenied) error.
    pub fn access_denied(operation: impl Into<String>, kind: impl Into<String>) -> Self {
        TuplexError::AccessDenied {
            operation: operation.into(),
            kind: kind.into(),
        }
    }

    /// Shorthand for a [`NotFound`](TuplexError::NotFound) error.
    pub fn not_found(what: impl Into<String>) -> Self {
        TuplexError::NotFound(what.into())
    }
}

/// Result type alias for tuplex operations
pub type Result<T> = std::result::Result<T, TuplexError>;
