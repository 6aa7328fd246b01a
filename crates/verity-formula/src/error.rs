//! Formula error types

use thiserror::Error;
use verity_core::CoreError;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula parsing, compilation or evaluation
#[derive(Debug, Error)]
pub enum FormulaError {
    /// Formula parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Expression evaluation error
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// DATEDIF unit outside {d, m, y}
    #[error("Unsupported DATEDIF unit: {0}")]
    UnsupportedUnit(String),

    /// Function invoked at evaluation time without an implementation
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Referenced column does not exist in the table
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Operand types do not fit the operation
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Registration with an empty function name
    #[error("Function name must not be empty")]
    EmptyFunctionName,

    /// Broken compiler invariant; a defect, not a user error
    #[error("Internal compiler error: {0}")]
    Internal(String),

    /// Table-level error surfaced during evaluation
    #[error(transparent)]
    Core(#[from] CoreError),
}
