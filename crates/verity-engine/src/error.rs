//! Engine error types

use thiserror::Error;
use verity_core::CoreError;
use verity_formula::FormulaError;

/// Result type for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while loading rules or applying them to a table.
/// Per-rule errors are caught by the evaluation pass and folded into that
/// rule's result; they never abort the pass.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Rule source is missing required columns
    #[error("rules source is missing required columns: {0:?}")]
    MissingRuleColumns(Vec<String>),

    /// Unrecognized rule kind in the rule source
    #[error("unsupported rule type: {0}")]
    UnknownRuleKind(String),

    /// Rule references columns absent from the input table
    #[error("columns {0:?} not found in table")]
    MissingColumn(Vec<String>),

    /// Regex-kind rule with an unparseable pattern
    #[error("invalid regex pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    /// Format-kind rule with an unrecognized specification
    #[error("invalid format specification: {0}")]
    InvalidFormatSpec(String),

    /// CustomFunction-kind rule naming an unregistered function
    #[error("custom function '{0}' is not registered")]
    MissingCustomFunction(String),

    /// A custom predicate failed while executing
    #[error("custom function failed: {0}")]
    CustomFunction(String),

    /// Loading a custom-function provider failed; only that provider's
    /// registration is aborted
    #[error("failed to load custom function provider '{provider}': {reason}")]
    Registration { provider: String, reason: String },

    /// Compilation or evaluation error from the formula engine
    #[error(transparent)]
    Formula(#[from] FormulaError),

    /// Table-level error
    #[error(transparent)]
    Core(#[from] CoreError),

    /// I/O error reading or writing an external resource
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// CSV-level error in a rule source, data table or result sink
    #[error(transparent)]
    Csv(#[from] csv::Error),
}
