//! Core error types

use thiserror::Error;

/// Result type for table operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Errors that can occur while building or slicing tables
#[derive(Debug, Error)]
pub enum CoreError {
    /// Referenced column does not exist
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// Two columns share the same name
    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),

    /// Column lengths disagree
    #[error("column length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}
