//! Crate-wide error types.

use thiserror::Error;

use crate::sql::literal::DataType;

/// Result type for query construction and rendering.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors that can occur while building or rendering queries.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Externally-supplied configuration is malformed (e.g. a partially
    /// specified foreign key, or an UPDATE whose join field is not selected
    /// by its source query).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Caller-supplied input names something that does not exist
    /// (e.g. an unknown criteria domain).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The query model reached an internally inconsistent state. These
    /// indicate a bug in the calling code, not bad user input.
    #[error("inconsistent query: {0}")]
    Inconsistency(String),

    /// A typed cell accessor was called with the wrong type.
    #[error("type mismatch: expected {expected}, found {actual}")]
    TypeMismatch {
        /// Type the accessor asked for.
        expected: DataType,
        /// Type the column actually carries.
        actual: DataType,
    },

    /// A named column does not exist in the result schema.
    #[error("column not found: {0}")]
    ColumnNotFound(String),
}
