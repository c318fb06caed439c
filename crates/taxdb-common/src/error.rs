//! Error types for taxdump parsing

use thiserror::Error;

/// Result type alias for dump parsing operations
pub type Result<T> = std::result::Result<T, DumpError>;

/// Errors raised while reading taxdump records
#[derive(Error, Debug)]
pub enum DumpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed record at line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Malformed record at line {line}: column '{column}' requires a value")]
    MissingValue { line: usize, column: String },
}

impl DumpError {
    /// Line number of the offending record, if the error is record-scoped
    pub fn line(&self) -> Option<usize> {
        match self {
            DumpError::Io(_) => None,
            DumpError::FieldCount { line, .. } | DumpError::MissingValue { line, .. } => {
                Some(*line)
            },
        }
    }
}
