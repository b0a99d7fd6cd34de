//! Term-algebra error types

use thiserror::Error;

/// Errors from term and term-set construction and combination
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TermError {
    /// Terms or term sets defined over different variable counts
    #[error("Variable count mismatch: expected {expected} variables, got {actual}")]
    VariableMismatch {
        /// Variable count of the receiver
        expected: usize,
        /// Variable count of the argument
        actual: usize,
    },

    /// Rows of unequal width passed to a term-set constructor
    #[error("Term row {row} has {actual} entries, expected {expected}")]
    RaggedRows {
        /// Offending row index
        row: usize,
        /// Width of the first row
        expected: usize,
        /// Width of the offending row
        actual: usize,
    },

    /// Term index outside the term set
    #[error("Term index {index} out of range for a set of {len} terms")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of terms in the set
        len: usize,
    },
}
