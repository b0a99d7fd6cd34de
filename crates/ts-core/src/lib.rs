//! Core term algebra for TermStep
//!
//! This crate defines polynomial/interaction terms as rows of non-negative
//! integer exponents, ordered collections of such terms, the canonical term
//! ordering, and the hierarchy-constrained candidate filters used by the
//! stepwise selection engine in `ts-models`.

pub mod error;
pub mod term;

pub use error::TermError;
pub use term::{Term, TermSet, candidates_to_add, candidates_to_remove, sort_terms};

/// Result type for term-algebra operations
pub type Result<T> = std::result::Result<T, TermError>;
