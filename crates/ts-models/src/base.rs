//! Core traits and types for model selection
//!
//! This module defines the seam between the stepwise engine and the model
//! fitting it drives: the engine only ever sees the scalar statistics of a
//! fitted model, never its coefficients.

use ndarray::Array2;

use ts_core::TermSet;

pub use statistics::FitStatistics;

pub use crate::error::StepwiseError;

pub mod statistics;

/// Result type for model operations
pub type Result<T> = std::result::Result<T, StepwiseError>;

/// External fitting interface consumed by the stepwise engine
///
/// Implementations must be deterministic: fitting the same term set twice
/// yields the same statistics. Fitting is synchronous; errors abort the
/// stepwise session that requested the fit.
pub trait FitOracle {
    /// Fit a model for the given term set and return its statistics
    fn fit(&self, terms: &TermSet) -> Result<FitStatistics>;

    /// Design-matrix columns for the given term set
    ///
    /// Used by the redundancy check to test candidate columns against the
    /// span of the current design without refitting.
    fn design_columns(&self, terms: &TermSet) -> Result<Array2<f64>>;
}
