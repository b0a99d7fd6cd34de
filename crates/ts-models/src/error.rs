//! Engine error types

use thiserror::Error;

use ts_core::TermError;

/// Errors from stepwise selection and fitting
#[derive(Debug, Error)]
pub enum StepwiseError {
    /// Term-algebra error
    #[error("Term error: {0}")]
    Term(#[from] TermError),

    /// Enter/remove thresholds ordered inconsistently with the criterion's
    /// polarity, or not finite
    #[error(
        "Invalid thresholds for criterion '{criterion}': enter {enter} and remove {remove} \
         must satisfy {required}"
    )]
    InvalidThresholds {
        /// Criterion name
        criterion: String,
        /// Enter threshold
        enter: f64,
        /// Remove threshold
        remove: f64,
        /// Required ordering, e.g. "enter < remove"
        required: &'static str,
    },

    /// Invalid session configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Configuration error message
        message: String,
    },

    /// Numerical computation error
    #[error("Numerical error: {message} (operation: {operation})")]
    NumericalError {
        /// Error message
        message: String,
        /// Operation that failed
        operation: String,
    },

    /// Insufficient data for model fitting
    #[error("Not enough data: {n_samples} samples for {n_predictors} predictors")]
    InsufficientData {
        /// Number of samples
        n_samples: usize,
        /// Number of predictors
        n_predictors: usize,
    },

    /// Fit oracle failure for a specific term set
    ///
    /// External [`FitOracle`](crate::base::FitOracle) implementations
    /// report fit failures through this variant so the offending term set
    /// is named in the error.
    #[error("Fit failed for terms '{terms}': {message}")]
    FitFailed {
        /// Rendering of the term set being fitted
        terms: String,
        /// Underlying failure message
        message: String,
    },
}
