//! Scalar statistics of a fitted model

use serde::{Deserialize, Serialize};

/// The fit statistics the selection criteria consume
///
/// For ordinary linear models `deviance` equals `sse` and the dispersion is
/// estimated from the residuals. Generalized linear model oracles report
/// the model deviance and whether the dispersion was estimated or is fixed
/// by the family, which decides between the F and chi-square deviance
/// tests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitStatistics {
    /// Number of observations
    pub n_obs: usize,
    /// Number of estimated coefficients
    pub n_coefficients: usize,
    /// Residual sum of squares
    pub sse: f64,
    /// Model deviance
    pub deviance: f64,
    /// Degrees of freedom for error
    pub dfe: f64,
    /// Dispersion (residual variance estimate for linear models)
    pub dispersion: f64,
    /// Whether the dispersion was estimated rather than fixed
    pub dispersion_estimated: bool,
    /// Log-likelihood
    pub log_likelihood: f64,
    /// Akaike information criterion
    pub aic: f64,
    /// Bayesian information criterion
    pub bic: f64,
    /// R-squared
    pub r_squared: f64,
    /// Adjusted R-squared
    pub adj_r_squared: f64,
}
