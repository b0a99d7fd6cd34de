//! Least-squares fit oracle
//!
//! A minimal fitting backend for the stepwise engine: raw numeric
//! variables plus a response, with design columns built as products of
//! variable powers and coefficients estimated by SVD least squares.

use ndarray::{Array1, Array2};
use ndarray_linalg::LeastSquaresSvd;

use ts_core::TermSet;

use crate::base::{FitOracle, FitStatistics, Result};
use crate::error::StepwiseError;

/// Fit oracle estimating ordinary least squares over raw variables
#[derive(Debug, Clone)]
pub struct LeastSquaresOracle {
    variables: Array2<f64>,
    names: Vec<String>,
    response: Array1<f64>,
}

impl LeastSquaresOracle {
    /// Create an oracle from a variables matrix (one column per variable),
    /// variable names, and a response vector
    pub fn new(variables: Array2<f64>, names: &[&str], response: Array1<f64>) -> Result<Self> {
        if variables.nrows() != response.len() {
            return Err(StepwiseError::InvalidConfig {
                message: format!(
                    "Variables have {} rows but the response has {} entries",
                    variables.nrows(),
                    response.len()
                ),
            });
        }
        if variables.ncols() != names.len() {
            return Err(StepwiseError::InvalidConfig {
                message: format!(
                    "{} variable names for {} variable columns",
                    names.len(),
                    variables.ncols()
                ),
            });
        }

        Ok(Self {
            variables,
            names: names.iter().map(|s| s.to_string()).collect(),
            response,
        })
    }

    /// Variable names, one per column
    pub fn variable_names(&self) -> &[String] {
        &self.names
    }

    /// Number of observations
    pub fn n_obs(&self) -> usize {
        self.response.len()
    }

    fn check_terms(&self, terms: &TermSet) -> Result<()> {
        if terms.n_variables() != self.variables.ncols() {
            return Err(StepwiseError::InvalidConfig {
                message: format!(
                    "Term set over {} variables, oracle has {}",
                    terms.n_variables(),
                    self.variables.ncols()
                ),
            });
        }
        Ok(())
    }
}

impl FitOracle for LeastSquaresOracle {
    fn design_columns(&self, terms: &TermSet) -> Result<Array2<f64>> {
        self.check_terms(terms)?;

        let n = self.n_obs();
        let mut design = Array2::zeros((n, terms.n_terms()));
        for (j, term) in terms.iter().enumerate() {
            let mut column = Array1::from_elem(n, 1.0);
            for (v, &exponent) in term.exponents().iter().enumerate() {
                if exponent > 0 {
                    column.zip_mut_with(&self.variables.column(v), |c, &x| {
                        *c *= x.powi(exponent as i32)
                    });
                }
            }
            design.column_mut(j).assign(&column);
        }
        Ok(design)
    }

    fn fit(&self, terms: &TermSet) -> Result<FitStatistics> {
        let design = self.design_columns(terms)?;
        let n = design.nrows();
        let p = design.ncols();

        if n <= p {
            return Err(StepwiseError::InsufficientData {
                n_samples: n,
                n_predictors: p,
            });
        }

        let residuals = if p == 0 {
            self.response.clone()
        } else {
            let solution = design
                .least_squares(&self.response)
                .map_err(|e| StepwiseError::NumericalError {
                    message: format!("SVD least squares failed: {}", e),
                    operation: "fit".to_string(),
                })?
                .solution;
            &self.response - &design.dot(&solution)
        };

        let sse = residuals.mapv(|r| r * r).sum();
        let mean = self.response.mean().unwrap_or(0.0);
        let tss = self.response.mapv(|y| (y - mean) * (y - mean)).sum();

        let nf = n as f64;
        let pf = p as f64;
        let dfe = nf - pf;
        let dispersion = if dfe > 0.0 { sse / dfe } else { f64::NAN };

        let r_squared = if tss > 0.0 { 1.0 - sse / tss } else { 0.0 };
        let adj_r_squared = if dfe > 0.0 {
            1.0 - (1.0 - r_squared) * ((nf - 1.0) / dfe)
        } else {
            f64::NAN
        };

        // Gaussian log-likelihood at the MLE variance sse/n.
        let sigma2 = (sse / nf).max(f64::MIN_POSITIVE);
        let log_likelihood =
            -0.5 * nf * (2.0 * std::f64::consts::PI * sigma2).ln() - 0.5 * sse / sigma2;
        let aic = 2.0 * pf - 2.0 * log_likelihood;
        let bic = nf.ln() * pf - 2.0 * log_likelihood;

        Ok(FitStatistics {
            n_obs: n,
            n_coefficients: p,
            sse,
            deviance: sse,
            dfe,
            dispersion,
            dispersion_estimated: true,
            log_likelihood,
            aic,
            bic,
            r_squared,
            adj_r_squared,
        })
    }
}
