//! Selection criteria
//!
//! A criterion scores whether a single term is worth having in the model.
//! Scoring is always over a nested pair of fits, the model without the
//! term versus the model with it, so the same criterion serves both the
//! add and the remove direction of the stepwise search.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor};
use std::fmt;
use std::sync::Arc;

use crate::base::{FitStatistics, Result};
use crate::error::StepwiseError;

// ==================== Reports and polarity ====================

/// Direction in which a criterion's score improves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    /// Smaller scores are better (p-values, AIC/BIC deltas)
    SmallerBetter,
    /// Larger scores are better (R² deltas)
    LargerBetter,
}

/// Values reported to the history for one evaluated comparison
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StepReport {
    /// F-test on an SSE or deviance reduction
    FTest {
        /// F-statistic
        f: f64,
        /// Survival-function p-value
        p_value: f64,
    },
    /// Likelihood-ratio chi-square test on a deviance reduction
    ChiSquare {
        /// Chi-square statistic (NaN when the comparison is not nested)
        chi2: f64,
        /// Survival-function p-value
        p_value: f64,
    },
    /// Raw criterion difference, larger model minus smaller model
    Delta {
        /// Criterion delta
        delta: f64,
    },
}

/// User scoring closure over a nested `(smaller, larger)` fit pair
pub type ScoreFn = Arc<dyn Fn(&FitStatistics, &FitStatistics) -> f64 + Send + Sync>;

// ==================== Criterion ====================

/// Criterion kinds, resolved once at session configuration time
#[derive(Clone)]
pub enum Criterion {
    /// F-test on the residual sum of squares
    Sse,
    /// Deviance test: F when the dispersion is estimated, chi-square when
    /// the family fixes it
    Deviance,
    /// Akaike information criterion delta
    Aic,
    /// Bayesian information criterion delta
    Bic,
    /// R-squared delta
    RSquared,
    /// Adjusted R-squared delta
    AdjRSquared,
    /// User-supplied scoring function with explicit thresholds
    Custom {
        /// Name used in reports and errors
        name: String,
        /// Declared score polarity
        polarity: Polarity,
        /// Enter threshold
        enter: f64,
        /// Remove threshold
        remove: f64,
        /// Scoring closure over a nested `(smaller, larger)` fit pair
        score: ScoreFn,
    },
}

impl Criterion {
    /// Criterion name as used in reports and error messages
    pub fn name(&self) -> &str {
        match self {
            Criterion::Sse => "sse",
            Criterion::Deviance => "deviance",
            Criterion::Aic => "aic",
            Criterion::Bic => "bic",
            Criterion::RSquared => "rsquared",
            Criterion::AdjRSquared => "adjrsquared",
            Criterion::Custom { name, .. } => name,
        }
    }

    /// Score polarity
    pub fn polarity(&self) -> Polarity {
        match self {
            Criterion::Sse | Criterion::Deviance | Criterion::Aic | Criterion::Bic => {
                Polarity::SmallerBetter
            }
            Criterion::RSquared | Criterion::AdjRSquared => Polarity::LargerBetter,
            Criterion::Custom { polarity, .. } => *polarity,
        }
    }

    /// Default enter threshold
    pub fn default_enter(&self) -> f64 {
        match self {
            Criterion::Sse | Criterion::Deviance => 0.05,
            Criterion::Aic | Criterion::Bic => 0.0,
            Criterion::RSquared => 0.1,
            Criterion::AdjRSquared => 0.0,
            Criterion::Custom { enter, .. } => *enter,
        }
    }

    /// Default remove threshold
    pub fn default_remove(&self) -> f64 {
        match self {
            Criterion::Sse | Criterion::Deviance => 0.10,
            Criterion::Aic | Criterion::Bic => 0.01,
            Criterion::RSquared => 0.05,
            Criterion::AdjRSquared => -0.05,
            Criterion::Custom { remove, .. } => *remove,
        }
    }

    /// Validate a threshold pair against this criterion's polarity
    ///
    /// Enter and remove must be finite and ordered so that a term can never
    /// qualify for entry and removal at the same time: enter < remove for
    /// smaller-is-better criteria, enter > remove for larger-is-better.
    pub fn validate_thresholds(&self, enter: f64, remove: f64) -> Result<()> {
        if let Criterion::Custom { name, .. } = self {
            if name.is_empty() {
                return Err(StepwiseError::InvalidConfig {
                    message: "Custom criterion requires a non-empty name".to_string(),
                });
            }
        }

        let (ok, required) = match self.polarity() {
            Polarity::SmallerBetter => (enter < remove, "enter < remove"),
            Polarity::LargerBetter => (enter > remove, "enter > remove"),
        };

        if !enter.is_finite() || !remove.is_finite() || !ok {
            return Err(StepwiseError::InvalidThresholds {
                criterion: self.name().to_string(),
                enter,
                remove,
                required,
            });
        }
        Ok(())
    }

    /// Score the contribution of the terms distinguishing `larger` from
    /// `smaller`
    ///
    /// `smaller` is the nested model without the term under test, `larger`
    /// the model with it, regardless of search direction.
    pub fn score(
        &self,
        smaller: &FitStatistics,
        larger: &FitStatistics,
    ) -> Result<(f64, StepReport)> {
        match self {
            Criterion::Sse => f_test(smaller.sse, smaller.dfe, larger.sse, larger.dfe),
            Criterion::Deviance => {
                if larger.dispersion_estimated {
                    deviance_f_test(smaller, larger)
                } else {
                    chi_square_test(smaller, larger)
                }
            }
            Criterion::Aic => {
                let delta = larger.aic - smaller.aic;
                Ok((delta, StepReport::Delta { delta }))
            }
            Criterion::Bic => {
                let delta = larger.bic - smaller.bic;
                Ok((delta, StepReport::Delta { delta }))
            }
            Criterion::RSquared => {
                let delta = larger.r_squared - smaller.r_squared;
                Ok((delta, StepReport::Delta { delta }))
            }
            Criterion::AdjRSquared => {
                let delta = larger.adj_r_squared - smaller.adj_r_squared;
                Ok((delta, StepReport::Delta { delta }))
            }
            Criterion::Custom { score, .. } => {
                let delta = score(smaller, larger);
                Ok((delta, StepReport::Delta { delta }))
            }
        }
    }

    /// Whether `score` qualifies a candidate for entry
    pub fn qualifies_enter(&self, score: f64, enter: f64) -> bool {
        match self.polarity() {
            Polarity::SmallerBetter => score <= enter,
            Polarity::LargerBetter => score >= enter,
        }
    }

    /// Whether `score` qualifies a candidate for removal
    ///
    /// An undefined (NaN) score marks a non-nested comparison and always
    /// qualifies.
    pub fn qualifies_remove(&self, score: f64, remove: f64) -> bool {
        if score.is_nan() {
            return true;
        }
        match self.polarity() {
            Polarity::SmallerBetter => score >= remove,
            Polarity::LargerBetter => score <= remove,
        }
    }

    /// Whether add-candidate score `a` is strictly better than `b`
    ///
    /// NaN is never better than a defined score, so ties and undefined
    /// scores keep the first-encountered candidate.
    pub fn better_add(&self, a: f64, b: f64) -> bool {
        if a.is_nan() {
            return false;
        }
        if b.is_nan() {
            return true;
        }
        match self.polarity() {
            Polarity::SmallerBetter => a < b,
            Polarity::LargerBetter => a > b,
        }
    }

    /// Whether remove-candidate score `a` marks a strictly more removable
    /// term than `b` (the term whose absence hurts the model least)
    pub fn better_remove(&self, a: f64, b: f64) -> bool {
        if a.is_nan() {
            return false;
        }
        if b.is_nan() {
            return true;
        }
        match self.polarity() {
            Polarity::SmallerBetter => a > b,
            Polarity::LargerBetter => a < b,
        }
    }
}

impl fmt::Debug for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criterion::Sse => write!(f, "Sse"),
            Criterion::Deviance => write!(f, "Deviance"),
            Criterion::Aic => write!(f, "Aic"),
            Criterion::Bic => write!(f, "Bic"),
            Criterion::RSquared => write!(f, "RSquared"),
            Criterion::AdjRSquared => write!(f, "AdjRSquared"),
            Criterion::Custom {
                name,
                polarity,
                enter,
                remove,
                ..
            } => f
                .debug_struct("Custom")
                .field("name", name)
                .field("polarity", polarity)
                .field("enter", enter)
                .field("remove", remove)
                .finish_non_exhaustive(),
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ==================== Statistical tests ====================

/// F-test on an SSE reduction between nested models
fn f_test(sse0: f64, dfe0: f64, sse1: f64, dfe1: f64) -> Result<(f64, StepReport)> {
    let df_num = dfe0 - dfe1;
    if df_num <= 0.0 || dfe1 <= 0.0 {
        return Ok((
            f64::NAN,
            StepReport::FTest {
                f: f64::NAN,
                p_value: f64::NAN,
            },
        ));
    }

    let f = ((sse0 - sse1) / df_num) / (sse1 / dfe1);
    let p_value = fisher_survival(f, df_num, dfe1)?;
    Ok((p_value, StepReport::FTest { f, p_value }))
}

/// F-test on a deviance reduction, scaled by the larger model's dispersion
fn deviance_f_test(smaller: &FitStatistics, larger: &FitStatistics) -> Result<(f64, StepReport)> {
    let df_num = smaller.dfe - larger.dfe;
    if df_num <= 0.0 || larger.dfe <= 0.0 || larger.dispersion <= 0.0 {
        return Ok((
            f64::NAN,
            StepReport::FTest {
                f: f64::NAN,
                p_value: f64::NAN,
            },
        ));
    }

    let f = ((smaller.deviance - larger.deviance) / df_num) / larger.dispersion;
    let p_value = fisher_survival(f, df_num, larger.dfe)?;
    Ok((p_value, StepReport::FTest { f, p_value }))
}

/// Likelihood-ratio chi-square test on a deviance reduction
///
/// A zero degree-of-freedom difference marks a non-nested comparison; the
/// statistic and p-value are forced to NaN rather than comparing such
/// models, and the removal path treats NaN as maximal removal priority.
fn chi_square_test(smaller: &FitStatistics, larger: &FitStatistics) -> Result<(f64, StepReport)> {
    let df = smaller.dfe - larger.dfe;
    if df <= 0.0 {
        return Ok((
            f64::NAN,
            StepReport::ChiSquare {
                chi2: f64::NAN,
                p_value: f64::NAN,
            },
        ));
    }

    let chi2 = (smaller.deviance - larger.deviance).max(0.0);
    let dist = ChiSquared::new(df).map_err(|e| StepwiseError::NumericalError {
        message: format!("Failed to create chi-squared distribution: {}", e),
        operation: "chi_square_test".to_string(),
    })?;
    let p_value = (1.0 - dist.cdf(chi2)).clamp(0.0, 1.0);
    Ok((p_value, StepReport::ChiSquare { chi2, p_value }))
}

/// Survival function of the Fisher-Snedecor distribution
fn fisher_survival(f: f64, df_num: f64, df_den: f64) -> Result<f64> {
    let dist = FisherSnedecor::new(df_num, df_den).map_err(|e| StepwiseError::NumericalError {
        message: format!("Failed to create F-distribution: {}", e),
        operation: "fisher_survival".to_string(),
    })?;
    Ok((1.0 - dist.cdf(f.max(0.0))).clamp(0.0, 1.0))
}
