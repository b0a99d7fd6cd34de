//! Stepwise term-selection engine for regression models
//!
//! This crate drives a greedy forward/backward search over polynomial and
//! interaction term sets. Candidate generation respects hierarchy
//! constraints (from `ts-core`), degenerate candidates are skipped via a
//! QR-based redundancy check, and adds/removes are judged by pluggable
//! statistical criteria (F-test, chi-square, AIC/BIC, R²). Fitting itself
//! is behind the [`base::FitOracle`] seam; a least-squares oracle is
//! provided.

pub mod base;
pub mod error;
pub mod stepwise;

pub use base::{FitOracle, FitStatistics, Result};
pub use error::StepwiseError;
pub use stepwise::{
    Bounds, Criterion, History, HistoryEntry, LeastSquaresOracle, Stepwise, StepwiseConfig,
};
