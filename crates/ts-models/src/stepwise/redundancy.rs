//! QR-based redundancy detection
//!
//! A candidate term whose design column lies in the span of the current
//! design cannot improve the fit; detecting that from the orthonormal
//! basis of the current design is far cheaper than refitting with the
//! candidate included.

use ndarray::{Array2, ArrayView2};
use ndarray_linalg::QR;

use crate::base::Result;
use crate::error::StepwiseError;

/// Orthonormal basis (thin Q) of a design matrix
pub fn orthonormal_basis(design: &Array2<f64>) -> Result<Array2<f64>> {
    let (q, _r) = design.qr().map_err(|e| StepwiseError::NumericalError {
        message: format!("QR decomposition failed: {}", e),
        operation: "orthonormal_basis".to_string(),
    })?;
    Ok(q)
}

/// Whether candidate columns are numerically within the span of `q`
///
/// Projects the candidate columns onto the orthogonal complement of `q` and
/// compares the squared residual norm against the squared candidate norm:
/// redundant iff the ratio drops below `EPS^(3/4) · k · √n`, with `k` basis
/// columns and `n` rows. Scale-invariant; an all-zero candidate counts as
/// redundant.
pub fn is_redundant(q: ArrayView2<'_, f64>, candidate: ArrayView2<'_, f64>) -> bool {
    let total: f64 = candidate.iter().map(|&v| v * v).sum();
    if total == 0.0 {
        return true;
    }

    let coefficients = q.t().dot(&candidate);
    let projected = q.dot(&coefficients);
    let residual: f64 = candidate
        .iter()
        .zip(projected.iter())
        .map(|(&c, &p)| (c - p) * (c - p))
        .sum();

    let tolerance = f64::EPSILON.powf(0.75) * q.ncols() as f64 * (q.nrows() as f64).sqrt();
    residual / total < tolerance
}
