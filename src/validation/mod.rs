// src/validation/mod.rs

//! Numeric sanity checks for step-local quantities (gradients, S matrices,
//! update directions) before they reach the optimizer.

use crate::core::{Complex64, QsrError};
use nalgebra::DMatrix;

// Default tolerance values (can be overridden by caller)
const DEFAULT_HERMITIAN_TOLERANCE: f64 = 1e-9;
const DEFAULT_NORM_TOLERANCE: f64 = 1e-9;

/// Checks that every component of `values` is finite.
///
/// # Arguments
/// * `values` - The vector to check.
/// * `what` - Name used in the error message (e.g. `"gradient"`).
///
/// # Returns
/// * `Err(QsrError::Estimation)` naming the first non-finite component.
pub fn check_finite(values: &[Complex64], what: &str) -> Result<(), QsrError> {
    match values.iter().position(|v| !v.re.is_finite() || !v.im.is_finite()) {
        Some(pos) => Err(QsrError::Estimation {
            message: format!("{} component {} is not finite ({})", what, pos, values[pos]),
        }),
        None => Ok(()),
    }
}

/// Checks that `matrix` is square and equal to its conjugate transpose.
///
/// # Arguments
/// * `matrix` - The matrix to check.
/// * `tolerance` - Largest allowed `|A_ij - conj(A_ji)|`; defaults to 1e-9.
///
/// # Returns
/// * `Err(QsrError::Estimation)` on the first violating entry.
pub fn check_hermitian(matrix: &DMatrix<Complex64>, tolerance: Option<f64>) -> Result<(), QsrError> {
    let effective_tolerance = tolerance.unwrap_or(DEFAULT_HERMITIAN_TOLERANCE);
    if matrix.nrows() != matrix.ncols() {
        return Err(QsrError::Estimation {
            message: format!("S matrix is {}x{}, expected square", matrix.nrows(), matrix.ncols()),
        });
    }
    let n = matrix.nrows();
    for i in 0..n {
        for j in i..n {
            let deviation = (matrix[(i, j)] - matrix[(j, i)].conj()).norm();
            if !deviation.is_finite() || deviation > effective_tolerance {
                return Err(QsrError::Estimation {
                    message: format!("S matrix is not Hermitian at ({}, {}): deviation {:.3e}", i, j, deviation),
                });
            }
        }
    }
    Ok(())
}

/// Checks that probabilities sum to one, e.g. `|c_k|²` of a rotation row
/// made of unitary factors.
pub fn check_normalization(probabilities: &[f64], tolerance: Option<f64>) -> Result<(), QsrError> {
    let effective_tolerance = tolerance.unwrap_or(DEFAULT_NORM_TOLERANCE);
    let total: f64 = probabilities.iter().sum();
    if (total - 1.0).abs() > effective_tolerance {
        Err(QsrError::Estimation {
            message: format!("Probabilities sum to {} (Deviation > {})", total, effective_tolerance),
        })
    } else {
        Ok(())
    }
}

/// Euclidean norm of a complex vector.
pub fn l2_norm(values: &[Complex64]) -> f64 {
    values.iter().map(|v| v.norm_sqr()).sum::<f64>().sqrt()
}
