// src/solver/direct.rs

//! Dense direct solves of the shifted SR system.

use super::SolveReport;
use crate::core::{Complex64, QsrError};
use nalgebra::{DMatrix, DVector};

/// Pivots at or below this fraction of the largest diagonal entry count as
/// zero.
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Solves `a x = b` by Cholesky factorization.
///
/// The complex factorization takes square roots of negative pivots instead of
/// failing, so every diagonal entry of the factor is checked afterwards.
///
/// # Returns
/// * `Err(QsrError::Solver)` if `a` is not positive-definite.
pub fn cholesky_solve(a: DMatrix<Complex64>, b: &[Complex64]) -> Result<Vec<Complex64>, QsrError> {
    let scale = a.diagonal().iter().fold(0.0_f64, |m, d| m.max(d.re.abs()));
    let rhs = DVector::from_column_slice(b);
    let factor = a.cholesky().ok_or_else(|| QsrError::Solver {
        message: "Shifted S matrix is not positive-definite; Cholesky factorization failed".to_string(),
    })?;
    if let Some((k, l)) = factor.l_dirty().diagonal().iter().enumerate().find(|(_, l)| !is_positive_pivot(**l, scale)) {
        return Err(QsrError::Solver {
            message: format!("Shifted S matrix is not positive-definite; Cholesky pivot {} is {}", k, l * l),
        });
    }
    Ok(factor.solve(&rhs).iter().copied().collect())
}

/// `l` is a diagonal entry of the factor, so the pivot is `l²`.
fn is_positive_pivot(l: Complex64, scale: f64) -> bool {
    l.re.is_finite()
        && l.im.is_finite()
        && l.re > 0.0
        && l.im.abs() <= PIVOT_TOLERANCE.sqrt() * l.re
        && l.re * l.re > PIVOT_TOLERANCE * scale
}

/// Solves `a x = b` by column-pivoted QR.
///
/// # Returns
/// * `Err(QsrError::Solver)` if `a` is singular.
pub fn qr_solve(a: DMatrix<Complex64>, b: &[Complex64]) -> Result<Vec<Complex64>, QsrError> {
    let rhs = DVector::from_column_slice(b);
    let x = a.col_piv_qr().solve(&rhs).ok_or_else(|| QsrError::Solver {
        message: "Shifted S matrix is singular; QR solve failed".to_string(),
    })?;
    Ok(x.iter().copied().collect())
}

/// Packages a direct solution with its residual norm.
pub(crate) fn finish(a: &DMatrix<Complex64>, b: &[Complex64], x: Vec<Complex64>) -> SolveReport {
    let residual = (DVector::from_column_slice(b) - a * DVector::from_column_slice(&x)).norm();
    SolveReport { direction: x, converged: true, iterations: 0, residual }
}
