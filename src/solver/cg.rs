// src/solver/cg.rs

//! Conjugate gradient for Hermitian positive-definite systems.
//!
//! ```text
//! r = b, p = r, rr = <r, r>
//! for k in 0..max_iterations:
//!     Ap    = A p
//!     alpha = rr / <p, Ap>
//!     x     = x + alpha p
//!     r     = r - alpha Ap
//!     if ||r|| < tolerance * ||b||: converged
//!     beta  = <r, r> / rr
//!     p     = r + beta p
//! ```
//!
//! Running out of iterations is not an error: the last iterate is returned
//! with `converged == false`.

use super::SolveReport;
use crate::core::{Complex64, QsrError};
use nalgebra::DMatrix;
use num_traits::Zero;
use tracing::{debug, trace, warn};

/// `<a, b> = Σ conj(a_i) b_i`.
#[inline]
fn dot(a: &[Complex64], b: &[Complex64]) -> Complex64 {
    a.iter().zip(b).map(|(x, y)| x.conj() * y).sum()
}

/// `y += alpha * x`.
#[inline]
fn axpy(alpha: Complex64, x: &[Complex64], y: &mut [Complex64]) {
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi += alpha * xi;
    }
}

#[inline]
fn norm2(x: &[Complex64]) -> f64 {
    x.iter().map(|v| v.norm_sqr()).sum::<f64>().sqrt()
}

/// `out = a x`.
fn matvec(a: &DMatrix<Complex64>, x: &[Complex64], out: &mut [Complex64]) {
    for (i, o) in out.iter_mut().enumerate() {
        *o = (0..x.len()).map(|j| a[(i, j)] * x[j]).sum();
    }
}

/// Solves `a x = b` starting from `x = 0`.
///
/// # Returns
/// * `Err(QsrError::Solver)` on non-positive curvature `<p, Ap> <= 0`
///   (the matrix is not positive-definite).
pub fn solve(a: &DMatrix<Complex64>, b: &[Complex64], tolerance: f64, max_iterations: usize) -> Result<SolveReport, QsrError> {
    let n = b.len();
    let mut x = vec![Complex64::zero(); n];
    let b_norm = norm2(b);

    if b_norm < f64::EPSILON {
        debug!("CG: zero right-hand side, returning zero direction");
        return Ok(SolveReport { direction: x, converged: true, iterations: 0, residual: 0.0 });
    }

    let mut r = b.to_vec();
    let mut p = r.clone();
    let mut ap = vec![Complex64::zero(); n];
    let mut rr = dot(&r, &r).re;
    let abs_tolerance = tolerance * b_norm;
    let mut r_norm = b_norm;
    let mut iterations = 0;

    for k in 0..max_iterations {
        matvec(a, &p, &mut ap);
        let curvature = dot(&p, &ap).re;
        if curvature <= 0.0 {
            warn!(iteration = k, curvature, "CG: non-positive curvature");
            return Err(QsrError::Solver {
                message: format!("CG breakdown at iteration {}: <p, Ap> = {:.3e}; shifted S is not positive-definite", k, curvature),
            });
        }

        let alpha = Complex64::new(rr / curvature, 0.0);
        axpy(alpha, &p, &mut x);
        axpy(-alpha, &ap, &mut r);
        iterations = k + 1;

        let rr_new = dot(&r, &r).re;
        r_norm = rr_new.sqrt();
        trace!(iteration = k, residual = r_norm, relative = r_norm / b_norm, "CG iteration");
        if r_norm < abs_tolerance {
            debug!(iterations, residual = r_norm, "CG converged");
            return Ok(SolveReport { direction: x, converged: true, iterations, residual: r_norm });
        }

        let beta = rr_new / rr;
        for (pi, ri) in p.iter_mut().zip(&r) {
            *pi = ri + *pi * beta;
        }
        rr = rr_new;
    }

    warn!(iterations, residual = r_norm, tolerance = abs_tolerance, "CG did not converge; using best available direction");
    Ok(SolveReport { direction: x, converged: false, iterations, residual: r_norm })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_is_conjugate_linear_in_first_argument() {
        let a = [Complex64::new(0.0, 1.0)];
        let b = [Complex64::new(0.0, 1.0)];
        assert_eq!(dot(&a, &b), Complex64::new(1.0, 0.0));
    }

    #[test]
    fn test_identity_converges_in_one_iteration() -> Result<(), QsrError> {
        let a = DMatrix::<Complex64>::identity(3, 3);
        let b = vec![Complex64::new(1.0, 2.0), Complex64::new(-1.0, 0.0), Complex64::new(0.0, 3.0)];
        let report = solve(&a, &b, 1e-12, 10)?;
        assert!(report.converged);
        assert_eq!(report.iterations, 1);
        for (x, y) in report.direction.iter().zip(&b) {
            assert!((x - y).norm() < 1e-12);
        }
        Ok(())
    }

    #[test]
    fn test_zero_rhs() -> Result<(), QsrError> {
        let a = DMatrix::<Complex64>::identity(2, 2);
        let report = solve(&a, &[Complex64::zero(); 2], 1e-6, 10)?;
        assert!(report.converged);
        assert_eq!(report.iterations, 0);
        assert!(report.direction.iter().all(|x| x.is_zero()));
        Ok(())
    }

    #[test]
    fn test_negative_definite_breaks_down() {
        let a = -DMatrix::<Complex64>::identity(2, 2);
        let err = solve(&a, &[Complex64::new(1.0, 0.0); 2], 1e-6, 10).unwrap_err();
        assert!(matches!(err, QsrError::Solver { .. }));
    }
}
