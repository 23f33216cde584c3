// src/solver/mod.rs

//! Regularized stochastic-reconfiguration solve `(S + diag_shift·I) x = g`.
//!
//! The strategy (Cholesky, column-pivoted QR or conjugate gradient) is picked
//! once from the configuration and kept for the lifetime of the engine.

pub mod cg;
pub mod direct;

use crate::config::QsrConfig;
use crate::core::{Complex64, QsrError};
use crate::validation::check_finite;
use nalgebra::DMatrix;
use std::fmt;
use tracing::debug;

/// How the shifted SR system is solved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SolverStrategy {
    /// Cholesky factorization. Fails if the shifted matrix is not positive-definite.
    Cholesky,
    /// Column-pivoted QR. Fails only on an exactly singular system.
    Qr,
    /// Conjugate gradient, stopping at `tolerance · ||g||` or after
    /// `max_iterations` (0 means the system dimension).
    ConjugateGradient { tolerance: f64, max_iterations: usize },
}

impl SolverStrategy {
    /// Resolves `use_iterative` / `use_cholesky` / CG settings.
    pub fn from_config(config: &QsrConfig) -> Self {
        if config.use_iterative {
            SolverStrategy::ConjugateGradient {
                tolerance: config.cg_tolerance,
                max_iterations: config.cg_max_iterations,
            }
        } else if config.use_cholesky {
            SolverStrategy::Cholesky
        } else {
            SolverStrategy::Qr
        }
    }

    /// True for the Krylov strategy.
    pub fn is_iterative(&self) -> bool {
        matches!(self, SolverStrategy::ConjugateGradient { .. })
    }
}

impl fmt::Display for SolverStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverStrategy::Cholesky => write!(f, "Cholesky"),
            SolverStrategy::Qr => write!(f, "ColPivQR"),
            SolverStrategy::ConjugateGradient { tolerance, max_iterations } => {
                write!(f, "CG(tol={:.1e}, max_iter={})", tolerance, max_iterations)
            }
        }
    }
}

/// Outcome of one SR solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveReport {
    /// The update direction `x`.
    pub direction: Vec<Complex64>,
    /// False when the iterative solve hit its cap. Direct solves always converge or fail.
    pub converged: bool,
    /// Krylov iterations used; 0 for direct solves.
    pub iterations: usize,
    /// `||g - S' x||` of the returned direction.
    pub residual: f64,
}

/// Solves the regularized SR system with a fixed strategy and shift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SrSolver {
    strategy: SolverStrategy,
    diag_shift: f64,
}

impl SrSolver {
    pub fn new(strategy: SolverStrategy, diag_shift: f64) -> Self {
        Self { strategy, diag_shift }
    }

    pub fn from_config(config: &QsrConfig) -> Self {
        Self::new(SolverStrategy::from_config(config), config.diag_shift)
    }

    pub fn strategy(&self) -> SolverStrategy {
        self.strategy
    }

    pub fn diag_shift(&self) -> f64 {
        self.diag_shift
    }

    /// Solves `(S + diag_shift·I) x = g`.
    ///
    /// # Arguments
    /// * `s` - The (Hermitian, possibly singular) log-derivative covariance.
    /// * `g` - Right-hand side, one entry per parameter.
    ///
    /// # Returns
    /// * `Err(QsrError::Solver)` if the dimensions disagree, a direct
    ///   factorization fails or the result is not finite.
    /// * `Ok(report)` with `converged == false` when CG ran out of iterations.
    pub fn solve(&self, s: &DMatrix<Complex64>, g: &[Complex64]) -> Result<SolveReport, QsrError> {
        let n = g.len();
        if s.nrows() != n || s.ncols() != n {
            return Err(QsrError::Solver {
                message: format!("S is {}x{} but the gradient has {} entries", s.nrows(), s.ncols(), n),
            });
        }

        let mut shifted = s.clone();
        for i in 0..n {
            shifted[(i, i)] += Complex64::new(self.diag_shift, 0.0);
        }

        let report = match self.strategy {
            SolverStrategy::Cholesky => direct::finish(&shifted, g, direct::cholesky_solve(shifted.clone(), g)?),
            SolverStrategy::Qr => direct::finish(&shifted, g, direct::qr_solve(shifted.clone(), g)?),
            SolverStrategy::ConjugateGradient { tolerance, max_iterations } => {
                let cap = if max_iterations == 0 { n } else { max_iterations };
                cg::solve(&shifted, g, tolerance, cap)?
            }
        };

        check_finite(&report.direction, "SR direction").map_err(|e| QsrError::Solver { message: e.to_string() })?;
        debug!(
            strategy = %self.strategy,
            n,
            converged = report.converged,
            iterations = report.iterations,
            residual = report.residual,
            "SR system solved"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::l2_norm;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    /// Hermitian positive semi-definite 3x3 with complex off-diagonals.
    fn sample_s() -> DMatrix<Complex64> {
        DMatrix::from_row_slice(
            3,
            3,
            &[
                c(2.0, 0.0), c(0.5, 0.3), c(0.1, -0.2),
                c(0.5, -0.3), c(1.5, 0.0), c(0.0, 0.4),
                c(0.1, 0.2), c(0.0, -0.4), c(1.0, 0.0),
            ],
        )
    }

    fn sample_g() -> Vec<Complex64> {
        vec![c(1.0, 0.5), c(-0.3, 0.0), c(0.2, -0.7)]
    }

    fn max_diff(a: &[Complex64], b: &[Complex64]) -> f64 {
        a.iter().zip(b).map(|(x, y)| (x - y).norm()).fold(0.0, f64::max)
    }

    #[test]
    fn test_strategy_from_config() {
        let config = QsrConfig::new(1, 1);
        assert_eq!(SolverStrategy::from_config(&config), SolverStrategy::Cholesky);
        assert_eq!(SolverStrategy::from_config(&config.clone().with_cholesky(false)), SolverStrategy::Qr);
        let iterative = config.with_iterative(true).with_cg(1e-6, 7);
        assert_eq!(
            SolverStrategy::from_config(&iterative),
            SolverStrategy::ConjugateGradient { tolerance: 1e-6, max_iterations: 7 }
        );
    }

    #[test]
    fn test_direct_and_iterative_agree() -> Result<(), QsrError> {
        let (s, g) = (sample_s(), sample_g());
        let chol = SrSolver::new(SolverStrategy::Cholesky, 0.01).solve(&s, &g)?;
        let qr = SrSolver::new(SolverStrategy::Qr, 0.01).solve(&s, &g)?;
        let cg = SrSolver::new(SolverStrategy::ConjugateGradient { tolerance: 1e-10, max_iterations: 50 }, 0.01).solve(&s, &g)?;

        assert!(cg.converged);
        assert!(max_diff(&chol.direction, &qr.direction) < 1e-10);
        assert!(max_diff(&chol.direction, &cg.direction) < 1e-8);
        assert!(chol.residual < 1e-10);
        Ok(())
    }

    #[test]
    fn test_large_shift_gives_scaled_gradient() -> Result<(), QsrError> {
        let shift = 1e8;
        let g = sample_g();
        let report = SrSolver::new(SolverStrategy::Cholesky, shift).solve(&sample_s(), &g)?;
        let scaled: Vec<Complex64> = report.direction.iter().map(|x| *x * shift).collect();
        assert!(max_diff(&scaled, &g) / l2_norm(&g) < 1e-6);
        Ok(())
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let s = DMatrix::from_row_slice(2, 2, &[c(-1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0), c(1.0, 0.0)]);
        let err = SrSolver::new(SolverStrategy::Cholesky, 0.0).solve(&s, &[c(1.0, 0.0), c(1.0, 0.0)]).unwrap_err();
        assert!(matches!(err, QsrError::Solver { .. }), "got {:?}", err);
    }

    #[test]
    fn test_qr_rejects_singular() {
        let s = DMatrix::from_element(2, 2, c(0.0, 0.0));
        let err = SrSolver::new(SolverStrategy::Qr, 0.0).solve(&s, &[c(1.0, 0.0), c(1.0, 0.0)]).unwrap_err();
        assert!(matches!(err, QsrError::Solver { .. }), "got {:?}", err);
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = SrSolver::new(SolverStrategy::Cholesky, 0.01).solve(&sample_s(), &[c(1.0, 0.0)]).unwrap_err();
        assert!(matches!(err, QsrError::Solver { .. }));
    }

    #[test]
    fn test_cg_cap_reports_nonconvergence() -> Result<(), QsrError> {
        let solver = SrSolver::new(SolverStrategy::ConjugateGradient { tolerance: 1e-14, max_iterations: 1 }, 0.01);
        let report = solver.solve(&sample_s(), &sample_g())?;
        assert!(!report.converged);
        assert_eq!(report.iterations, 1);
        assert!(report.direction.iter().all(|x| x.re.is_finite() && x.im.is_finite()));
        Ok(())
    }
}
