// src/lib.rs

//! `qsr` - Quantum state reconstruction from measurement data
//!
//! This library trains a parameterized wavefunction to reproduce bitstring
//! outcomes recorded in several measurement bases. The data (positive)
//! phase and the model (negative) phase of the likelihood gradient are
//! estimated every step, optionally preconditioned by stochastic
//! reconfiguration, and handed to an optimizer.

pub mod core;
pub mod config;
pub mod traits;
pub mod operator;
pub mod estimator;
pub mod solver;
pub mod likelihood;
pub mod observables;
pub mod optimizer;
pub mod driver;
pub mod validation;

#[cfg(test)]
mod fixtures;

// Re-export the most common types for easier top-level use
pub use crate::core::{BasisIndex, Complex64, MeasurementRecord, QsrError, StepIndex, TrainingCorpus};
pub use config::{Method, QsrConfig, SolverFailurePolicy};
pub use traits::{Connection, Operator, Optimizer, Sampler, WaveFunction};
pub use operator::{BasisSet, LocalBasis, LocalOperator, LocalRotation, LocalStates};
pub use estimator::{GradientEstimate, MinibatchSampler, PhaseEstimator};
pub use solver::{SolveReport, SolverStrategy, SrSolver};
pub use likelihood::negative_log_likelihood;
pub use observables::{ObservableManager, Stats};
pub use optimizer::{AdaMax, Momentum, Sgd};
pub use driver::{Qsr, QsrIter, SolveOutcome, StepReport};
pub use validation::{check_finite, check_hermitian, check_normalization};

// Example 1: Rotating a measurement record
// A site measured in the X basis is a coherent sum over both computational
// values of that site, weighted by the Hadamard row of the outcome.
/// ```
/// use qsr::{BasisIndex, BasisSet, LocalRotation, QsrError};
///
/// # fn main() -> Result<(), QsrError> {
/// let bases = BasisSet::new().with("ZX".parse::<LocalRotation>()?);
///
/// // Outcome 1 on site 1 in X: (|σ0 0> - |σ0 1>) / √2
/// let connections = bases.rotate(&[0.0, 1.0], BasisIndex::Rotated(0))?;
/// assert_eq!(connections.len(), 2);
/// assert_eq!(connections[0].config, vec![0.0, 0.0]);
/// assert_eq!(connections[1].config, vec![0.0, 1.0]);
/// assert!(connections[1].coefficient.re < 0.0);
///
/// // The computational basis leaves the sample alone.
/// let unrotated = bases.rotate(&[0.0, 1.0], BasisIndex::Computational)?;
/// assert_eq!(unrotated.len(), 1);
/// # Ok(())
/// # }
/// ```
#[doc(hidden)]
const _: () = (); // Attaches the preceding doc comment block to a hidden item

// Example 2: Negative log-likelihood of a one-site model
// ψ(σ) = exp(a σ), so |ψ(1)|² / Z = e^{2a} / (1 + e^{2a}).
/// ```
/// use qsr::{negative_log_likelihood, BasisIndex, BasisSet, Complex64, QsrError, WaveFunction};
///
/// struct OneSite(Complex64);
///
/// impl WaveFunction for OneSite {
///     fn n_params(&self) -> usize { 1 }
///     fn n_sites(&self) -> usize { 1 }
///     fn log_value(&self, config: &[f64]) -> Complex64 { self.0 * config[0] }
///     fn log_derivative(&self, config: &[f64]) -> Vec<Complex64> { vec![Complex64::new(config[0], 0.0)] }
///     fn log_norm(&self) -> Result<f64, QsrError> { Ok((1.0 + (2.0 * self.0.re).exp()).ln()) }
///     fn parameters(&self) -> Vec<Complex64> { vec![self.0] }
///     fn set_parameters(&mut self, params: &[Complex64]) -> Result<(), QsrError> {
///         self.0 = params[0];
///         Ok(())
///     }
/// }
///
/// # fn main() -> Result<(), QsrError> {
/// let a: f64 = 0.5;
/// let model = OneSite(Complex64::new(a, 0.0));
/// let nll = negative_log_likelihood(&model, &BasisSet::new(), &[vec![1.0]], &[BasisIndex::Computational])?;
/// let expected = -((2.0 * a).exp() / (1.0 + (2.0 * a).exp())).ln();
/// assert!((nll - expected).abs() < 1e-12);
/// # Ok(())
/// # }
/// ```
#[doc(hidden)]
const _: () = (); // Attaches the preceding doc comment block to a hidden item
