// src/config/mod.rs

//! Constructor-time configuration of a reconstruction run.
//!
//! Everything here is validated once when the engine is built and is
//! immutable afterwards.

use crate::core::qsr_defaults::{AUTO_DISCARD_FRACTION, CG_TOLERANCE, DIAG_SHIFT};
use crate::core::QsrError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the parameter-update direction is derived from the gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Method {
    /// Plain gradient: the optimizer receives the NLL gradient directly.
    #[default]
    Gd,
    /// Stochastic reconfiguration: the gradient is preconditioned by the
    /// regularized log-derivative covariance `S`.
    Sr,
}

impl Method {
    /// True when the method needs the S matrix.
    pub fn needs_s_matrix(&self) -> bool {
        matches!(self, Method::Sr)
    }
}

impl FromStr for Method {
    type Err = QsrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Gd" => Ok(Method::Gd),
            "Sr" => Ok(Method::Sr),
            other => Err(QsrError::Configuration {
                message: format!("Unknown method '{}'; expected \"Gd\" or \"Sr\"", other),
            }),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Gd => write!(f, "Gd"),
            Method::Sr => write!(f, "Sr"),
        }
    }
}

/// What the iteration controller does when the direct SR solve fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SolverFailurePolicy {
    /// Abort the step and propagate the solver failure.
    #[default]
    Abort,
    /// Use the plain gradient for this step and log a warning.
    FallbackToGradient,
}

/// Options of a reconstruction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QsrConfig {
    /// Positive-phase minibatch size per step.
    pub batch_size: usize,
    /// Negative-phase sample count per step.
    pub n_samples: usize,
    /// Burn-in draws thrown away before every negative-phase estimate.
    /// `None` means `n_samples / 10`.
    pub discarded_samples: Option<usize>,
    /// Leading corpus records dropped once at construction.
    pub discarded_samples_on_init: usize,
    /// Plain gradient or stochastic reconfiguration.
    pub method: Method,
    /// Regularization added to the diagonal of S.
    pub diag_shift: f64,
    /// Solve the SR system iteratively (conjugate gradient).
    pub use_iterative: bool,
    /// Use Cholesky for the direct solve; otherwise column-pivoted QR.
    pub use_cholesky: bool,
    /// Relative residual at which CG stops.
    pub cg_tolerance: f64,
    /// CG iteration cap; `0` means the number of parameters.
    pub cg_max_iterations: usize,
    /// Reaction to a failed direct solve.
    pub solver_failure_policy: SolverFailurePolicy,
    /// Seed for minibatch shuffling.
    pub seed: u64,
}

impl Default for QsrConfig {
    fn default() -> Self {
        Self {
            batch_size: 0,
            n_samples: 0,
            discarded_samples: None,
            discarded_samples_on_init: 0,
            method: Method::Gd,
            diag_shift: DIAG_SHIFT,
            use_iterative: false,
            use_cholesky: true,
            cg_tolerance: CG_TOLERANCE,
            cg_max_iterations: 0,
            solver_failure_policy: SolverFailurePolicy::Abort,
            seed: 0,
        }
    }
}

impl QsrConfig {
    /// Creates a configuration with the two required sizes and defaults
    /// everywhere else.
    pub fn new(batch_size: usize, n_samples: usize) -> Self {
        Self { batch_size, n_samples, ..Self::default() }
    }

    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, QsrError> {
        serde_json::from_str(json).map_err(|e| QsrError::Configuration { message: format!("Invalid configuration JSON: {}", e) })
    }

    /// Set the per-draw burn-in.
    pub fn with_discarded_samples(mut self, n: usize) -> Self {
        self.discarded_samples = Some(n);
        self
    }

    /// Set the corpus prefix dropped at construction.
    pub fn with_discarded_samples_on_init(mut self, n: usize) -> Self {
        self.discarded_samples_on_init = n;
        self
    }

    /// Set the method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the method from its string tag (`"Gd"`, `"Sr"`).
    pub fn with_method_tag(self, tag: &str) -> Result<Self, QsrError> {
        Ok(self.with_method(tag.parse()?))
    }

    /// Set the S-matrix regularization.
    pub fn with_diag_shift(mut self, diag_shift: f64) -> Self {
        self.diag_shift = diag_shift;
        self
    }

    /// Choose the iterative solver.
    pub fn with_iterative(mut self, use_iterative: bool) -> Self {
        self.use_iterative = use_iterative;
        self
    }

    /// Choose Cholesky (true) or QR (false) for the direct solve.
    pub fn with_cholesky(mut self, use_cholesky: bool) -> Self {
        self.use_cholesky = use_cholesky;
        self
    }

    /// Set CG tolerance and iteration cap.
    pub fn with_cg(mut self, tolerance: f64, max_iterations: usize) -> Self {
        self.cg_tolerance = tolerance;
        self.cg_max_iterations = max_iterations;
        self
    }

    /// Set the direct-solver failure policy.
    pub fn with_solver_failure_policy(mut self, policy: SolverFailurePolicy) -> Self {
        self.solver_failure_policy = policy;
        self
    }

    /// Set the minibatch seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Burn-in per negative-phase estimate after resolving the default.
    pub fn effective_discarded_samples(&self) -> usize {
        self.discarded_samples.unwrap_or(self.n_samples / AUTO_DISCARD_FRACTION)
    }

    /// Checks every option.
    ///
    /// # Returns
    /// * `Err(QsrError::Configuration)` naming the first invalid option.
    pub fn validate(&self) -> Result<(), QsrError> {
        if self.batch_size == 0 {
            return Err(QsrError::Configuration { message: "batch_size must be positive".to_string() });
        }
        if self.n_samples == 0 {
            return Err(QsrError::Configuration { message: "n_samples must be positive".to_string() });
        }
        if !self.diag_shift.is_finite() || self.diag_shift < 0.0 {
            return Err(QsrError::Configuration {
                message: format!("diag_shift must be finite and non-negative, got {}", self.diag_shift),
            });
        }
        if self.use_iterative && (!self.cg_tolerance.is_finite() || self.cg_tolerance <= 0.0) {
            return Err(QsrError::Configuration {
                message: format!("cg_tolerance must be positive and finite, got {}", self.cg_tolerance),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = QsrConfig::new(10, 100);
        assert_eq!(config.method, Method::Gd);
        assert_eq!(config.diag_shift, 0.01);
        assert!(!config.use_iterative);
        assert!(config.use_cholesky);
        assert_eq!(config.effective_discarded_samples(), 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_method_tag() {
        let err = QsrConfig::new(1, 1).with_method_tag("Newton").unwrap_err();
        assert!(matches!(err, QsrError::Configuration { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_sizes_and_shift() {
        assert!(QsrConfig::new(0, 10).validate().is_err());
        assert!(QsrConfig::new(10, 0).validate().is_err());
        assert!(QsrConfig::new(10, 10).with_diag_shift(-1.0).validate().is_err());
        assert!(QsrConfig::new(10, 10).with_diag_shift(f64::NAN).validate().is_err());
        assert!(QsrConfig::new(10, 10).with_iterative(true).with_cg(0.0, 10).validate().is_err());
    }

    #[test]
    fn test_from_json_fills_defaults() -> Result<(), QsrError> {
        let config = QsrConfig::from_json_str(r#"{"batch_size": 8, "n_samples": 200, "method": "Sr", "discarded_samples": 5}"#)?;
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.method, Method::Sr);
        assert_eq!(config.effective_discarded_samples(), 5);
        assert_eq!(config.diag_shift, 0.01);
        assert_eq!(config.solver_failure_policy, SolverFailurePolicy::Abort);
        Ok(())
    }

    #[test]
    fn test_from_json_rejects_unknown_method() {
        assert!(QsrConfig::from_json_str(r#"{"batch_size": 8, "n_samples": 200, "method": "Adam"}"#).is_err());
    }
}
