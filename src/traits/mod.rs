// src/traits/mod.rs

//! Capability interfaces for the collaborators the training engine drives.
//!
//! The engine never defines a wavefunction architecture, a Monte-Carlo kernel
//! or an update rule itself. It talks to them through these traits, so any
//! concrete variant can be swapped in as a strategy.

use crate::core::{Complex64, QsrError};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// One non-zero matrix element `⟨σ|A|σ'⟩` of an operator acting on `σ`.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    /// The matrix element.
    pub coefficient: Complex64,
    /// The connected configuration `σ'`.
    pub config: Vec<f64>,
}

impl Connection {
    /// Creates a connection.
    pub fn new(coefficient: Complex64, config: Vec<f64>) -> Self {
        Self { coefficient, config }
    }
}

/// An operator with a sparse row structure in the computational basis.
///
/// Used both for basis rotations (where the row of `σ` gives the
/// configurations whose amplitudes combine into the rotated amplitude) and
/// for observables (where it gives the local value).
pub trait Operator: Send + Sync {
    /// Returns every `(⟨σ|A|σ'⟩, σ')` with a non-zero element for row `config`.
    fn connections(&self, config: &[f64]) -> Result<Vec<Connection>, QsrError>;
}

/// A parameterized wavefunction `ψ_θ(σ)`.
pub trait WaveFunction: Send + Sync {
    /// Number of variational parameters.
    fn n_params(&self) -> usize;

    /// Number of sites a configuration must have.
    fn n_sites(&self) -> usize;

    /// `log ψ(σ)`. Zero amplitude is reported as a real part of `-inf`.
    fn log_value(&self, config: &[f64]) -> Complex64;

    /// `∂ log ψ(σ) / ∂θ_k` for every parameter.
    fn log_derivative(&self, config: &[f64]) -> Vec<Complex64>;

    /// `log Σ_σ |ψ(σ)|²`, the log-normalization of the model distribution.
    fn log_norm(&self) -> Result<f64, QsrError>;

    /// Current parameter vector.
    fn parameters(&self) -> Vec<Complex64>;

    /// Replaces the parameter vector.
    fn set_parameters(&mut self, params: &[Complex64]) -> Result<(), QsrError>;

    /// Persists the parameters to `path`.
    ///
    /// The default writes `{"parameters": [[re, im], ...]}` as JSON.
    fn save(&self, path: &Path) -> Result<(), QsrError> {
        #[derive(Serialize)]
        struct Snapshot {
            parameters: Vec<[f64; 2]>,
        }
        let snapshot = Snapshot {
            parameters: self.parameters().iter().map(|p| [p.re, p.im]).collect(),
        };
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &snapshot)?;
        Ok(())
    }
}

/// Source of configurations distributed as `|ψ(σ)|²`. Owns the model.
pub trait Sampler {
    /// The model this sampler draws from.
    type Machine: WaveFunction;

    /// Read-only access to the model.
    fn machine(&self) -> &Self::Machine;

    /// Mutable access to the model, used only to install new parameters.
    fn machine_mut(&mut self) -> &mut Self::Machine;

    /// Restarts the chain from a fresh starting state.
    fn reset(&mut self);

    /// Draws the next configuration. `Ok(None)` means the sampler is exhausted.
    fn next_sample(&mut self) -> Result<Option<Vec<f64>>, QsrError>;
}

/// An update rule turning a descent direction into new parameters.
pub trait Optimizer {
    /// Moves `params` against `direction` (the loss gradient, or a
    /// preconditioned version of it).
    fn update(&mut self, direction: &[Complex64], params: &mut [Complex64]);

    /// Clears any accumulated state (moments, step counters).
    fn reset(&mut self) {}
}
