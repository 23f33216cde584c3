// src/observables/mod.rs

//! Observables tracked during training and their sample statistics.

use crate::core::{Complex64, QsrError};
use crate::traits::{Operator, WaveFunction};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Sample statistics of a real-valued quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Stats {
    pub mean: f64,
    /// Unbiased sample variance; 0 for a single sample.
    pub variance: f64,
    /// `sqrt(variance / n_samples)`.
    pub error_of_mean: f64,
    pub n_samples: usize,
}

impl Stats {
    /// Statistics of `values`.
    ///
    /// # Returns
    /// * `Err(QsrError::Estimation)` if `values` is empty.
    pub fn from_values(values: &[f64]) -> Result<Self, QsrError> {
        if values.is_empty() {
            return Err(QsrError::Estimation { message: "Cannot take statistics of zero samples".to_string() });
        }
        let n = values.len();
        let mean = values.iter().sum::<f64>() / n as f64;
        let variance = if n > 1 {
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };
        Ok(Self { mean, variance, error_of_mean: (variance / n as f64).sqrt(), n_samples: n })
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6} ± {:.6} [var={:.6}, n={}]", self.mean, self.error_of_mean, self.variance, self.n_samples)
    }
}

/// `O_loc(σ) = Σ_σ' ⟨σ|O|σ'⟩ ψ(σ')/ψ(σ)`.
///
/// # Returns
/// * `Err(QsrError::Estimation)` if `ψ(σ)` is zero or not finite.
pub fn local_value<M: WaveFunction + ?Sized>(machine: &M, op: &dyn Operator, config: &[f64]) -> Result<Complex64, QsrError> {
    let log_psi = machine.log_value(config);
    if !log_psi.re.is_finite() || !log_psi.im.is_finite() {
        return Err(QsrError::Estimation {
            message: format!("Local value undefined: log ψ = {} at a sampled configuration", log_psi),
        });
    }
    let value = op
        .connections(config)?
        .into_iter()
        .map(|conn| conn.coefficient * (machine.log_value(&conn.config) - log_psi).exp())
        .sum();
    Ok(value)
}

/// Named observables evaluated on model samples.
#[derive(Default)]
pub struct ObservableManager {
    observables: BTreeMap<String, Box<dyn Operator>>,
}

impl ObservableManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks `op` under `name`, replacing any observable with the same name.
    pub fn add<O: Operator + 'static>(&mut self, name: impl Into<String>, op: O) {
        self.observables.insert(name.into(), Box::new(op));
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.observables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.observables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observables.is_empty()
    }

    /// Statistics of the real part of every observable's local value over `samples`.
    pub fn evaluate<M: WaveFunction>(&self, machine: &M, samples: &[Vec<f64>]) -> Result<BTreeMap<String, Stats>, QsrError> {
        let mut stats = BTreeMap::new();
        for (name, op) in &self.observables {
            let values = samples
                .par_iter()
                .map(|s| local_value(machine, op.as_ref(), s).map(|v| v.re))
                .collect::<Result<Vec<_>, _>>()?;
            stats.insert(name.clone(), Stats::from_values(&values)?);
        }
        Ok(stats)
    }
}

impl fmt::Debug for ObservableManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableManager").field("names", &self.observables.keys().collect::<Vec<_>>()).finish()
    }
}
