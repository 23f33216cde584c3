// src/fixtures.rs

//! Toy collaborators for unit tests.

use crate::core::{Complex64, QsrError};
use crate::traits::{Sampler, WaveFunction};
use rand::distr::{Distribution, StandardUniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// `log ψ(σ) = Σ_i a_i σ_i` over bit-valued sites. Every site is independent,
/// so the normalization is exact: `log Z = Σ_i log(1 + e^{2 Re a_i})`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ProductModel {
    params: Vec<Complex64>,
}

impl ProductModel {
    pub(crate) fn new(params: &[f64]) -> Self {
        Self { params: params.iter().map(|&a| Complex64::new(a, 0.0)).collect() }
    }

    /// Probability that site `i` reads 1.
    pub(crate) fn p_one(&self, i: usize) -> f64 {
        let w = (2.0 * self.params[i].re).exp();
        w / (1.0 + w)
    }
}

impl WaveFunction for ProductModel {
    fn n_params(&self) -> usize {
        self.params.len()
    }

    fn n_sites(&self) -> usize {
        self.params.len()
    }

    fn log_value(&self, config: &[f64]) -> Complex64 {
        self.params.iter().zip(config).map(|(a, s)| *a * *s).sum()
    }

    fn log_derivative(&self, config: &[f64]) -> Vec<Complex64> {
        config.iter().map(|&s| Complex64::new(s, 0.0)).collect()
    }

    fn log_norm(&self) -> Result<f64, QsrError> {
        Ok(self.params.iter().map(|a| (1.0 + (2.0 * a.re).exp()).ln()).sum())
    }

    fn parameters(&self) -> Vec<Complex64> {
        self.params.clone()
    }

    fn set_parameters(&mut self, params: &[Complex64]) -> Result<(), QsrError> {
        if params.len() != self.params.len() {
            return Err(QsrError::Model { message: format!("expected {} parameters, got {}", self.params.len(), params.len()) });
        }
        self.params = params.to_vec();
        Ok(())
    }
}

/// Replays a fixed list of configurations from the start after every reset.
pub(crate) struct ListSampler {
    machine: ProductModel,
    configs: Vec<Vec<f64>>,
    next: usize,
}

impl ListSampler {
    pub(crate) fn new(machine: ProductModel, configs: Vec<Vec<f64>>) -> Self {
        Self { machine, configs, next: 0 }
    }
}

impl Sampler for ListSampler {
    type Machine = ProductModel;

    fn machine(&self) -> &ProductModel {
        &self.machine
    }

    fn machine_mut(&mut self) -> &mut ProductModel {
        &mut self.machine
    }

    fn reset(&mut self) {
        self.next = 0;
    }

    fn next_sample(&mut self) -> Result<Option<Vec<f64>>, QsrError> {
        let sample = self.configs.get(self.next).cloned();
        self.next += 1;
        Ok(sample)
    }
}

/// Draws every site independently from the exact model marginals.
pub(crate) struct ExactSampler {
    machine: ProductModel,
    rng: StdRng,
}

impl ExactSampler {
    pub(crate) fn new(machine: ProductModel, seed: u64) -> Self {
        Self { machine, rng: StdRng::seed_from_u64(seed) }
    }
}

impl Sampler for ExactSampler {
    type Machine = ProductModel;

    fn machine(&self) -> &ProductModel {
        &self.machine
    }

    fn machine_mut(&mut self) -> &mut ProductModel {
        &mut self.machine
    }

    fn reset(&mut self) {}

    fn next_sample(&mut self) -> Result<Option<Vec<f64>>, QsrError> {
        let sample = (0..self.machine.n_sites())
            .map(|i| {
                let u: f64 = StandardUniform.sample(&mut self.rng);
                if u < self.machine.p_one(i) { 1.0 } else { 0.0 }
            })
            .collect();
        Ok(Some(sample))
    }
}
