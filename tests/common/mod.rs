// tests/common/mod.rs

// Toy collaborators shared by the integration tests.
#![allow(dead_code)]

use qsr::{BasisIndex, Complex64, QsrError, Sampler, WaveFunction};
use rand::distr::{Distribution, StandardUniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// `log ψ(σ) = Σ_i a_i σ_i` over bit-valued sites, with exact normalization
/// `log Z = Σ_i log(1 + e^{2 Re a_i})`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductModel {
    params: Vec<Complex64>,
}

impl ProductModel {
    pub fn new(params: Vec<Complex64>) -> Self {
        Self { params }
    }

    pub fn from_real(params: &[f64]) -> Self {
        Self::new(params.iter().map(|&a| Complex64::new(a, 0.0)).collect())
    }

    /// Probability that site `i` reads 1.
    pub fn p_one(&self, i: usize) -> f64 {
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

fn draw(machine: &ProductModel, rng: &mut StdRng) -> Vec<f64> {
    (0..machine.n_sites())
        .map(|i| {
            let u: f64 = StandardUniform.sample(rng);
            if u < machine.p_one(i) { 1.0 } else { 0.0 }
        })
        .collect()
}

/// Exact independent-site sampler; never runs dry.
pub struct ExactSampler {
    machine: ProductModel,
    rng: StdRng,
}

impl ExactSampler {
    pub fn new(machine: ProductModel, seed: u64) -> Self {
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
        Ok(Some(draw(&self.machine, &mut self.rng)))
    }
}

/// Exact sampler with a lifetime budget of draws; reset does not refill it.
pub struct FiniteSampler {
    inner: ExactSampler,
    remaining: usize,
}

impl FiniteSampler {
    pub fn new(machine: ProductModel, seed: u64, budget: usize) -> Self {
        Self { inner: ExactSampler::new(machine, seed), remaining: budget }
    }
}

impl Sampler for FiniteSampler {
    type Machine = ProductModel;

    fn machine(&self) -> &ProductModel {
        self.inner.machine()
    }

    fn machine_mut(&mut self) -> &mut ProductModel {
        self.inner.machine_mut()
    }

    fn reset(&mut self) {}

    fn next_sample(&mut self) -> Result<Option<Vec<f64>>, QsrError> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        self.inner.next_sample()
    }
}

/// Exact sampler whose first `failures` draws return an error without
/// touching the random stream.
pub struct FlakySampler {
    inner: ExactSampler,
    failures: usize,
}

impl FlakySampler {
    pub fn new(machine: ProductModel, seed: u64, failures: usize) -> Self {
        Self { inner: ExactSampler::new(machine, seed), failures }
    }
}

impl Sampler for FlakySampler {
    type Machine = ProductModel;

    fn machine(&self) -> &ProductModel {
        self.inner.machine()
    }

    fn machine_mut(&mut self) -> &mut ProductModel {
        self.inner.machine_mut()
    }

    fn reset(&mut self) {}

    fn next_sample(&mut self) -> Result<Option<Vec<f64>>, QsrError> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(QsrError::Estimation { message: "chain diverged".to_string() });
        }
        self.inner.next_sample()
    }
}

/// Replays a fixed list from the start after every reset.
pub struct ReplaySampler {
    machine: ProductModel,
    configs: Vec<Vec<f64>>,
    next: usize,
}

impl ReplaySampler {
    pub fn new(machine: ProductModel, configs: Vec<Vec<f64>>) -> Self {
        Self { machine, configs, next: 0 }
    }
}

impl Sampler for ReplaySampler {
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

/// `n` computational-basis records drawn from `target`.
pub fn target_data(target: &ProductModel, n: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<BasisIndex>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let samples: Vec<Vec<f64>> = (0..n).map(|_| draw(target, &mut rng)).collect();
    let bases = vec![BasisIndex::Computational; n];
    (samples, bases)
}

/// Every bitstring on `n_sites` sites, site 0 first.
pub fn all_configs(n_sites: usize) -> Vec<Vec<f64>> {
    (0..1usize << n_sites)
        .map(|k| (0..n_sites).map(|i| ((k >> i) & 1) as f64).collect())
        .collect()
}
