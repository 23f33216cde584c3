// src/optimizer/mod.rs

//! Parameter update rules.
//!
//! Every rule treats the real and imaginary part of a complex parameter as
//! two independent real parameters.

use crate::core::Complex64;
use crate::traits::Optimizer;
use num_traits::Zero;

/// Stochastic gradient descent with optional L2 regularization and learning-rate decay.
///
/// `θ ← (1 − λη) θ − η g`, then `η ← η · decay_factor`.
#[derive(Debug, Clone, PartialEq)]
pub struct Sgd {
    learning_rate: f64,
    initial_learning_rate: f64,
    l2_reg: f64,
    decay_factor: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Self {
        Self { learning_rate, initial_learning_rate: learning_rate, l2_reg: 0.0, decay_factor: 1.0 }
    }

    pub fn with_l2_reg(mut self, l2_reg: f64) -> Self {
        self.l2_reg = l2_reg;
        self
    }

    pub fn with_decay_factor(mut self, decay_factor: f64) -> Self {
        self.decay_factor = decay_factor;
        self
    }

    /// Learning rate the next update will use.
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}

impl Optimizer for Sgd {
    fn update(&mut self, direction: &[Complex64], params: &mut [Complex64]) {
        let eta = self.learning_rate;
        let shrink = 1.0 - self.l2_reg * eta;
        for (p, g) in params.iter_mut().zip(direction) {
            *p = *p * shrink - *g * eta;
        }
        self.learning_rate *= self.decay_factor;
    }

    fn reset(&mut self) {
        self.learning_rate = self.initial_learning_rate;
    }
}

/// Gradient descent on an exponential moving average of the gradient.
///
/// `m ← β m + (1 − β) g`, `θ ← θ − η m`.
#[derive(Debug, Clone, PartialEq)]
pub struct Momentum {
    learning_rate: f64,
    beta: f64,
    moment: Vec<Complex64>,
}

impl Momentum {
    pub fn new(learning_rate: f64, beta: f64) -> Self {
        Self { learning_rate, beta, moment: Vec::new() }
    }
}

impl Default for Momentum {
    fn default() -> Self {
        Self::new(0.001, 0.9)
    }
}

impl Optimizer for Momentum {
    fn update(&mut self, direction: &[Complex64], params: &mut [Complex64]) {
        if self.moment.len() != direction.len() {
            self.moment = vec![Complex64::zero(); direction.len()];
        }
        for ((p, g), m) in params.iter_mut().zip(direction).zip(self.moment.iter_mut()) {
            *m = *m * self.beta + *g * (1.0 - self.beta);
            *p -= *m * self.learning_rate;
        }
    }

    fn reset(&mut self) {
        self.moment.clear();
    }
}

/// AdaMax (Adam with the infinity norm).
///
/// `m ← β₁ m + (1 − β₁) g`, `u ← max(|g|, β₂ u, ε)`,
/// `θ ← θ − α / (1 − β₁ᵗ) · m / u`.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaMax {
    alpha: f64,
    beta1: f64,
    beta2: f64,
    epscut: f64,
    first_moment: Vec<Complex64>,
    infinity_norm: Vec<Complex64>,
    iterations: i32,
}

impl AdaMax {
    pub fn new(alpha: f64, beta1: f64, beta2: f64, epscut: f64) -> Self {
        Self { alpha, beta1, beta2, epscut, first_moment: Vec::new(), infinity_norm: Vec::new(), iterations: 0 }
    }
}

impl Default for AdaMax {
    fn default() -> Self {
        Self::new(0.001, 0.9, 0.999, 1.0e-7)
    }
}

impl Optimizer for AdaMax {
    fn update(&mut self, direction: &[Complex64], params: &mut [Complex64]) {
        if self.first_moment.len() != direction.len() {
            self.first_moment = vec![Complex64::zero(); direction.len()];
            self.infinity_norm = vec![Complex64::zero(); direction.len()];
            self.iterations = 0;
        }
        self.iterations += 1;
        let eta = self.alpha / (1.0 - self.beta1.powi(self.iterations));

        let (beta1, beta2, epscut) = (self.beta1, self.beta2, self.epscut);
        for (((p, g), m), u) in params
            .iter_mut()
            .zip(direction)
            .zip(self.first_moment.iter_mut())
            .zip(self.infinity_norm.iter_mut())
        {
            *m = *m * beta1 + *g * (1.0 - beta1);
            u.re = g.re.abs().max(beta2 * u.re).max(epscut);
            u.im = g.im.abs().max(beta2 * u.im).max(epscut);
            p.re -= eta * m.re / u.re;
            p.im -= eta * m.im / u.im;
        }
    }

    fn reset(&mut self) {
        self.first_moment.clear();
        self.infinity_norm.clear();
        self.iterations = 0;
    }
}
