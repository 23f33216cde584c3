// src/operator/local.rs

use super::gates::{pauli_x, pauli_y, pauli_z, Matrix2};
use super::rotation::LocalStates;
use crate::core::{Complex64, QsrError};
use crate::traits::{Connection, Operator};
use num_traits::Zero;

/// A weighted sum of single-site operators, `Σ_t w_t A_t`, each `A_t` acting
/// on one site. Typical use is tracking magnetizations as observables.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalOperator {
    n_sites: usize,
    /// `(site, weight, matrix)` terms.
    terms: Vec<(usize, Complex64, Matrix2)>,
    local_states: LocalStates,
}

impl LocalOperator {
    /// The zero operator on `n_sites` sites.
    pub fn new(n_sites: usize) -> Self {
        Self { n_sites, terms: Vec::new(), local_states: LocalStates::default() }
    }

    /// Adds `weight * matrix` acting on `site`.
    pub fn add_term(mut self, site: usize, weight: f64, matrix: Matrix2) -> Result<Self, QsrError> {
        if site >= self.n_sites {
            return Err(QsrError::Configuration {
                message: format!("Site {} out of range for a {}-site operator", site, self.n_sites),
            });
        }
        self.terms.push((site, Complex64::new(weight, 0.0), matrix));
        Ok(self)
    }

    /// Changes the encoding of local values.
    pub fn with_local_states(mut self, local_states: LocalStates) -> Self {
        self.local_states = local_states;
        self
    }

    /// `Σ_i σ^z_i`.
    pub fn sigma_z_sum(n_sites: usize) -> Self {
        Self::uniform(n_sites, pauli_z())
    }

    /// `Σ_i σ^x_i`.
    pub fn sigma_x_sum(n_sites: usize) -> Self {
        Self::uniform(n_sites, pauli_x())
    }

    /// `Σ_i σ^y_i`.
    pub fn sigma_y_sum(n_sites: usize) -> Self {
        Self::uniform(n_sites, pauli_y())
    }

    fn uniform(n_sites: usize, matrix: Matrix2) -> Self {
        let terms = (0..n_sites).map(|site| (site, Complex64::new(1.0, 0.0), matrix)).collect();
        Self { n_sites, terms, local_states: LocalStates::default() }
    }
}

impl Operator for LocalOperator {
    fn connections(&self, config: &[f64]) -> Result<Vec<Connection>, QsrError> {
        if config.len() != self.n_sites {
            return Err(QsrError::Configuration {
                message: format!("Configuration has {} sites but the operator acts on {}", config.len(), self.n_sites),
            });
        }

        let mut diagonal = Complex64::zero();
        let mut connections = Vec::new();
        for (site, weight, matrix) in &self.terms {
            let row = self.local_states.index_of(config[*site], *site)?;
            for col in 0..2 {
                let element = *weight * matrix[row][col];
                if element.is_zero() {
                    continue;
                }
                if col == row {
                    diagonal += element;
                } else {
                    let mut flipped = config.to_vec();
                    flipped[*site] = self.local_states.value(col);
                    connections.push(Connection::new(element, flipped));
                }
            }
        }
        if !diagonal.is_zero() {
            connections.insert(0, Connection::new(diagonal, config.to_vec()));
        }
        Ok(connections)
    }
}
