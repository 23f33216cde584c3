// src/operator/rotation.rs

//! Basis rotations and the ordered set of rotations a corpus refers to.
//!
//! Applying a rotation to a measured sample yields the configurations
//! `σ'_k` and coefficients `c_k` such that the amplitude of the sample in the
//! rotated basis is `Σ_k c_k ψ(σ'_k)`.

use super::gates::{LocalBasis, Matrix2};
use crate::core::{BasisIndex, Complex64, QsrError};
use crate::traits::{Connection, Operator};
use num_traits::{One, Zero};
use std::fmt;
use std::str::FromStr;

/// Maps the two local values a site can hold to the row/column index of a
/// [`Matrix2`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalStates(pub [f64; 2]);

impl LocalStates {
    /// Bitstring convention: `0.0` and `1.0`.
    pub const BITS: LocalStates = LocalStates([0.0, 1.0]);
    /// Spin convention: `+1.0` then `-1.0` (σ^z eigenvalue order).
    pub const SPINS: LocalStates = LocalStates([1.0, -1.0]);

    /// Index of `value`, or a configuration error for a value outside the
    /// local Hilbert space.
    pub fn index_of(&self, value: f64, site: usize) -> Result<usize, QsrError> {
        self.0
            .iter()
            .position(|&v| (v - value).abs() < 1e-9)
            .ok_or_else(|| QsrError::Configuration {
                message: format!("Site {} holds {} which is not one of the local states {:?}", site, value, self.0),
            })
    }

    /// Local value stored at `index`.
    pub fn value(&self, index: usize) -> f64 {
        self.0[index]
    }
}

impl Default for LocalStates {
    fn default() -> Self {
        LocalStates::BITS
    }
}

/// A tensor product of single-site basis changes.
///
/// Sites left in the computational basis contribute the identity and are not
/// enumerated, so a rotation touching `k` sites yields at most `2^k`
/// connections.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalRotation {
    /// Number of sites a sample must have.
    n_sites: usize,
    /// Rotated sites and their unitaries, sorted by site.
    rotated: Vec<(usize, Matrix2)>,
    /// Encoding of local values.
    local_states: LocalStates,
}

impl LocalRotation {
    /// The identity rotation on `n_sites` sites.
    pub fn identity(n_sites: usize) -> Self {
        Self { n_sites, rotated: Vec::new(), local_states: LocalStates::default() }
    }

    /// Builds a rotation from one local basis per site.
    pub fn from_bases(bases: &[LocalBasis]) -> Self {
        let rotated = bases
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.is_identity())
            .map(|(site, b)| (site, b.matrix()))
            .collect();
        Self { n_sites: bases.len(), rotated, local_states: LocalStates::default() }
    }

    /// Sets the basis of one site, replacing any previous choice.
    pub fn with_basis(mut self, site: usize, basis: LocalBasis) -> Result<Self, QsrError> {
        if site >= self.n_sites {
            return Err(QsrError::Configuration {
                message: format!("Site {} out of range for a {}-site rotation", site, self.n_sites),
            });
        }
        self.rotated.retain(|(s, _)| *s != site);
        if !basis.is_identity() {
            self.rotated.push((site, basis.matrix()));
            self.rotated.sort_by_key(|(s, _)| *s);
        }
        Ok(self)
    }

    /// Changes the encoding of local values.
    pub fn with_local_states(mut self, local_states: LocalStates) -> Self {
        self.local_states = local_states;
        self
    }

    /// Number of sites this rotation acts on.
    pub fn n_sites(&self) -> usize {
        self.n_sites
    }

    /// Sites in a non-computational basis.
    pub fn rotated_sites(&self) -> impl Iterator<Item = usize> + '_ {
        self.rotated.iter().map(|(s, _)| *s)
    }
}

impl FromStr for LocalRotation {
    type Err = QsrError;

    /// Parses a Pauli string such as `"XZY"`, one letter per site.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bases = s
            .chars()
            .map(|c| c.to_string().parse::<LocalBasis>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LocalRotation::from_bases(&bases))
    }
}

impl fmt::Display for LocalRotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rotation[")?;
        for site in 0..self.n_sites {
            let rotated = self.rotated.iter().any(|(s, _)| *s == site);
            write!(f, "{}", if rotated { 'U' } else { 'I' })?;
        }
        write!(f, "]")
    }
}

impl Operator for LocalRotation {
    fn connections(&self, config: &[f64]) -> Result<Vec<Connection>, QsrError> {
        if config.len() != self.n_sites {
            return Err(QsrError::Configuration {
                message: format!("Sample has {} sites but the rotation acts on {}", config.len(), self.n_sites),
            });
        }

        // Row index of the measured outcome on every rotated site.
        let rows = self
            .rotated
            .iter()
            .map(|(site, _)| self.local_states.index_of(config[*site], *site))
            .collect::<Result<Vec<_>, _>>()?;

        let k = self.rotated.len();
        let mut connections = Vec::with_capacity(1 << k);
        // Enumerate every assignment of the rotated sites; bit j of `mask`
        // is the column chosen for the j-th rotated site.
        for mask in 0..(1usize << k) {
            let mut coefficient = Complex64::one();
            let mut rotated_config = config.to_vec();
            for (j, (site, matrix)) in self.rotated.iter().enumerate() {
                let col = (mask >> j) & 1;
                coefficient *= matrix[rows[j]][col];
                rotated_config[*site] = self.local_states.value(col);
            }
            if !coefficient.is_zero() {
                connections.push(Connection::new(coefficient, rotated_config));
            }
        }
        Ok(connections)
    }
}

/// The ordered rotations a training corpus refers to. Immutable once built.
#[derive(Default)]
pub struct BasisSet {
    rotations: Vec<Box<dyn Operator>>,
}

impl BasisSet {
    /// Creates an empty set: only computational-basis records can be used.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from already-constructed rotations.
    pub fn from_rotations(rotations: Vec<Box<dyn Operator>>) -> Self {
        Self { rotations }
    }

    /// Appends a rotation; its index is the previous length.
    pub fn push<R: Operator + 'static>(&mut self, rotation: R) {
        self.rotations.push(Box::new(rotation));
    }

    /// Builder-style [`BasisSet::push`].
    pub fn with<R: Operator + 'static>(mut self, rotation: R) -> Self {
        self.push(rotation);
        self
    }

    /// Number of rotations.
    pub fn len(&self) -> usize {
        self.rotations.len()
    }

    /// True when the set holds no rotation.
    pub fn is_empty(&self) -> bool {
        self.rotations.is_empty()
    }

    /// Applies the rotation selected by `basis` to `sample`.
    ///
    /// # Arguments
    /// * `sample` - The measured local values.
    /// * `basis` - The basis the sample was measured in.
    ///
    /// # Returns
    /// * The configurations and coefficients whose weighted amplitude sum is the
    ///   rotated amplitude. The computational basis yields the sample itself
    ///   with unit coefficient.
    /// * `Err(QsrError::Configuration)` for an index outside the set, which
    ///   means the training data is corrupt.
    pub fn rotate(&self, sample: &[f64], basis: BasisIndex) -> Result<Vec<Connection>, QsrError> {
        match basis {
            BasisIndex::Computational => Ok(vec![Connection::new(Complex64::one(), sample.to_vec())]),
            BasisIndex::Rotated(i) => {
                let rotation = self.rotations.get(i).ok_or_else(|| QsrError::Configuration {
                    message: format!("{} is out of range for a basis set of {} rotations", basis, self.rotations.len()),
                })?;
                rotation.connections(sample)
            }
        }
    }
}

impl fmt::Debug for BasisSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasisSet").field("len", &self.rotations.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_1_SQRT_2;

    const TEST_TOLERANCE: f64 = 1e-12;

    #[test]
    fn test_sentinel_returns_sample_unchanged() -> Result<(), QsrError> {
        let set = BasisSet::new();
        let conns = set.rotate(&[1.0, 0.0, 1.0], BasisIndex::Computational)?;
        assert_eq!(conns.len(), 1);
        assert_eq!(conns[0].config, vec![1.0, 0.0, 1.0]);
        assert_eq!(conns[0].coefficient, Complex64::one());
        Ok(())
    }

    #[test]
    fn test_identity_rotation_matches_sentinel() -> Result<(), QsrError> {
        let set = BasisSet::new().with(LocalRotation::identity(2));
        let rotated = set.rotate(&[0.0, 1.0], BasisIndex::Rotated(0))?;
        let plain = set.rotate(&[0.0, 1.0], BasisIndex::Computational)?;
        assert_eq!(rotated, plain);
        Ok(())
    }

    #[test]
    fn test_invalid_basis_index_is_fatal() {
        let set = BasisSet::new().with(LocalRotation::identity(1));
        let err = set.rotate(&[0.0], BasisIndex::Rotated(1)).unwrap_err();
        assert!(matches!(err, QsrError::Configuration { .. }));
    }

    #[test]
    fn test_x_rotation_on_one_site() -> Result<(), QsrError> {
        let rotation: LocalRotation = "ZX".parse()?;
        let conns = rotation.connections(&[1.0, 1.0])?;
        // Site 1 measured as 1 in the X basis: <-| = (<0| - <1|)/√2.
        assert_eq!(conns.len(), 2);
        assert_eq!(conns[0].config, vec![1.0, 0.0]);
        assert_eq!(conns[1].config, vec![1.0, 1.0]);
        assert!((conns[0].coefficient - Complex64::new(FRAC_1_SQRT_2, 0.0)).norm() < TEST_TOLERANCE);
        assert!((conns[1].coefficient - Complex64::new(-FRAC_1_SQRT_2, 0.0)).norm() < TEST_TOLERANCE);
        Ok(())
    }

    #[test]
    fn test_two_rotated_sites_give_four_connections() -> Result<(), QsrError> {
        let rotation: LocalRotation = "XY".parse()?;
        let conns = rotation.connections(&[0.0, 0.0])?;
        assert_eq!(conns.len(), 4);
        let total_weight: f64 = conns.iter().map(|c| c.coefficient.norm_sqr()).sum();
        assert!((total_weight - 1.0).abs() < TEST_TOLERANCE);
        Ok(())
    }

    #[test]
    fn test_rotation_rejects_foreign_local_value() {
        let rotation: LocalRotation = "X".parse().unwrap();
        let err = rotation.connections(&[2.0]).unwrap_err();
        assert!(matches!(err, QsrError::Configuration { .. }));
    }

    #[test]
    fn test_spin_encoding() -> Result<(), QsrError> {
        let rotation = LocalRotation::identity(2)
            .with_local_states(LocalStates::SPINS)
            .with_basis(0, LocalBasis::X)?;
        let conns = rotation.connections(&[-1.0, 1.0])?;
        let configs: Vec<_> = conns.iter().map(|c| c.config.clone()).collect();
        assert_eq!(configs, vec![vec![1.0, 1.0], vec![-1.0, 1.0]]);
        assert_eq!(rotation.to_string(), "Rotation[UI]");
        Ok(())
    }
}
