// src/operator/gates.rs

//! Single-site 2x2 matrices used to build rotations and observables.

use crate::core::{Complex64, QsrError};
use num_traits::{One, Zero};
use std::f64::consts::FRAC_1_SQRT_2;
use std::fmt;
use std::str::FromStr;

/// A 2x2 complex matrix acting on one site, indexed `[row][col]` over the
/// two local states.
pub type Matrix2 = [[Complex64; 2]; 2];

/// The local measurement basis of a single site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocalBasis {
    /// Computational basis; the rotation is the identity.
    Z,
    /// Eigenbasis of σ^x, reached with a Hadamard.
    X,
    /// Eigenbasis of σ^y, reached with `H · S†`.
    Y,
    /// Any other single-site unitary, given as the matrix mapping the
    /// computational basis to the measurement basis.
    Custom(Matrix2),
}

impl LocalBasis {
    /// The unitary `U` such that the amplitude of outcome `b` is
    /// `Σ_s U[b][s] ψ(s)`.
    pub fn matrix(&self) -> Matrix2 {
        match self {
            LocalBasis::Z => identity(),
            LocalBasis::X => hadamard(),
            LocalBasis::Y => matmul(&hadamard(), &phase_shift(-std::f64::consts::FRAC_PI_2)),
            LocalBasis::Custom(m) => *m,
        }
    }

    /// True for the computational basis.
    pub fn is_identity(&self) -> bool {
        matches!(self, LocalBasis::Z)
    }
}

impl FromStr for LocalBasis {
    type Err = QsrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Z" | "z" => Ok(LocalBasis::Z),
            "X" | "x" => Ok(LocalBasis::X),
            "Y" | "y" => Ok(LocalBasis::Y),
            other => Err(QsrError::Configuration { message: format!("Unknown local basis '{}'", other) }),
        }
    }
}

impl fmt::Display for LocalBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalBasis::Z => write!(f, "Z"),
            LocalBasis::X => write!(f, "X"),
            LocalBasis::Y => write!(f, "Y"),
            LocalBasis::Custom(_) => write!(f, "U"),
        }
    }
}

/// Identity.
pub fn identity() -> Matrix2 {
    [
        [Complex64::one(), Complex64::zero()],
        [Complex64::zero(), Complex64::one()],
    ]
}

/// Hadamard: equal mixing of the two local states.
pub fn hadamard() -> Matrix2 {
    [
        [Complex64::new(FRAC_1_SQRT_2, 0.0), Complex64::new(FRAC_1_SQRT_2, 0.0)],
        [Complex64::new(FRAC_1_SQRT_2, 0.0), Complex64::new(-FRAC_1_SQRT_2, 0.0)],
    ]
}

/// `diag(1, e^{iθ})`.
pub fn phase_shift(theta: f64) -> Matrix2 {
    [
        [Complex64::one(), Complex64::zero()],
        [Complex64::zero(), Complex64::new(theta.cos(), theta.sin())], // e^(i*theta)
    ]
}

/// Pauli σ^x in the local-state index basis.
pub fn pauli_x() -> Matrix2 {
    [
        [Complex64::zero(), Complex64::one()],
        [Complex64::one(), Complex64::zero()],
    ]
}

/// Pauli σ^y.
pub fn pauli_y() -> Matrix2 {
    let i = Complex64::i();
    [[Complex64::zero(), -i], [i, Complex64::zero()]]
}

/// Pauli σ^z; local state 0 has eigenvalue +1.
pub fn pauli_z() -> Matrix2 {
    [
        [Complex64::one(), Complex64::zero()],
        [Complex64::zero(), -Complex64::one()],
    ]
}

/// `a · b`.
pub fn matmul(a: &Matrix2, b: &Matrix2) -> Matrix2 {
    let mut out = [[Complex64::zero(); 2]; 2];
    for (row, out_row) in out.iter_mut().enumerate() {
        for (col, entry) in out_row.iter_mut().enumerate() {
            *entry = a[row][0] * b[0][col] + a[row][1] * b[1][col];
        }
    }
    out
}
