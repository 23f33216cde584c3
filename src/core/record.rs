// src/core/record.rs

use super::constants::qsr_defaults::COMPUTATIONAL_BASIS_SENTINEL;
use super::error::QsrError;
use std::fmt;

/// The measurement basis a record was taken in.
///
/// `Computational` is the sentinel for "no rotation": the outcome was recorded
/// in the model's natural basis and is compared to the model amplitude directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BasisIndex {
    /// No rotation applied before measurement.
    Computational,
    /// Index into the ordered `BasisSet`.
    Rotated(usize),
}

impl BasisIndex {
    /// Converts a raw integer tag. Negative values other than the sentinel
    /// (`-1`) are corrupt data.
    pub fn from_raw(raw: i64) -> Result<Self, QsrError> {
        match raw {
            COMPUTATIONAL_BASIS_SENTINEL => Ok(BasisIndex::Computational),
            r if r >= 0 => Ok(BasisIndex::Rotated(r as usize)),
            r => Err(QsrError::Configuration {
                message: format!("Basis index {} is negative and not the computational-basis sentinel ({})", r, COMPUTATIONAL_BASIS_SENTINEL),
            }),
        }
    }

    /// Returns the raw integer tag (`-1` for the computational basis).
    pub fn to_raw(self) -> i64 {
        match self {
            BasisIndex::Computational => COMPUTATIONAL_BASIS_SENTINEL,
            BasisIndex::Rotated(i) => i as i64,
        }
    }
}

impl From<usize> for BasisIndex {
    fn from(index: usize) -> Self {
        BasisIndex::Rotated(index)
    }
}

impl fmt::Display for BasisIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BasisIndex::Computational => write!(f, "Basis(computational)"),
            BasisIndex::Rotated(i) => write!(f, "Basis({})", i),
        }
    }
}

/// One measured outcome: the local values read out on every site, paired with
/// the basis the measurement was performed in.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    /// Local values, one per site (e.g. `0.0`/`1.0` for a bitstring).
    sample: Vec<f64>,
    /// Basis the sample was measured in.
    basis: BasisIndex,
}

impl MeasurementRecord {
    /// Creates a record from a sample and its basis.
    pub fn new(sample: Vec<f64>, basis: BasisIndex) -> Self {
        Self { sample, basis }
    }

    /// Read-only access to the local values.
    pub fn sample(&self) -> &[f64] {
        &self.sample
    }

    /// The basis this record was measured in.
    pub fn basis(&self) -> BasisIndex {
        self.basis
    }

    /// Number of sites in the sample.
    pub fn len(&self) -> usize {
        self.sample.len()
    }

    /// True for a zero-site sample.
    pub fn is_empty(&self) -> bool {
        self.sample.is_empty()
    }
}

impl fmt::Display for MeasurementRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record[")?;
        for (i, v) in self.sample.iter().enumerate() {
            write!(f, "{}{}", if i > 0 { ", " } else { "" }, v)?;
        }
        write!(f, "] @ {}", self.basis)
    }
}
