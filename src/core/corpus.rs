// src/core/corpus.rs

use super::error::QsrError;
use super::record::{BasisIndex, MeasurementRecord};

/// The full set of measurement records used for training.
///
/// The first `discarded_on_init` records are a burn-in prefix: they are
/// dropped once at construction and never reach a minibatch.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingCorpus {
    /// Records available for minibatches (burn-in prefix already removed).
    records: Vec<MeasurementRecord>,
    /// How many leading records were dropped at construction.
    discarded: usize,
    /// Number of sites shared by every sample.
    n_sites: usize,
}

impl TrainingCorpus {
    /// Pairs samples with bases and drops the burn-in prefix.
    ///
    /// # Arguments
    /// * `samples` - Measured local values, one vector per record.
    /// * `bases` - Measurement basis per record; must be as long as `samples`.
    /// * `discarded_on_init` - Number of leading records to drop.
    ///
    /// # Returns
    /// * `Err(QsrError::Configuration)` on mismatched lengths, ragged samples,
    ///   or a prefix that would leave no usable records.
    pub fn new(samples: Vec<Vec<f64>>, bases: Vec<BasisIndex>, discarded_on_init: usize) -> Result<Self, QsrError> {
        if samples.len() != bases.len() {
            return Err(QsrError::Configuration {
                message: format!("Corpus has {} samples but {} bases; they must be paired 1:1", samples.len(), bases.len()),
            });
        }
        if discarded_on_init >= samples.len() {
            return Err(QsrError::Configuration {
                message: format!(
                    "discarded_samples_on_init ({}) leaves no usable records out of {}",
                    discarded_on_init,
                    samples.len()
                ),
            });
        }

        let n_sites = samples[0].len();
        if n_sites == 0 {
            return Err(QsrError::Configuration { message: "Samples must have at least one site".to_string() });
        }
        if let Some(pos) = samples.iter().position(|s| s.len() != n_sites) {
            return Err(QsrError::Configuration {
                message: format!("Sample {} has {} sites, expected {}", pos, samples[pos].len(), n_sites),
            });
        }

        let records = samples
            .into_iter()
            .zip(bases)
            .skip(discarded_on_init)
            .map(|(sample, basis)| MeasurementRecord::new(sample, basis))
            .collect();

        Ok(Self { records, discarded: discarded_on_init, n_sites })
    }

    /// Same as [`TrainingCorpus::new`] but with raw integer basis tags.
    pub fn from_raw(samples: Vec<Vec<f64>>, bases: &[i64], discarded_on_init: usize) -> Result<Self, QsrError> {
        let bases = bases.iter().map(|&b| BasisIndex::from_raw(b)).collect::<Result<Vec<_>, _>>()?;
        Self::new(samples, bases, discarded_on_init)
    }

    /// Checks every rotated basis index against the size of the basis set.
    pub fn check_bases(&self, n_rotations: usize) -> Result<(), QsrError> {
        for (pos, record) in self.records.iter().enumerate() {
            if let BasisIndex::Rotated(i) = record.basis() {
                if i >= n_rotations {
                    return Err(QsrError::Configuration {
                        message: format!(
                            "Record {} refers to {} but only {} rotations were supplied",
                            pos + self.discarded,
                            record.basis(),
                            n_rotations
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// The usable records.
    pub fn records(&self) -> &[MeasurementRecord] {
        &self.records
    }

    /// Gets a usable record by position.
    pub fn get(&self, index: usize) -> Option<&MeasurementRecord> {
        self.records.get(index)
    }

    /// Number of usable records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no record is usable. Never true for a validated corpus.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records dropped as burn-in.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Number of sites per sample.
    pub fn n_sites(&self) -> usize {
        self.n_sites
    }
}
