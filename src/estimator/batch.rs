// src/estimator/batch.rs

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Where a [`MinibatchSampler`] stands: the epoch and the offset into its
/// permutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPosition {
    pub epoch: usize,
    pub cursor: usize,
}

/// Draws positive-phase minibatches from the usable corpus.
///
/// Indices are taken from a per-epoch shuffled permutation, without
/// replacement inside an epoch. A batch that runs past the end of the
/// permutation takes the remainder and continues in the next epoch's one,
/// so every record is visited once per epoch.
///
/// Each epoch's permutation is a pure function of the seed and the epoch
/// number, so the sampler can be rewound to any earlier [`BatchPosition`].
#[derive(Debug)]
pub struct MinibatchSampler {
    permutation: Vec<usize>,
    cursor: usize,
    epoch: usize,
    seed: u64,
}

impl MinibatchSampler {
    /// Creates a sampler over `n_records` records, seeded for reproducibility.
    pub fn new(n_records: usize, seed: u64) -> Self {
        Self { permutation: shuffled(n_records, seed, 0), cursor: 0, epoch: 0, seed }
    }

    /// Next `batch_size` record indices.
    pub fn next_batch(&mut self, batch_size: usize) -> Vec<usize> {
        let mut batch = Vec::with_capacity(batch_size);
        if self.permutation.is_empty() {
            return batch;
        }
        while batch.len() < batch_size {
            if self.cursor == self.permutation.len() {
                self.epoch += 1;
                self.permutation = shuffled(self.permutation.len(), self.seed, self.epoch);
                self.cursor = 0;
            }
            let take = (batch_size - batch.len()).min(self.permutation.len() - self.cursor);
            batch.extend_from_slice(&self.permutation[self.cursor..self.cursor + take]);
            self.cursor += take;
        }
        batch
    }

    /// Current position, for a later [`rewind`](Self::rewind).
    pub fn position(&self) -> BatchPosition {
        BatchPosition { epoch: self.epoch, cursor: self.cursor }
    }

    /// Returns to `position`; the following batches repeat the ones drawn
    /// after it was taken.
    pub fn rewind(&mut self, position: BatchPosition) {
        if position.epoch != self.epoch {
            self.permutation = shuffled(self.permutation.len(), self.seed, position.epoch);
        }
        self.epoch = position.epoch;
        self.cursor = position.cursor.min(self.permutation.len());
    }

    /// Completed passes over the corpus.
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// Number of records this sampler draws from.
    pub fn n_records(&self) -> usize {
        self.permutation.len()
    }
}

fn shuffled(n_records: usize, seed: u64, epoch: usize) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed ^ (epoch as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    let mut permutation: Vec<usize> = (0..n_records).collect();
    permutation.shuffle(&mut rng);
    permutation
}
