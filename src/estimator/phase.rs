// src/estimator/phase.rs

use crate::core::{Complex64, MeasurementRecord, QsrError};
use crate::operator::BasisSet;
use crate::traits::{Sampler, WaveFunction};
use nalgebra::DMatrix;
use num_traits::Zero;
use rayon::prelude::*;
use tracing::{debug, warn};

/// Step-scoped result of the phase estimator. Never persisted across steps.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientEstimate {
    /// `⟨O_rot⟩` over the minibatch.
    positive: Vec<Complex64>,
    /// `⟨O⟩` over the model samples.
    negative: Vec<Complex64>,
    /// Log-derivative covariance over the model samples, when requested.
    s_matrix: Option<DMatrix<Complex64>>,
    /// The model samples the negative phase was estimated on.
    samples: Vec<Vec<f64>>,
}

impl GradientEstimate {
    /// Positive-phase statistic.
    pub fn positive(&self) -> &[Complex64] {
        &self.positive
    }

    /// Negative-phase statistic.
    pub fn negative(&self) -> &[Complex64] {
        &self.negative
    }

    /// The S matrix, if the method asked for it.
    pub fn s_matrix(&self) -> Option<&DMatrix<Complex64>> {
        self.s_matrix.as_ref()
    }

    /// Negative-phase samples.
    pub fn samples(&self) -> &[Vec<f64>] {
        &self.samples
    }

    /// Takes ownership of the negative-phase samples.
    pub fn into_samples(self) -> Vec<Vec<f64>> {
        self.samples
    }

    /// `Positive − Negative`: the log-likelihood ascent direction.
    pub fn raw(&self) -> Vec<Complex64> {
        self.positive.iter().zip(&self.negative).map(|(p, n)| p - n).collect()
    }

    /// `∇NLL = 2 conj(Negative − Positive)`, the vector a minimizing
    /// optimizer (or the SR solve) consumes.
    ///
    /// For `θ = a + ib` the real part is `∂NLL/∂a` and the imaginary part is
    /// `∂NLL/∂b`, i.e. twice the Wirtinger derivative `∂NLL/∂θ*`. This is
    /// the force that pairs with `S = Ō†Ō / N`.
    pub fn nll_gradient(&self) -> Vec<Complex64> {
        self.positive.iter().zip(&self.negative).map(|(p, n)| ((n - p) * 2.0).conj()).collect()
    }
}

/// Statistics of the negative phase.
#[derive(Debug, Clone, PartialEq)]
pub struct NegativePhase {
    /// `⟨O⟩`.
    pub mean: Vec<Complex64>,
    /// `S_ij = ⟨Ō_i* Ō_j⟩ − ⟨Ō_i⟩*⟨Ō_j⟩`, present when requested.
    pub s_matrix: Option<DMatrix<Complex64>>,
}

/// Evaluates log-derivative statistics of a model against data and against
/// its own samples.
pub struct PhaseEstimator<'a, M: WaveFunction> {
    machine: &'a M,
    bases: &'a BasisSet,
}

impl<'a, M: WaveFunction> PhaseEstimator<'a, M> {
    /// Creates an estimator over the current model parameters.
    pub fn new(machine: &'a M, bases: &'a BasisSet) -> Self {
        Self { machine, bases }
    }

    /// Log-derivative of the rotated amplitude of one record,
    /// `Σ_k c_k ψ(σ_k) O(σ_k) / Σ_k c_k ψ(σ_k)`.
    ///
    /// Connected configurations with zero amplitude drop out of both sums.
    ///
    /// # Arguments
    /// * `record` - The measured sample and its basis.
    /// * `position` - Index reported if the record is degenerate.
    ///
    /// # Returns
    /// * `Err(QsrError::NumericDegeneracy)` when the rotated amplitude vanishes.
    pub fn rotated_log_derivative(&self, record: &MeasurementRecord, position: usize) -> Result<Vec<Complex64>, QsrError> {
        let connections = self.bases.rotate(record.sample(), record.basis())?;
        let n_params = self.machine.n_params();

        let mut terms = Vec::with_capacity(connections.len());
        for conn in &connections {
            let log_value = self.machine.log_value(&conn.config);
            if log_value.re == f64::NEG_INFINITY {
                continue;
            }
            if !log_value.re.is_finite() || !log_value.im.is_finite() {
                return Err(QsrError::Estimation {
                    message: format!("Model log-amplitude is {} at a configuration rotated from record {}", log_value, position),
                });
            }
            terms.push((conn, log_value));
        }

        // Shift by the largest log-modulus so the exponentials stay in range.
        let shift = terms.iter().map(|(_, lv)| lv.re).fold(f64::NEG_INFINITY, f64::max);
        let mut numerator = vec![Complex64::zero(); n_params];
        let mut denominator = Complex64::zero();
        for (conn, log_value) in terms {
            let weight = conn.coefficient * (log_value - shift).exp();
            let derivative = self.machine.log_derivative(&conn.config);
            check_param_len(derivative.len(), n_params)?;
            for (acc, d) in numerator.iter_mut().zip(&derivative) {
                *acc += weight * d;
            }
            denominator += weight;
        }

        if denominator.norm_sqr() == 0.0 {
            return Err(QsrError::NumericDegeneracy {
                record: position,
                message: format!("{} has zero rotated amplitude under the current model", record),
            });
        }
        Ok(numerator.into_iter().map(|n| n / denominator).collect())
    }

    /// Positive phase: average rotated log-derivative over a minibatch.
    ///
    /// # Arguments
    /// * `batch` - `(corpus position, record)` pairs.
    pub fn positive_phase(&self, batch: &[(usize, &MeasurementRecord)]) -> Result<Vec<Complex64>, QsrError> {
        if batch.is_empty() {
            return Err(QsrError::Estimation { message: "Positive phase needs a non-empty minibatch".to_string() });
        }
        let per_record = batch
            .par_iter()
            .map(|(position, record)| self.rotated_log_derivative(record, *position))
            .collect::<Result<Vec<_>, _>>()?;

        let mean = mean_of(&per_record, self.machine.n_params());
        debug!(batch = batch.len(), "positive phase estimated");
        Ok(mean)
    }

    /// Negative phase: average log-derivative over model samples, and the
    /// S matrix when `with_s_matrix` is set.
    pub fn negative_phase(&self, samples: &[Vec<f64>], with_s_matrix: bool) -> Result<NegativePhase, QsrError> {
        if samples.is_empty() {
            return Err(QsrError::Estimation { message: "Negative phase needs at least one model sample".to_string() });
        }
        let n_params = self.machine.n_params();
        let derivatives = samples
            .par_iter()
            .map(|s| {
                let d = self.machine.log_derivative(s);
                check_param_len(d.len(), n_params).map(|_| d)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mean = mean_of(&derivatives, n_params);
        let s_matrix = with_s_matrix.then(|| covariance(&derivatives, &mean));
        debug!(samples = samples.len(), s_matrix = with_s_matrix, "negative phase estimated");
        Ok(NegativePhase { mean, s_matrix })
    }

    /// Runs both phases and packages them into a [`GradientEstimate`].
    pub fn estimate(
        &self,
        batch: &[(usize, &MeasurementRecord)],
        samples: Vec<Vec<f64>>,
        with_s_matrix: bool,
    ) -> Result<GradientEstimate, QsrError> {
        let positive = self.positive_phase(batch)?;
        let NegativePhase { mean, s_matrix } = self.negative_phase(&samples, with_s_matrix)?;
        Ok(GradientEstimate { positive, negative: mean, s_matrix, samples })
    }
}

/// Draws `n_samples` configurations after resetting the sampler and throwing
/// away `discarded` burn-in draws.
///
/// # Returns
/// * Fewer than `n_samples` configurations if the sampler runs dry part way
///   (logged as a warning).
/// * `Err(QsrError::Estimation)` if no configuration survives burn-in.
pub fn draw_samples<S: Sampler>(sampler: &mut S, n_samples: usize, discarded: usize) -> Result<Vec<Vec<f64>>, QsrError> {
    sampler.reset();
    for _ in 0..discarded {
        if sampler.next_sample()?.is_none() {
            return Err(QsrError::Estimation {
                message: format!("Sampler exhausted during burn-in of {} draws", discarded),
            });
        }
    }

    let mut samples = Vec::with_capacity(n_samples);
    while samples.len() < n_samples {
        match sampler.next_sample()? {
            Some(s) => samples.push(s),
            None => break,
        }
    }

    if samples.is_empty() {
        return Err(QsrError::Estimation {
            message: format!("Sampler produced no samples after discarding {} burn-in draws", discarded),
        });
    }
    if samples.len() < n_samples {
        warn!(requested = n_samples, drawn = samples.len(), "sampler ran dry; negative phase uses fewer samples");
    }
    Ok(samples)
}

fn check_param_len(got: usize, expected: usize) -> Result<(), QsrError> {
    if got != expected {
        return Err(QsrError::Model {
            message: format!("Model returned {} log-derivatives but reports {} parameters", got, expected),
        });
    }
    Ok(())
}

/// Component-wise mean, summed in input order.
fn mean_of(rows: &[Vec<Complex64>], n_params: usize) -> Vec<Complex64> {
    let mut sum = vec![Complex64::zero(); n_params];
    for row in rows {
        for (acc, v) in sum.iter_mut().zip(row) {
            *acc += v;
        }
    }
    let n = rows.len() as f64;
    sum.into_iter().map(|s| s / n).collect()
}

/// `S = Ō† Ō / N` with `Ō` the centered log-derivative matrix.
fn covariance(rows: &[Vec<Complex64>], mean: &[Complex64]) -> DMatrix<Complex64> {
    let n = rows.len();
    let centered = DMatrix::from_fn(n, mean.len(), |i, j| rows[i][j] - mean[j]);
    let s = centered.adjoint() * &centered;
    let n = n as f64;
    s.map(|v| v / n)
}
