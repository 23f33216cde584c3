// src/likelihood/mod.rs

//! Negative log-likelihood of the model on rotated measurement data.

use crate::core::{BasisIndex, Complex64, QsrError};
use crate::operator::BasisSet;
use crate::traits::WaveFunction;
use num_traits::Zero;
use rayon::prelude::*;
use tracing::debug;

/// `log |ψ_rot(σ)|²` for one record, unnormalized.
///
/// Connected configurations with zero model amplitude are left out of the
/// coherent sum.
///
/// # Returns
/// * `Err(QsrError::NumericDegeneracy)` if the rotated amplitude is exactly zero.
pub fn rotated_log_probability<M: WaveFunction>(
    machine: &M,
    rotations: &BasisSet,
    sample: &[f64],
    basis: BasisIndex,
    position: usize,
) -> Result<f64, QsrError> {
    let connections = rotations.rotate(sample, basis)?;

    let mut terms = Vec::with_capacity(connections.len());
    for conn in &connections {
        let log_value = machine.log_value(&conn.config);
        if log_value.re == f64::NEG_INFINITY {
            continue;
        }
        if !log_value.re.is_finite() || !log_value.im.is_finite() {
            return Err(QsrError::Estimation {
                message: format!("Model log-amplitude is {} at a configuration rotated from record {}", log_value, position),
            });
        }
        terms.push((conn.coefficient, log_value));
    }

    let shift = terms.iter().map(|(_, lv)| lv.re).fold(f64::NEG_INFINITY, f64::max);
    let amplitude = terms
        .iter()
        .fold(Complex64::zero(), |acc, &(c, lv)| acc + c * (lv - shift).exp());

    let modulus = amplitude.norm_sqr();
    if modulus == 0.0 {
        return Err(QsrError::NumericDegeneracy {
            record: position,
            message: format!("Record {} has zero rotated amplitude in {}", position, basis),
        });
    }
    Ok(modulus.ln() + 2.0 * shift)
}

/// `NLL = −(1/N) Σ_i log( |ψ_rot(σ_i)|² / Z )` over `(samples[i], bases[i])`.
///
/// Read-only with respect to the model.
///
/// # Returns
/// * `Err(QsrError::Configuration)` on empty or mismatched inputs.
/// * `Err(QsrError::NumericDegeneracy)` naming the first record whose rotated
///   amplitude vanishes.
pub fn negative_log_likelihood<M: WaveFunction>(
    machine: &M,
    rotations: &BasisSet,
    samples: &[Vec<f64>],
    bases: &[BasisIndex],
) -> Result<f64, QsrError> {
    if samples.len() != bases.len() {
        return Err(QsrError::Configuration {
            message: format!("{} samples but {} basis indices", samples.len(), bases.len()),
        });
    }
    if samples.is_empty() {
        return Err(QsrError::Configuration { message: "NLL needs at least one record".to_string() });
    }
    let n_sites = machine.n_sites();
    if let Some(pos) = samples.iter().position(|s| s.len() != n_sites) {
        return Err(QsrError::Configuration {
            message: format!("Record {} has {} sites, model expects {}", pos, samples[pos].len(), n_sites),
        });
    }

    let log_probs = samples
        .par_iter()
        .zip(bases.par_iter())
        .enumerate()
        .map(|(pos, (sample, basis))| rotated_log_probability(machine, rotations, sample, *basis, pos))
        .collect::<Result<Vec<_>, _>>()?;

    let mean_log_prob = log_probs.iter().sum::<f64>() / log_probs.len() as f64;
    let nll = machine.log_norm()? - mean_log_prob;
    debug!(records = samples.len(), nll, "negative log-likelihood evaluated");
    Ok(nll)
}
