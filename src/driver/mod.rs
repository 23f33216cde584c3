// src/driver/mod.rs

//! The iteration controller.
//!
//! [`Qsr`] owns the sampler (and through it the model), the optimizer, the
//! basis set and the measurement corpus. Every step estimates the gradient
//! from a minibatch and fresh model samples, optionally preconditions it
//! with the SR solve, and hands it to the optimizer. The step counter is the
//! only state carried from one call to the next.

pub mod iter;
pub mod output;

pub use iter::QsrIter;
pub use output::RunLog;

use crate::config::{QsrConfig, SolverFailurePolicy};
use crate::core::{BasisIndex, MeasurementRecord, QsrError, TrainingCorpus};
use crate::estimator::{draw_samples, MinibatchSampler, PhaseEstimator};
use crate::likelihood::negative_log_likelihood;
use crate::observables::{ObservableManager, Stats};
use crate::operator::BasisSet;
use crate::solver::SrSolver;
use crate::traits::{Operator, Optimizer, Sampler, WaveFunction};
use crate::validation::{check_finite, l2_norm};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Outcome of the SR solve in one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveOutcome {
    pub converged: bool,
    pub iterations: usize,
    pub residual: f64,
}

/// Diagnostics of the most recent completed step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// Zero-based index of the step.
    pub step: usize,
    /// `||∇NLL||` before preconditioning.
    pub gradient_norm: f64,
    /// `||x||` of the direction handed to the optimizer.
    pub direction_norm: f64,
    /// Model samples the negative phase used.
    pub n_samples: usize,
    /// Present when the SR solve produced the direction.
    pub solve: Option<SolveOutcome>,
    /// True when a failed SR solve was replaced by the plain gradient.
    pub used_fallback: bool,
}

/// Quantum state reconstruction driver.
///
/// # Examples
///
/// ```no_run
/// # use qsr::{Qsr, QsrConfig, BasisSet, BasisIndex, Sgd, LocalOperator, QsrError};
/// # use qsr::traits::Sampler;
/// # fn train<S: Sampler>(sampler: S, data: Vec<Vec<f64>>) -> Result<(), QsrError> {
/// let bases = vec![BasisIndex::Computational; data.len()];
/// let config = QsrConfig::new(100, 1000).with_method_tag("Sr")?;
/// let mut qsr = Qsr::new(sampler, Sgd::new(0.01), BasisSet::new(), data, bases, config)?;
/// qsr.add_observable("SigmaZ", LocalOperator::sigma_z_sum(4));
/// qsr.run("output/run", 1000, 10, 50)?;
/// # Ok(())
/// # }
/// ```
pub struct Qsr<S: Sampler, O: Optimizer> {
    sampler: S,
    optimizer: O,
    rotations: BasisSet,
    corpus: TrainingCorpus,
    config: QsrConfig,
    solver: SrSolver,
    batches: MinibatchSampler,
    observables: ObservableManager,
    /// Negative-phase samples of the last completed step.
    last_samples: Vec<Vec<f64>>,
    step: usize,
    last_report: Option<StepReport>,
    nonconverged_solves: usize,
}

impl<S: Sampler, O: Optimizer> Qsr<S, O> {
    /// Builds the driver and validates the whole configuration.
    ///
    /// # Arguments
    /// * `sampler` - Draws model configurations; owns the model.
    /// * `optimizer` - Applies the update direction.
    /// * `rotations` - The measurement bases, indexed by `bases`.
    /// * `samples`, `bases` - The measurement corpus, paired 1:1.
    /// * `config` - Sizes, method and solver options.
    ///
    /// # Returns
    /// * `Err(QsrError::Configuration)` on an invalid option, mismatched or
    ///   ragged corpus, out-of-range basis index, or a sample width that
    ///   differs from the model's site count.
    pub fn new(
        sampler: S,
        optimizer: O,
        rotations: BasisSet,
        samples: Vec<Vec<f64>>,
        bases: Vec<BasisIndex>,
        config: QsrConfig,
    ) -> Result<Self, QsrError> {
        config.validate()?;
        let corpus = TrainingCorpus::new(samples, bases, config.discarded_samples_on_init)?;
        corpus.check_bases(rotations.len())?;

        let n_sites = sampler.machine().n_sites();
        if corpus.n_sites() != n_sites {
            return Err(QsrError::Configuration {
                message: format!("Corpus samples have {} sites but the model has {}", corpus.n_sites(), n_sites),
            });
        }

        let solver = SrSolver::from_config(&config);
        let batches = MinibatchSampler::new(corpus.len(), config.seed);
        info!(
            records = corpus.len(),
            discarded_on_init = corpus.discarded(),
            bases = rotations.len(),
            n_params = sampler.machine().n_params(),
            method = %config.method,
            solver = %solver.strategy(),
            "QSR driver initialized"
        );

        Ok(Self {
            sampler,
            optimizer,
            rotations,
            corpus,
            config,
            solver,
            batches,
            observables: ObservableManager::new(),
            last_samples: Vec::new(),
            step: 0,
            last_report: None,
            nonconverged_solves: 0,
        })
    }

    /// Like [`Qsr::new`] with basis indices in their raw integer form
    /// (`-1` for the computational basis).
    pub fn from_raw_bases(
        sampler: S,
        optimizer: O,
        rotations: BasisSet,
        samples: Vec<Vec<f64>>,
        bases: &[i64],
        config: QsrConfig,
    ) -> Result<Self, QsrError> {
        let bases = bases.iter().map(|&b| BasisIndex::from_raw(b)).collect::<Result<Vec<_>, _>>()?;
        Self::new(sampler, optimizer, rotations, samples, bases, config)
    }

    /// Tracks an observable; its statistics appear in
    /// [`get_observable_stats`](Self::get_observable_stats) and in the run log.
    pub fn add_observable<Op: Operator + 'static>(&mut self, name: impl Into<String>, op: Op) {
        self.observables.add(name, op);
    }

    /// Performs `steps` full update cycles.
    ///
    /// # Returns
    /// * `Err(QsrError::Step)` wrapping the first failure. The step counter
    ///   then equals the number of steps that completed.
    pub fn advance(&mut self, steps: usize) -> Result<(), QsrError> {
        for _ in 0..steps {
            let step = self.step;
            let position = self.batches.position();
            let report = match self.step_once() {
                Ok(report) => report,
                Err(e) => {
                    // A failed step hands its minibatch to the retry.
                    self.batches.rewind(position);
                    return Err(e.at_step(step));
                }
            };
            self.step += 1;
            info!(
                step = self.step,
                gradient_norm = report.gradient_norm,
                direction_norm = report.direction_norm,
                fallback = report.used_fallback,
                "step completed"
            );
            self.last_report = Some(report);
        }
        Ok(())
    }

    /// Lazy checkpoint sequence; each item advances `step_size` steps (fewer
    /// for the last one if `n_iter` is not a multiple) and yields the step
    /// counter. `None` means unbounded. A fresh call continues from the
    /// current step counter.
    pub fn iter(&mut self, n_iter: Option<usize>, step_size: usize) -> QsrIter<'_, S, O> {
        QsrIter::new(self, n_iter, step_size)
    }

    /// Trains for `n_iter` steps, checkpointing every `step_size` steps.
    ///
    /// At every checkpoint the observables are evaluated and the history is
    /// written to `<output_prefix>.log`; the model parameters are saved to
    /// `<output_prefix>.wf` whenever the step counter crosses a multiple of
    /// `save_params_every` (0 never saves).
    pub fn run(
        &mut self,
        output_prefix: impl AsRef<Path>,
        n_iter: usize,
        step_size: usize,
        save_params_every: usize,
    ) -> Result<(), QsrError> {
        let prefix = output_prefix.as_ref();
        let mut log = RunLog::new(prefix);
        let wf_path = output::prefixed_path(prefix, ".wf");

        let mut checkpoints = self.iter(Some(n_iter), step_size);
        let mut previous = checkpoints.qsr().step_count();
        while let Some(checkpoint) = checkpoints.next() {
            let step = checkpoint?;
            let qsr = checkpoints.qsr_mut();

            let stats = qsr.get_observable_stats().map_err(|e| e.at_step(step))?;
            log.record(step, stats).map_err(|e| e.at_step(step))?;

            if save_params_every > 0 && step / save_params_every > previous / save_params_every {
                qsr.machine().save(&wf_path).map_err(|e| e.at_step(step))?;
                debug!(step, path = %wf_path.display(), "parameters saved");
            }
            info!(step, log = %log.path().display(), "checkpoint written");
            previous = step;
        }
        Ok(())
    }

    /// Current statistics of every tracked observable, over the negative-phase
    /// samples of the last step. Samples are drawn first if no step has run.
    pub fn get_observable_stats(&mut self) -> Result<BTreeMap<String, Stats>, QsrError> {
        if self.observables.is_empty() {
            return Ok(BTreeMap::new());
        }
        if self.last_samples.is_empty() {
            self.last_samples = draw_samples(
                &mut self.sampler,
                self.config.n_samples,
                self.config.effective_discarded_samples(),
            )?;
        }
        self.observables.evaluate(self.sampler.machine(), &self.last_samples)
    }

    /// NLL of the current model on arbitrary rotated data.
    pub fn nll(&self, rotations: &BasisSet, samples: &[Vec<f64>], bases: &[BasisIndex]) -> Result<f64, QsrError> {
        negative_log_likelihood(self.sampler.machine(), rotations, samples, bases)
    }

    /// NLL of the current model on the usable training corpus.
    pub fn training_nll(&self) -> Result<f64, QsrError> {
        let samples: Vec<Vec<f64>> = self.corpus.records().iter().map(|r| r.sample().to_vec()).collect();
        let bases: Vec<BasisIndex> = self.corpus.records().iter().map(|r| r.basis()).collect();
        self.nll(&self.rotations, &samples, &bases)
    }

    /// Completed steps.
    pub fn step_count(&self) -> usize {
        self.step
    }

    /// Diagnostics of the most recent successful step.
    pub fn last_step_report(&self) -> Option<&StepReport> {
        self.last_report.as_ref()
    }

    /// Iterative solves that hit their cap so far.
    pub fn nonconverged_solves(&self) -> usize {
        self.nonconverged_solves
    }

    /// The model being trained.
    pub fn machine(&self) -> &S::Machine {
        self.sampler.machine()
    }

    /// The configuration sampler that owns the model.
    pub fn sampler(&self) -> &S {
        &self.sampler
    }

    /// The update rule and its state.
    pub fn optimizer(&self) -> &O {
        &self.optimizer
    }

    /// Options fixed at construction.
    pub fn config(&self) -> &QsrConfig {
        &self.config
    }

    /// Usable training records, burn-in prefix removed.
    pub fn corpus(&self) -> &TrainingCorpus {
        &self.corpus
    }

    /// One update cycle. Leaves the step counter alone.
    fn step_once(&mut self) -> Result<StepReport, QsrError> {
        let indices = self.batches.next_batch(self.config.batch_size);
        let samples = draw_samples(
            &mut self.sampler,
            self.config.n_samples,
            self.config.effective_discarded_samples(),
        )?;
        let n_sites = self.corpus.n_sites();
        if let Some(bad) = samples.iter().find(|s| s.len() != n_sites) {
            return Err(QsrError::Estimation {
                message: format!("Sampler produced a configuration with {} sites, expected {}", bad.len(), n_sites),
            });
        }
        let n_samples = samples.len();

        let estimate = {
            let records = self.corpus.records();
            let offset = self.corpus.discarded();
            let batch: Vec<(usize, &MeasurementRecord)> = indices.iter().map(|&i| (i + offset, &records[i])).collect();
            PhaseEstimator::new(self.sampler.machine(), &self.rotations).estimate(&batch, samples, self.config.method.needs_s_matrix())?
        };

        let gradient = estimate.nll_gradient();
        check_finite(&gradient, "gradient")?;
        let gradient_norm = l2_norm(&gradient);

        let mut solve = None;
        let mut used_fallback = false;
        let direction = match estimate.s_matrix() {
            None => gradient,
            Some(s) => match self.solver.solve(s, &gradient) {
                Ok(report) => {
                    if !report.converged {
                        self.nonconverged_solves += 1;
                        warn!(
                            step = self.step,
                            iterations = report.iterations,
                            residual = report.residual,
                            "SR solve did not converge; using best available direction"
                        );
                    }
                    solve = Some(SolveOutcome {
                        converged: report.converged,
                        iterations: report.iterations,
                        residual: report.residual,
                    });
                    report.direction
                }
                Err(e) => match self.config.solver_failure_policy {
                    SolverFailurePolicy::Abort => return Err(e),
                    SolverFailurePolicy::FallbackToGradient => {
                        warn!(step = self.step, error = %e, "SR solve failed; falling back to plain gradient");
                        used_fallback = true;
                        gradient
                    }
                },
            },
        };
        let direction_norm = l2_norm(&direction);

        let mut params = self.sampler.machine().parameters();
        self.optimizer.update(&direction, &mut params);
        check_finite(&params, "updated parameters")?;
        self.sampler.machine_mut().set_parameters(&params)?;

        self.last_samples = estimate.into_samples();
        Ok(StepReport { step: self.step, gradient_norm, direction_norm, n_samples, solve, used_fallback })
    }
}

impl<S: Sampler, O: Optimizer> std::fmt::Debug for Qsr<S, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Qsr")
            .field("step", &self.step)
            .field("records", &self.corpus.len())
            .field("rotations", &self.rotations)
            .field("config", &self.config)
            .field("observables", &self.observables)
            .finish()
    }
}
