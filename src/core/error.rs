//! Error handling logic

use std::fmt;

/// Zero-based index of an optimization step, as counted by the iteration cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepIndex(pub usize);

impl fmt::Display for StepIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Step({})", self.0)
    }
}

/// Error types raised by the reconstruction engine.
///
/// Construction-time problems surface as [`QsrError::Configuration`]. Anything
/// that goes wrong while a step is in flight is wrapped in [`QsrError::Step`]
/// by the iteration controller, so callers of `advance`/`iter`/`run` always
/// learn which step failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QsrError {
    /// Mismatched corpus lengths, an invalid basis index, an unknown method tag
    /// or any other option that fails validation.
    #[error("Configuration Error: {message}")]
    Configuration {
        /// Configuration failure message
        message: String,
    },

    /// A phase statistic could not be estimated (e.g. the sampler ran dry
    /// after burn-in, or the model gives zero weight to an observed record).
    #[error("Estimation Failure: {message}")]
    Estimation {
        /// Estimation failure message
        message: String,
    },

    /// The regularized S matrix could not be factorized by the direct solver.
    #[error("Solver Failure: {message}")]
    Solver {
        /// Solver failure message
        message: String,
    },

    /// A sample with identically zero amplitude in every rotated configuration.
    #[error("Numeric Degeneracy (record {record}): {message}")]
    NumericDegeneracy {
        /// Position of the offending record in the evaluated dataset.
        record: usize,
        /// Degeneracy failure message
        message: String,
    },

    /// A collaborator (model, sampler, optimizer) rejected an operation.
    #[error("Model Error: {message}")]
    Model {
        /// Model failure message
        message: String,
    },

    /// Writing run output (log or parameter snapshot) failed.
    #[error("Persistence Error: {message}")]
    Persistence {
        /// Persistence failure message
        message: String,
    },

    /// A fatal failure raised while performing the given step, or while
    /// writing the checkpoint that follows it in `run`.
    #[error("{step} failed: {source}")]
    Step {
        /// The step that was in progress.
        step: StepIndex,
        /// The underlying failure.
        #[source]
        source: Box<QsrError>,
    },
}

impl QsrError {
    /// Wraps `self` with the index of the step that was in flight.
    /// Errors that already carry a step index are returned unchanged.
    pub fn at_step(self, step: usize) -> Self {
        match self {
            QsrError::Step { .. } => self,
            other => QsrError::Step {
                step: StepIndex(step),
                source: Box::new(other),
            },
        }
    }

    /// Returns the step index if this error was raised mid-step.
    pub fn step(&self) -> Option<StepIndex> {
        match self {
            QsrError::Step { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Strips any `Step` wrapper and returns the root failure.
    pub fn root(&self) -> &QsrError {
        match self {
            QsrError::Step { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<std::io::Error> for QsrError {
    fn from(err: std::io::Error) -> Self {
        QsrError::Persistence { message: err.to_string() }
    }
}

impl From<serde_json::Error> for QsrError {
    fn from(err: serde_json::Error) -> Self {
        QsrError::Persistence { message: err.to_string() }
    }
}
