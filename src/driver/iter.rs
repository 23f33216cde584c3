// src/driver/iter.rs

use super::Qsr;
use crate::core::QsrError;
use crate::traits::{Optimizer, Sampler};

/// Cursor over training checkpoints, returned by [`Qsr::iter`].
///
/// Holds only the steps still to run; every pull calls
/// [`Qsr::advance`]. After an error the error is yielded once and the cursor
/// is finished.
pub struct QsrIter<'a, S: Sampler, O: Optimizer> {
    qsr: &'a mut Qsr<S, O>,
    remaining: Option<usize>,
    step_size: usize,
    finished: bool,
}

impl<'a, S: Sampler, O: Optimizer> QsrIter<'a, S, O> {
    pub(crate) fn new(qsr: &'a mut Qsr<S, O>, n_iter: Option<usize>, step_size: usize) -> Self {
        Self { qsr, remaining: n_iter, step_size, finished: false }
    }

    /// The driver being advanced.
    pub fn qsr(&self) -> &Qsr<S, O> {
        &*self.qsr
    }

    /// Mutable access between pulls, e.g. to evaluate observables.
    pub fn qsr_mut(&mut self) -> &mut Qsr<S, O> {
        &mut *self.qsr
    }

    /// Steps still to run; `None` when unbounded.
    pub fn remaining(&self) -> Option<usize> {
        self.remaining
    }
}

impl<S: Sampler, O: Optimizer> Iterator for QsrIter<'_, S, O> {
    type Item = Result<usize, QsrError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if self.step_size == 0 {
            self.finished = true;
            return Some(Err(QsrError::Configuration { message: "step_size must be positive".to_string() }));
        }
        let steps = match self.remaining {
            Some(0) => {
                self.finished = true;
                return None;
            }
            Some(remaining) => remaining.min(self.step_size),
            None => self.step_size,
        };

        match self.qsr.advance(steps) {
            Ok(()) => {
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining -= steps;
                }
                Some(Ok(self.qsr.step_count()))
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
