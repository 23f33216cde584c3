// src/estimator/mod.rs

//! Gradient estimation: minibatch selection over the measurement corpus,
//! the positive (data) and negative (model) phases, and the S matrix.

pub mod batch;
pub mod phase;

pub use batch::{BatchPosition, MinibatchSampler};
pub use phase::{draw_samples, GradientEstimate, NegativePhase, PhaseEstimator};
