// src/core/mod.rs

//! Core data structures and types

// Declare modules within core
pub mod error;
pub mod record;
pub mod corpus;

// Re-export public types for convenient access via `qsr::core::TypeName`
pub use error::{QsrError, StepIndex};
pub use record::{BasisIndex, MeasurementRecord};
pub use corpus::TrainingCorpus;

pub mod constants;
pub use constants::qsr_defaults;

/// Complex scalar used for amplitudes, log-derivatives and parameters.
pub type Complex64 = num_complex::Complex<f64>;
