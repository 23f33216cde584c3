// src/operator/mod.rs

//! Operators acting on configurations: measurement-basis rotations (the
//! rotation applicator) and single-site observables.
//!
//! Both are expressed through the [`Operator`](crate::traits::Operator) row
//! interface, so the phase estimator, the likelihood evaluator and the
//! observable bookkeeping all consume them the same way.

pub mod gates;
pub mod rotation;
pub mod local;

pub use gates::{LocalBasis, Matrix2};
pub use rotation::{BasisSet, LocalRotation, LocalStates};
pub use local::LocalOperator;
