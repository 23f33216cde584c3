//! Default values shared by the configuration layer and the solvers.

/// Defaults applied when an option is not set explicitly.
pub mod qsr_defaults {
    /// Regularization added to the diagonal of the S matrix.
    pub const DIAG_SHIFT: f64 = 0.01;
    /// Relative residual at which the conjugate-gradient solve stops.
    pub const CG_TOLERANCE: f64 = 1e-3;
    /// Fraction of `n_samples` thrown away as burn-in when `discarded_samples` is unset.
    pub const AUTO_DISCARD_FRACTION: usize = 10;
    /// Raw basis index meaning "measured in the computational basis".
    pub const COMPUTATIONAL_BASIS_SENTINEL: i64 = -1;
}
