//! # spmix
//!
//! Gaussian mixtures with diagonal covariance, fitted by Expectation-Maximization
//! directly on sparse observation matrices.
//!
//! The numerical core is split into leaves and one engine:
//!
//! - [`sparse`]: the [`SparseMatrix`] capability set and the implicit diagonal
//!   operator [`DiagonalScale`].
//! - [`stable`]: log-sum-exp without overflow.
//! - [`density`]: per-row diagonal-Gaussian log-density without densifying rows.
//! - [`em`]: the E-step / M-step loop and its state machine.
//!
//! Choosing K, producing initial parameters and loading data are left to the
//! caller. Enable the `parallel` feature to run per-cluster work on rayon.

pub mod density;
pub mod em;
/// Error types used across `spmix`.
pub mod error;
pub mod sparse;
pub mod stable;

pub use density::{log_density, log_density_with_squares};
pub use em::{
    fit, fit_with_observer, ClusterParams, DegeneratePolicy, EmConfig, EmEngine, FitResult,
    FitStatus, IterationReport, MixtureParams, ProgressObserver,
};
pub use error::{Error, Result};
pub use sparse::{csr_from_dense_rows, csr_from_triplets, DiagonalScale, SparseMatrix};
pub use stable::{log_sum_exp, log_sum_exp_all, log_sum_exp_rows, LseAxis};

/// Re-export so callers can name the default observation matrix type.
pub use sprs::CsMat;
