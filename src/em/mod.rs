//! Expectation-Maximization for diagonal Gaussian mixtures on sparse data.
//!
//! # The Model
//!
//! ```text
//! P(x) = Σ_k w_k × N(x | μ_k, diag(σ²_k))
//! ```
//!
//! A diagonal covariance makes every feature an independent Gaussian inside a
//! cluster, so each component costs `O(d)` parameters instead of `O(d²)`. For
//! bag-of-words style data with tens of thousands of features that is the
//! difference between feasible and not.
//!
//! # The Loop
//!
//! **E-step**: `log r_ik = ln w_k + log N(x_i | μ_k, σ²_k) - log Σ_j (…)`,
//! normalized with [`log_sum_exp_rows`](crate::stable::log_sum_exp_rows).
//! The per-row normalizers summed give the iteration's log-likelihood.
//!
//! **M-step**: `w_k = N_k / n`, `μ_k` the responsibility-weighted mean,
//! `σ²_k` the weighted second moment about `μ_k` plus `cov_smoothing`. Every
//! weighted sum is a row scaling `D(r_k)·X` followed by column sums, so the
//! sparse matrix is never densified.
//!
//! **Stop** when the log-likelihood improves by less than
//! `convergence_threshold` (and is finite), or after `max_iterations`.
//!
//! ```text
//!            ┌── Δll < threshold ──▶ Converged
//! Running ───┤
//!            └── iterations = max ──▶ MaxedOut
//! ```
//!
//! # Failure Modes
//!
//! - **Local optima**: EM only climbs; the initialization decides which hill.
//! - **Zero-variance features**: a feature a cluster never sees would get
//!   variance 0, i.e. infinite confidence it never appears. `cov_smoothing`
//!   puts a floor under it.
//! - **Empty clusters**: see [`DegeneratePolicy`].
//!
//! # Usage
//!
//! ```rust
//! use ndarray::array;
//! use spmix::em::{fit, EmConfig, MixtureParams};
//! use spmix::sparse::csr_from_dense_rows;
//!
//! let x = csr_from_dense_rows(&[
//!     vec![0.0, 0.0],
//!     vec![0.0, 1.0],
//!     vec![5.0, 5.0],
//!     vec![5.0, 6.0],
//! ])
//! .unwrap();
//! let init = MixtureParams::new(
//!     vec![0.5, 0.5],
//!     vec![array![0.0, 0.0], array![5.0, 5.0]],
//!     vec![array![1.0, 1.0], array![1.0, 1.0]],
//! )
//! .unwrap();
//!
//! let result = fit(&x, &init, EmConfig::default()).unwrap();
//! assert!(result.converged());
//! assert_eq!(result.assignments(), vec![0, 0, 1, 1]);
//! ```

mod config;
mod engine;
mod observer;
mod params;
mod result;

pub use config::{DegeneratePolicy, EmConfig};
pub use engine::{fit, fit_with_observer, EmEngine, DEGENERATE_COUNT};
pub use observer::{IterationReport, NoopObserver, ProgressObserver};
pub use params::{ClusterParams, MixtureParams};
pub use result::{DegenerateEvent, FitResult, FitStatus};
