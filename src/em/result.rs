//! Fit outcome.

use super::params::MixtureParams;
use ndarray::{Array2, Axis};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// EM state machine: `Running → {Converged, MaxedOut}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FitStatus {
    /// More iterations to go.
    Running,
    /// The log-likelihood improvement fell below the threshold.
    Converged,
    /// `max_iterations` completed without converging.
    MaxedOut,
}

impl FitStatus {
    /// Whether no further iterations will run.
    pub fn is_terminal(self) -> bool {
        !matches!(self, FitStatus::Running)
    }
}

/// A cluster whose effective count collapsed, frozen under
/// [`DegeneratePolicy::Freeze`](super::DegeneratePolicy::Freeze).
///
/// A frozen cluster keeps its mean, has its covariance raised to at least
/// `cov_smoothing`, and takes weight `count / n`. That weight can be exactly
/// 0, in which case the fitted parameters no longer pass
/// [`MixtureParams::validate`] and the cluster scores `-inf` everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DegenerateEvent {
    /// Zero-based iteration.
    pub iteration: usize,
    /// Cluster index.
    pub cluster: usize,
    /// The effective count that triggered the freeze.
    pub count: f64,
}

/// Terminal snapshot of one EM run.
#[derive(Debug, Clone)]
pub struct FitResult {
    /// Parameters after the last M-step.
    pub params: MixtureParams,
    /// Responsibilities from the last E-step (n × K).
    pub responsibilities: Array2<f64>,
    /// One log-likelihood per completed iteration.
    pub log_likelihood_trace: Vec<f64>,
    /// `Converged` or `MaxedOut`.
    pub status: FitStatus,
    /// Clusters frozen along the way.
    pub degenerate_events: Vec<DegenerateEvent>,
}

impl FitResult {
    /// Number of completed iterations.
    pub fn iterations(&self) -> usize {
        self.log_likelihood_trace.len()
    }

    /// Whether the run stopped on the likelihood threshold.
    pub fn converged(&self) -> bool {
        self.status == FitStatus::Converged
    }

    /// Last log-likelihood in the trace.
    pub fn final_log_likelihood(&self) -> Option<f64> {
        self.log_likelihood_trace.last().copied()
    }

    /// Hard assignment of every row to its most responsible cluster.
    pub fn assignments(&self) -> Vec<usize> {
        self.responsibilities
            .axis_iter(Axis(0))
            .map(|row| {
                row.iter()
                    .enumerate()
                    .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
                    .map(|(i, _)| i)
                    .unwrap_or(0)
            })
            .collect()
    }
}
