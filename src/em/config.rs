//! EM configuration.

use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What the M-step does with a cluster whose effective count is (numerically) zero.
///
/// Dividing by that count would turn the cluster's mean and covariance into
/// NaN, so the engine never does it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DegeneratePolicy {
    /// Keep the cluster's previous mean and covariance (floored at
    /// `cov_smoothing`), set its weight to its near-zero share, possibly 0,
    /// record a [`DegenerateEvent`](super::DegenerateEvent) and continue.
    #[default]
    Freeze,
    /// Abort the fit with [`Error::DegenerateCluster`].
    Reject,
}

/// Configuration for one EM fit.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EmConfig {
    /// Added to every re-estimated variance. Features a cluster never sees
    /// get exactly this variance instead of zero.
    ///
    /// `0.0` is accepted, but then a feature that is constant over a
    /// cluster's points gets variance exactly 0, and the next E-step fails
    /// with [`Error::InvalidVariance`], losing the fit.
    pub cov_smoothing: f64,
    /// Upper bound on EM iterations.
    pub max_iterations: usize,
    /// Stop once the log-likelihood improves by less than this.
    pub convergence_threshold: f64,
    /// Emit each iteration's log-likelihood at `info` level.
    pub verbose: bool,
    /// Handling of clusters with zero effective count.
    pub degenerate_policy: DegeneratePolicy,
}

impl Default for EmConfig {
    fn default() -> Self {
        Self {
            cov_smoothing: 1e-5,
            max_iterations: 1000,
            convergence_threshold: 1e-4,
            verbose: false,
            degenerate_policy: DegeneratePolicy::Freeze,
        }
    }
}

impl EmConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the variance floor.
    pub fn with_cov_smoothing(mut self, cov_smoothing: f64) -> Self {
        self.cov_smoothing = cov_smoothing;
        self
    }

    /// Set maximum iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the log-likelihood improvement threshold.
    pub fn with_convergence_threshold(mut self, threshold: f64) -> Self {
        self.convergence_threshold = threshold;
        self
    }

    /// Log every iteration's log-likelihood at `info` level.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set the degenerate-cluster policy.
    pub fn with_degenerate_policy(mut self, policy: DegeneratePolicy) -> Self {
        self.degenerate_policy = policy;
        self
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.cov_smoothing >= 0.0 && self.cov_smoothing.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "cov_smoothing",
                message: "must be finite and >= 0",
            });
        }
        if self.max_iterations == 0 {
            return Err(Error::InvalidParameter {
                name: "max_iterations",
                message: "must be > 0",
            });
        }
        if !(self.convergence_threshold > 0.0) {
            return Err(Error::InvalidParameter {
                name: "convergence_threshold",
                message: "must be > 0",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let c = EmConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.cov_smoothing, 1e-5);
        assert_eq!(c.max_iterations, 1000);
        assert_eq!(c.convergence_threshold, 1e-4);
        assert!(!c.verbose);
        assert_eq!(c.degenerate_policy, DegeneratePolicy::Freeze);
    }

    #[test]
    fn rejects_bad_ranges() {
        assert!(EmConfig::new().with_cov_smoothing(-1.0).validate().is_err());
        assert!(EmConfig::new()
            .with_cov_smoothing(f64::NAN)
            .validate()
            .is_err());
        assert!(EmConfig::new().with_max_iterations(0).validate().is_err());
        assert!(EmConfig::new()
            .with_convergence_threshold(0.0)
            .validate()
            .is_err());
        // Zero smoothing is allowed.
        assert!(EmConfig::new().with_cov_smoothing(0.0).validate().is_ok());
    }
}
