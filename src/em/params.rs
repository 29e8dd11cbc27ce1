//! Mixture parameters.

use super::engine::{expectation, log_joint};
use crate::error::{Error, Result};
use crate::sparse::SparseMatrix;
use crate::stable::log_sum_exp_rows;
use ndarray::{Array1, Array2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tolerance on `Σ w_k = 1` for caller-supplied weights.
const WEIGHT_SUM_EPSILON: f64 = 1e-6;

/// One mixture component.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusterParams {
    /// Mixing weight.
    pub weight: f64,
    /// Mean vector (length d).
    pub mean: Array1<f64>,
    /// Diagonal of the covariance matrix (length d).
    pub cov: Array1<f64>,
}

impl ClusterParams {
    /// Build a component.
    pub fn new(weight: f64, mean: Array1<f64>, cov: Array1<f64>) -> Self {
        Self { weight, mean, cov }
    }
}

/// Weights, means and diagonal covariances of all K components.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MixtureParams {
    clusters: Vec<ClusterParams>,
}

impl MixtureParams {
    /// Assemble parameters from parallel per-cluster lists and validate them.
    pub fn new(weights: Vec<f64>, means: Vec<Array1<f64>>, covs: Vec<Array1<f64>>) -> Result<Self> {
        let k = weights.len();
        if means.len() != k {
            return Err(Error::DimensionMismatch {
                expected: k,
                found: means.len(),
            });
        }
        if covs.len() != k {
            return Err(Error::DimensionMismatch {
                expected: k,
                found: covs.len(),
            });
        }
        let clusters = weights
            .into_iter()
            .zip(means)
            .zip(covs)
            .map(|((w, m), c)| ClusterParams::new(w, m, c))
            .collect();
        Self::from_clusters(clusters)
    }

    /// Wrap already-built components and validate them.
    pub fn from_clusters(clusters: Vec<ClusterParams>) -> Result<Self> {
        let params = Self { clusters };
        params.validate()?;
        Ok(params)
    }

    /// Check that the parameters describe a proper diagonal mixture: at
    /// least one component, consistent dimensions, positive weights summing
    /// to 1, strictly positive finite variances.
    pub fn validate(&self) -> Result<()> {
        let first = self.clusters.first().ok_or(Error::EmptyInput)?;
        let d = first.mean.len();
        if d == 0 {
            return Err(Error::EmptyInput);
        }

        for c in &self.clusters {
            if c.mean.len() != d {
                return Err(Error::DimensionMismatch {
                    expected: d,
                    found: c.mean.len(),
                });
            }
            if c.cov.len() != d {
                return Err(Error::DimensionMismatch {
                    expected: d,
                    found: c.cov.len(),
                });
            }
            if let Some((feature, &value)) = c
                .cov
                .iter()
                .enumerate()
                .find(|&(_, &v)| !(v > 0.0 && v.is_finite()))
            {
                return Err(Error::InvalidVariance { feature, value });
            }
            if c.mean.iter().any(|m| !m.is_finite()) {
                return Err(Error::InvalidParameter {
                    name: "mean",
                    message: "entries must be finite",
                });
            }
        }

        let sum: f64 = self.clusters.iter().map(|c| c.weight).sum();
        let all_positive = self.clusters.iter().all(|c| c.weight > 0.0 && c.weight <= 1.0);
        if !all_positive || (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(Error::InvalidWeights { sum });
        }
        Ok(())
    }

    /// Number of components K.
    pub fn n_clusters(&self) -> usize {
        self.clusters.len()
    }

    /// Feature dimension d.
    pub fn n_features(&self) -> usize {
        self.clusters.first().map_or(0, |c| c.mean.len())
    }

    /// All components.
    pub fn clusters(&self) -> &[ClusterParams] {
        &self.clusters
    }

    pub(crate) fn clusters_mut(&mut self) -> &mut [ClusterParams] {
        &mut self.clusters
    }

    /// Component `k`.
    pub fn cluster(&self, k: usize) -> Option<&ClusterParams> {
        self.clusters.get(k)
    }

    /// Mixing weights as a vector.
    pub fn weights(&self) -> Array1<f64> {
        self.clusters.iter().map(|c| c.weight).collect()
    }

    /// Means stacked as a K × d matrix.
    pub fn means(&self) -> Array2<f64> {
        self.stack(|c| &c.mean)
    }

    /// Diagonal covariances stacked as a K × d matrix.
    pub fn covs(&self) -> Array2<f64> {
        self.stack(|c| &c.cov)
    }

    fn stack(&self, field: impl Fn(&ClusterParams) -> &Array1<f64>) -> Array2<f64> {
        let mut out = Array2::zeros((self.n_clusters(), self.n_features()));
        for (mut row, c) in out.rows_mut().into_iter().zip(&self.clusters) {
            row.assign(field(c));
        }
        out
    }

    /// Mixture log-likelihood of each row of `x`: `log Σ_k w_k N(x_i | μ_k, Σ_k)`.
    pub fn score_samples<M: SparseMatrix + Sync>(&self, x: &M) -> Result<Array1<f64>> {
        let logresp = log_joint(x, &x.square(), self)?;
        Ok(log_sum_exp_rows(logresp.view()))
    }

    /// Total log-likelihood of `x` under these parameters.
    pub fn log_likelihood<M: SparseMatrix + Sync>(&self, x: &M) -> Result<f64> {
        Ok(self.score_samples(x)?.sum())
    }

    /// Responsibilities of each component for each row of `x` (an E-step
    /// without a parameter update).
    pub fn predict_proba<M: SparseMatrix + Sync>(&self, x: &M) -> Result<Array2<f64>> {
        Ok(expectation(x, &x.square(), self)?.resp)
    }
}
