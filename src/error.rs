use thiserror::Error;

/// Result alias for `spmix`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the sparse primitives, the density evaluator and the EM engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Input was empty (no rows, no features, or no clusters).
    #[error("empty input provided")]
    EmptyInput,

    /// Vector length does not match the matrix dimension it is applied to.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Found dimension.
        found: usize,
    },

    /// A covariance entry handed to the density was not strictly positive and finite.
    #[error("variance must be positive and finite (got {value} at feature {feature})")]
    InvalidVariance {
        /// Feature index.
        feature: usize,
        /// Offending value.
        value: f64,
    },

    /// Mixing weights do not form a probability vector.
    #[error("mixing weights must be non-negative and sum to 1 (got sum {sum})")]
    InvalidWeights {
        /// Observed sum.
        sum: f64,
    },

    /// A cluster's effective count reached zero during the M-step.
    #[error("cluster {cluster} has zero effective count at iteration {iteration}")]
    DegenerateCluster {
        /// Cluster index.
        cluster: usize,
        /// Zero-based iteration in which the collapse happened.
        iteration: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: &'static str,
    },

    /// Array shape error from `ndarray`.
    #[error("shape error: {0}")]
    Shape(String),
}

impl From<ndarray::ShapeError> for Error {
    fn from(e: ndarray::ShapeError) -> Self {
        Error::Shape(e.to_string())
    }
}
