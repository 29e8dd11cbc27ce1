//! Diagonal-covariance Gaussian log-density over sparse rows.
//!
//! The textbook form needs `Σ_j (x_ij - μ_j)² / σ²_j`. Computing it by
//! subtracting `μ` from each row densifies a sparse matrix, so instead:
//!
//! 1. scale column `j` of `X` (and entry `j` of `μ`) by `s_j = 1 / sqrt(2σ²_j)`;
//! 2. the squared Euclidean distance between scaled row and scaled mean is
//!    then exactly `Σ_j (x_ij - μ_j)² / (2σ²_j)`;
//! 3. expand it as `‖x̃_i‖² + ‖μ̃‖² - 2 x̃_i·μ̃`, which needs only the stored
//!    entries of `x̃_i` plus one dense norm.
//!
//! The log-density is then
//!
//! ```text
//! log N(x_i | μ, diag(σ²)) = -Σ_j log sqrt(2π σ²_j) - dist²_i
//! ```
//!
//! where the first term is shared by every row.

use crate::error::{Error, Result};
use crate::sparse::{DiagonalScale, SparseMatrix};
use ndarray::{Array1, ArrayView1, Zip};

/// Log-density of `N(mean, diag(cov))` at every row of `x`.
///
/// Fails with `DimensionMismatch` if `mean` or `cov` does not have one entry
/// per column of `x`, and with `InvalidVariance` if a covariance entry is not
/// strictly positive and finite.
pub fn log_density<M: SparseMatrix>(
    x: &M,
    mean: ArrayView1<'_, f64>,
    cov: ArrayView1<'_, f64>,
) -> Result<Array1<f64>> {
    log_density_with_squares(x, &x.square(), mean, cov)
}

/// [`log_density`] with `x ∘ x` supplied by the caller, so repeated
/// evaluations over the same data (one per cluster per E-step) square it
/// only once.
pub fn log_density_with_squares<M: SparseMatrix>(
    x: &M,
    x_sq: &M,
    mean: ArrayView1<'_, f64>,
    cov: ArrayView1<'_, f64>,
) -> Result<Array1<f64>> {
    let d = x.n_cols();
    if x_sq.n_rows() != x.n_rows() || x_sq.n_cols() != d {
        return Err(Error::Shape(format!(
            "squares are {}x{}, data is {}x{}",
            x_sq.n_rows(),
            x_sq.n_cols(),
            x.n_rows(),
            d
        )));
    }
    if mean.len() != d {
        return Err(Error::DimensionMismatch {
            expected: d,
            found: mean.len(),
        });
    }
    if cov.len() != d {
        return Err(Error::DimensionMismatch {
            expected: d,
            found: cov.len(),
        });
    }
    if let Some((feature, &value)) = cov
        .iter()
        .enumerate()
        .find(|&(_, &c)| !(c > 0.0 && c.is_finite()))
    {
        return Err(Error::InvalidVariance { feature, value });
    }

    let scale = cov.mapv(|c| 1.0 / (2.0 * c).sqrt());
    let scaled_x = DiagonalScale::new(scale.view()).right_mul(x)?;
    let scaled_mean = &mean * &scale;

    let log_norm: f64 = cov
        .iter()
        .map(|&c| (2.0 * std::f64::consts::PI * c).sqrt().ln())
        .sum();

    // ‖x̃_i‖² = Σ_j x_ij² s_j², read off the cached squares.
    let row_norms = x_sq.dot_dense(scale.mapv(|s| s * s).view())?;
    let cross = scaled_x.dot_dense(scaled_mean.view())?;
    let dist = expand_distances(&row_norms, &cross, scaled_mean.dot(&scaled_mean));
    Ok(dist.mapv(|d2| -log_norm - d2))
}

/// Squared Euclidean distance from every row of `x` to one dense `point`,
/// as `‖x_i‖² + ‖p‖² - 2 x_i·p`.
///
/// Round-off can push the expansion slightly below zero when a row sits on
/// the point; those values are clamped to 0. A norm that overflows makes the
/// distance `+inf` rather than `inf - inf = NaN`.
pub fn squared_distances_to_point<M: SparseMatrix>(
    x: &M,
    point: ArrayView1<'_, f64>,
) -> Result<Array1<f64>> {
    let cross = x.dot_dense(point)?;
    let row_norms = x.square().row_sums();
    Ok(expand_distances(&row_norms, &cross, point.dot(&point)))
}

fn expand_distances(row_norms: &Array1<f64>, cross: &Array1<f64>, point_norm: f64) -> Array1<f64> {
    let mut out: Array1<f64> = Array1::zeros(row_norms.len());
    Zip::from(&mut out)
        .and(row_norms)
        .and(cross)
        .for_each(|o, &a, &c| {
            *o = if a == f64::INFINITY || point_norm == f64::INFINITY {
                f64::INFINITY
            } else {
                (a + point_norm - 2.0 * c).max(0.0)
            };
        });
    out
}
