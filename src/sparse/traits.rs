//! Sparse-matrix capability trait.

use crate::error::Result;
use ndarray::{Array1, ArrayView1};

/// The operations the density evaluator and the EM engine need from an
/// observation matrix.
///
/// Every transforming operation returns a matrix with the same sparsity
/// pattern as its input: stored entries stay stored (even if they become
/// zero) and nothing implicit is ever materialized.
pub trait SparseMatrix: Sized {
    /// Number of rows (observations).
    fn n_rows(&self) -> usize;

    /// Number of columns (features).
    fn n_cols(&self) -> usize;

    /// Number of explicitly stored entries.
    fn n_stored(&self) -> usize;

    /// `D(v) · X`: scale row `i` by `v[i]`.
    ///
    /// Fails with `DimensionMismatch` unless `v.len() == n_rows()`.
    fn scale_rows(&self, v: ArrayView1<'_, f64>) -> Result<Self>;

    /// `X · D(v)`: scale column `j` by `v[j]`.
    ///
    /// Fails with `DimensionMismatch` unless `v.len() == n_cols()`.
    fn scale_cols(&self, v: ArrayView1<'_, f64>) -> Result<Self>;

    /// Elementwise square of the stored entries.
    fn square(&self) -> Self;

    /// Sum of each row (length `n_rows()`).
    fn row_sums(&self) -> Array1<f64>;

    /// Sum of each column (length `n_cols()`).
    fn col_sums(&self) -> Array1<f64>;

    /// `X · v` for a dense `v` of length `n_cols()`.
    fn dot_dense(&self, v: ArrayView1<'_, f64>) -> Result<Array1<f64>>;
}
