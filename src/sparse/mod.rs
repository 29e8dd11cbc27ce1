//! Sparse observation matrices and diagonal scaling.
//!
//! The engine never subtracts a mean from a sparse row: doing so turns every
//! implicit zero into `-mean_j` and densifies the matrix. Everything it needs
//! is expressed through the [`SparseMatrix`] capability set instead:
//!
//! ```text
//! D(v) · X   scale rows         X · D(v)   scale columns
//! X ∘ X      elementwise square  X · v      sparse-dense product
//! Σ_j X_ij   row sums            Σ_i X_ij   column sums
//! ```
//!
//! [`DiagonalScale`] is the implicit diagonal operator `D(v)`. It never builds
//! the `m × m` matrix; applying it touches only the stored entries, so the
//! result keeps the input's sparsity pattern and stored-entry count.
//!
//! ```rust
//! use ndarray::array;
//! use spmix::sparse::{csr_from_dense_rows, DiagonalScale, SparseMatrix};
//!
//! let x = csr_from_dense_rows(&[vec![1.0, 0.0], vec![0.0, 2.0]]).unwrap();
//! let d = array![3.0, 0.5];
//!
//! let rows = DiagonalScale::new(d.view()).left_mul(&x).unwrap();
//! assert_eq!(rows.row_sums(), array![3.0, 1.0]);
//!
//! let cols = DiagonalScale::new(d.view()).right_mul(&x).unwrap();
//! assert_eq!(cols.col_sums(), array![3.0, 1.0]);
//! assert_eq!(cols.n_stored(), x.n_stored());
//! ```

mod csr;
mod traits;

pub use csr::{csr_from_dense_rows, csr_from_triplets};
pub use traits::SparseMatrix;

use crate::error::Result;
use ndarray::ArrayView1;

/// Implicit diagonal operator `D(v)`.
#[derive(Debug, Clone, Copy)]
pub struct DiagonalScale<'a> {
    diag: ArrayView1<'a, f64>,
}

impl<'a> DiagonalScale<'a> {
    /// Wrap `v` as the diagonal of `D(v)`.
    pub fn new(diag: ArrayView1<'a, f64>) -> Self {
        Self { diag }
    }

    /// Length of the diagonal.
    pub fn len(&self) -> usize {
        self.diag.len()
    }

    /// Whether the diagonal is empty.
    pub fn is_empty(&self) -> bool {
        self.diag.is_empty()
    }

    /// `D(v) · x`: row `i` of `x` scaled by `v[i]`.
    pub fn left_mul<M: SparseMatrix>(&self, x: &M) -> Result<M> {
        x.scale_rows(self.diag)
    }

    /// `x · D(v)`: column `j` of `x` scaled by `v[j]`.
    pub fn right_mul<M: SparseMatrix>(&self, x: &M) -> Result<M> {
        x.scale_cols(self.diag)
    }
}
