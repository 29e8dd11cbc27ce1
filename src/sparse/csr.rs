//! `SparseMatrix` for `sprs::CsMat<f64>` (either storage order).

use super::traits::SparseMatrix;
use crate::error::{Error, Result};
use ndarray::{Array1, ArrayView1};
use sprs::{CsMat, TriMat};

impl SparseMatrix for CsMat<f64> {
    fn n_rows(&self) -> usize {
        self.rows()
    }

    fn n_cols(&self) -> usize {
        self.cols()
    }

    fn n_stored(&self) -> usize {
        self.nnz()
    }

    fn scale_rows(&self, v: ArrayView1<'_, f64>) -> Result<Self> {
        check_len(self.rows(), v.len())?;
        Ok(map_stored(self, |row, _, x| x * v[row]))
    }

    fn scale_cols(&self, v: ArrayView1<'_, f64>) -> Result<Self> {
        check_len(self.cols(), v.len())?;
        Ok(map_stored(self, |_, col, x| x * v[col]))
    }

    fn square(&self) -> Self {
        map_stored(self, |_, _, x| x * x)
    }

    fn row_sums(&self) -> Array1<f64> {
        let mut out = Array1::zeros(self.rows());
        for_each_stored(self, |row, _, x| out[row] += x);
        out
    }

    fn col_sums(&self) -> Array1<f64> {
        let mut out = Array1::zeros(self.cols());
        for_each_stored(self, |_, col, x| out[col] += x);
        out
    }

    fn dot_dense(&self, v: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        check_len(self.cols(), v.len())?;
        let mut out = Array1::zeros(self.rows());
        for_each_stored(self, |row, col, x| out[row] += x * v[col]);
        Ok(out)
    }
}

fn check_len(expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(Error::DimensionMismatch { expected, found });
    }
    Ok(())
}

/// Visit every stored entry as `(row, col, value)`.
fn for_each_stored(m: &CsMat<f64>, mut f: impl FnMut(usize, usize, f64)) {
    let csr = m.is_csr();
    for (outer, lane) in m.outer_iterator().enumerate() {
        for (inner, &x) in lane.iter() {
            if csr {
                f(outer, inner, x);
            } else {
                f(inner, outer, x);
            }
        }
    }
}

/// Rebuild `m` with the same structure and storage order, transforming each
/// stored value.
fn map_stored(m: &CsMat<f64>, mut f: impl FnMut(usize, usize, f64) -> f64) -> CsMat<f64> {
    let csr = m.is_csr();
    let mut indptr = Vec::with_capacity(m.outer_dims() + 1);
    let mut indices = Vec::with_capacity(m.nnz());
    let mut data = Vec::with_capacity(m.nnz());
    indptr.push(0);

    for (outer, lane) in m.outer_iterator().enumerate() {
        for (inner, &x) in lane.iter() {
            let (row, col) = if csr { (outer, inner) } else { (inner, outer) };
            indices.push(inner);
            data.push(f(row, col, x));
        }
        indptr.push(indices.len());
    }

    if csr {
        CsMat::new(m.shape(), indptr, indices, data)
    } else {
        CsMat::new_csc(m.shape(), indptr, indices, data)
    }
}

/// Build a CSR matrix from `(row, col, value)` triplets. Duplicate positions
/// are summed.
pub fn csr_from_triplets(shape: (usize, usize), triplets: &[(usize, usize, f64)]) -> Result<CsMat<f64>> {
    let (rows, cols) = shape;
    let mut tri = TriMat::<f64>::with_capacity(shape, triplets.len());
    for &(r, c, v) in triplets {
        if r >= rows {
            return Err(Error::DimensionMismatch {
                expected: rows,
                found: r + 1,
            });
        }
        if c >= cols {
            return Err(Error::DimensionMismatch {
                expected: cols,
                found: c + 1,
            });
        }
        tri.add_triplet(r, c, v);
    }
    Ok(tri.to_csr())
}

/// Build a CSR matrix from dense rows, storing only the non-zero entries.
pub fn csr_from_dense_rows(rows: &[Vec<f64>]) -> Result<CsMat<f64>> {
    let first = rows.first().ok_or(Error::EmptyInput)?;
    let d = first.len();

    let mut triplets = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        if row.len() != d {
            return Err(Error::DimensionMismatch {
                expected: d,
                found: row.len(),
            });
        }
        triplets.extend(
            row.iter()
                .enumerate()
                .filter(|&(_, &x)| x != 0.0)
                .map(|(j, &x)| (i, j, x)),
        );
    }
    csr_from_triplets((rows.len(), d), &triplets)
}
