//! Sparse matrix helpers for assembling Jacobian blocks.
//!
//! All routines work directly on the compressed storage of [`CsrMatrix`], so no
//! intermediate COO assembly is needed when stacking or slicing blocks.

use nalgebra::Scalar;
use nalgebra_sparse::CsrMatrix;
use num::One;
use std::cmp::{max, min};
use std::error::Error;
use std::fmt;
use std::ops::{Mul, Range};

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SparseShapeError {
    /// Vertically stacked matrices must all have the same number of columns.
    ColumnMismatch { expected: usize, found: usize },
    /// The requested rows are not contained in the matrix.
    RowsOutOfBounds { rows: Range<usize>, nrows: usize },
    /// The number of row factors does not match the number of rows to produce.
    FactorMismatch { expected: usize, found: usize },
    /// Broadcasting requires a matrix with a single row.
    NotARow { nrows: usize },
}

impl fmt::Display for SparseShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ColumnMismatch { expected, found } => {
                write!(f, "Cannot stack matrix with {} columns onto matrices with {} columns.", found, expected)
            }
            Self::RowsOutOfBounds { rows, nrows } => {
                write!(f, "Rows {:?} are out of bounds for matrix with {} rows.", rows, nrows)
            }
            Self::FactorMismatch { expected, found } => {
                write!(f, "Expected {} row factors, got {}.", expected, found)
            }
            Self::NotARow { nrows } => {
                write!(f, "Can only broadcast a single row, but matrix has {} rows.", nrows)
            }
        }
    }
}

impl Error for SparseShapeError {}

fn from_valid_csr_data<T>(
    nrows: usize,
    ncols: usize,
    row_offsets: Vec<usize>,
    col_indices: Vec<usize>,
    values: Vec<T>,
) -> CsrMatrix<T> {
    CsrMatrix::try_from_csr_data(nrows, ncols, row_offsets, col_indices, values)
        .expect("Rearranging valid CSR storage must produce valid CSR storage")
}

/// Stacks the given matrices vertically, in order.
///
/// An empty list of matrices produces a `0 x 0` matrix.
pub fn vstack<T: Scalar>(matrices: &[CsrMatrix<T>]) -> Result<CsrMatrix<T>, SparseShapeError> {
    let Some(first) = matrices.first() else {
        return Ok(CsrMatrix::zeros(0, 0));
    };

    let ncols = first.ncols();
    let nrows = matrices.iter().map(CsrMatrix::nrows).sum();
    let nnz = matrices.iter().map(CsrMatrix::nnz).sum();

    let mut row_offsets = Vec::with_capacity(nrows + 1);
    let mut col_indices = Vec::with_capacity(nnz);
    let mut values = Vec::with_capacity(nnz);
    row_offsets.push(0);

    for matrix in matrices {
        if matrix.ncols() != ncols {
            return Err(SparseShapeError::ColumnMismatch {
                expected: ncols,
                found: matrix.ncols(),
            });
        }
        let (offsets, cols, vals) = matrix.csr_data();
        let base = col_indices.len();
        row_offsets.extend(offsets.iter().skip(1).map(|offset| base + offset));
        col_indices.extend_from_slice(cols);
        values.extend_from_slice(vals);
    }

    Ok(from_valid_csr_data(nrows, ncols, row_offsets, col_indices, values))
}

/// Extracts the contiguous block of rows `rows` from the matrix.
pub fn select_rows<T: Scalar>(matrix: &CsrMatrix<T>, rows: Range<usize>) -> Result<CsrMatrix<T>, SparseShapeError> {
    if rows.start > rows.end || rows.end > matrix.nrows() {
        return Err(SparseShapeError::RowsOutOfBounds {
            rows,
            nrows: matrix.nrows(),
        });
    }

    let (offsets, cols, vals) = matrix.csr_data();
    let begin = offsets[rows.start];
    let end = offsets[rows.end];
    let row_offsets = offsets[rows.start..=rows.end]
        .iter()
        .map(|offset| offset - begin)
        .collect();

    Ok(from_valid_csr_data(
        rows.len(),
        matrix.ncols(),
        row_offsets,
        cols[begin..end].to_vec(),
        vals[begin..end].to_vec(),
    ))
}

/// Multiplies row `i` of the matrix by `factors[i]`.
pub fn scale_rows<T>(matrix: &CsrMatrix<T>, factors: &[T]) -> Result<CsrMatrix<T>, SparseShapeError>
where
    T: Scalar + Copy + Mul<Output = T>,
{
    if factors.len() != matrix.nrows() {
        return Err(SparseShapeError::FactorMismatch {
            expected: matrix.nrows(),
            found: factors.len(),
        });
    }

    let (offsets, cols, vals) = matrix.csr_data();
    let mut values = vals.to_vec();
    for (row, factor) in factors.iter().enumerate() {
        for value in &mut values[offsets[row]..offsets[row + 1]] {
            *value = *value * *factor;
        }
    }

    Ok(from_valid_csr_data(
        matrix.nrows(),
        matrix.ncols(),
        offsets.to_vec(),
        cols.to_vec(),
        values,
    ))
}

/// Repeats a single-row matrix once per factor, scaling the `i`-th copy by `factors[i]`.
pub fn broadcast_row<T>(row: &CsrMatrix<T>, factors: &[T]) -> Result<CsrMatrix<T>, SparseShapeError>
where
    T: Scalar + Copy + Mul<Output = T>,
{
    if row.nrows() != 1 {
        return Err(SparseShapeError::NotARow { nrows: row.nrows() });
    }

    let (_, cols, vals) = row.csr_data();
    let nnz_per_row = cols.len();
    let row_offsets = (0..=factors.len()).map(|i| i * nnz_per_row).collect();
    let mut col_indices = Vec::with_capacity(nnz_per_row * factors.len());
    let mut values = Vec::with_capacity(nnz_per_row * factors.len());
    for factor in factors {
        col_indices.extend_from_slice(cols);
        values.extend(vals.iter().map(|v| *v * *factor));
    }

    Ok(from_valid_csr_data(factors.len(), row.ncols(), row_offsets, col_indices, values))
}

/// Builds the `rows.len() x cols.len()` matrix which has a one at `(i - rows.start, i - cols.start)`
/// for every global index `i` contained in both ranges, and zeros elsewhere.
///
/// This is the derivative of reading the entries `rows` of a global vector with respect to
/// the entries `cols` of the same vector.
pub fn index_coincidence<T: Scalar + One>(rows: Range<usize>, cols: Range<usize>) -> CsrMatrix<T> {
    let overlap = max(rows.start, cols.start)..min(rows.end, cols.end);

    let mut row_offsets = Vec::with_capacity(rows.len() + 1);
    let mut col_indices = Vec::with_capacity(overlap.len());
    row_offsets.push(0);
    for global in rows.clone() {
        if overlap.contains(&global) {
            col_indices.push(global - cols.start);
        }
        row_offsets.push(col_indices.len());
    }
    let values = vec![T::one(); col_indices.len()];

    from_valid_csr_data(rows.len(), cols.len(), row_offsets, col_indices, values)
}
