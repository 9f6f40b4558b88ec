//! Small host-side matrix helpers shared across stages.

use nalgebra::{DMatrix, DVector};

use crate::error::{NcutError, Result};

/// Σ_j m[i, j] for every row i.
pub fn row_sums(m: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(m.nrows(), m.row_iter().map(|row| row.sum()))
}

/// Σ_i m[i, j] for every column j.
pub fn col_sums(m: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(m.ncols(), m.column_iter().map(|col| col.sum()))
}

/// Scale every row to unit L2 norm. All-zero rows stay zero.
pub fn normalize_rows(m: &DMatrix<f64>) -> DMatrix<f64> {
    let mut out = m.clone();
    for mut row in out.row_iter_mut() {
        let norm = row.norm();
        if norm > f64::EPSILON {
            row /= norm;
        }
    }
    out
}

/// Gather rows by index, preserving the order of `indices`.
pub fn select_rows(m: &DMatrix<f64>, indices: &[usize]) -> DMatrix<f64> {
    m.select_rows(indices.iter())
}

/// Reject NaN/Inf before they propagate into a decomposition.
pub fn ensure_finite(m: &DMatrix<f64>, what: &str) -> Result<()> {
    if m.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(NcutError::NumericalDegeneracy(format!(
            "{what} contains NaN or infinite entries"
        )))
    }
}

/// `ceil(a / b)` for positive `b`.
pub fn ceildiv(a: usize, b: usize) -> usize {
    a.div_ceil(b)
}

/// Split `0..len` into `n_chunks` contiguous ranges of near-equal size.
///
/// Earlier ranges take the remainder, so sizes differ by at most one.
pub fn chunk_ranges(len: usize, n_chunks: usize) -> Vec<std::ops::Range<usize>> {
    let n_chunks = n_chunks.clamp(1, len.max(1));
    let base = len / n_chunks;
    let extra = len % n_chunks;

    let mut ranges = Vec::with_capacity(n_chunks);
    let mut start = 0;
    for i in 0..n_chunks {
        let size = base + usize::from(i < extra);
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}

/// `m · diag(s)`: multiply column j by `s[j]`.
pub fn scale_columns(m: &DMatrix<f64>, s: &DVector<f64>) -> DMatrix<f64> {
    let mut out = m.clone();
    for (j, mut col) in out.column_iter_mut().enumerate() {
        col *= s[j];
    }
    out
}
