//! Discretization of a continuous spectral embedding (axis alignment).
//!
//! Multiclass spectral clustering (Yu & Shi, 2003): find the rotation R that
//! best aligns the row-normalized embedding X [N, k] with a one-hot partition,
//! alternating between
//!   - labels  = argmax_c (X Rᵀ)[i, c]
//!   - M       = Σ_{i: label=c} X[i, :]   (row c of a k×k matrix)
//!   - R       = U Vᵀ  where M = U S Vᵀ   (orthogonal Procrustes)
//! and stopping when ‖M‖_F stops moving (single-precision epsilon).
//!
//! Running out of iterations is not an error: the last iterate is returned
//! with `converged = false`.

use log::{debug, info, warn};
use nalgebra::DMatrix;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::error::{NcutError, Result};
use crate::linalg::normalize_rows;

/// Output of axis alignment.
#[derive(Debug, Clone)]
pub struct AxisAlignment {
    /// [N, k], exactly one 1.0 per row.
    pub one_hot: DMatrix<f64>,
    /// [k, k] final rotation.
    pub rotation: DMatrix<f64>,
    /// [N] cluster id per row, the column of the 1.0 in `one_hot`.
    pub labels: Vec<usize>,
    pub iterations: usize,
    pub converged: bool,
}

impl AxisAlignment {
    /// Number of rows assigned to each cluster.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.one_hot.ncols()];
        for &c in &self.labels {
            sizes[c] += 1;
        }
        sizes
    }
}

/// Discretize `vectors` [N, k] into a one-hot partition.
pub fn axis_align(vectors: &DMatrix<f64>, max_iter: usize, seed: u64) -> Result<AxisAlignment> {
    let (n, k) = vectors.shape();
    if n == 0 {
        return Err(NcutError::EmptyInput("embedding to discretize".into()));
    }
    if k == 0 {
        return Err(NcutError::Configuration(
            "axis alignment needs at least one component".into(),
        ));
    }

    info!("Axis alignment: {} rows × {} components, max_iter={}", n, k, max_iter);

    let x = normalize_rows(vectors);
    let mut rotation = initial_rotation(&x, seed);

    let eps = f64::from(f32::EPSILON);
    let mut prev_objective = f64::INFINITY;
    let mut labels = argmax_rows(&(&x * rotation.transpose()));
    let mut iterations = 0;
    let mut converged = false;

    for _ in 0..max_iter {
        iterations += 1;
        labels = argmax_rows(&(&x * rotation.transpose()));

        let mut m = DMatrix::<f64>::zeros(k, k);
        for (i, &c) in labels.iter().enumerate() {
            let mut target = m.row_mut(c);
            target += x.row(i);
        }

        let objective = m.norm();
        if (objective - prev_objective).abs() < eps {
            converged = true;
            break;
        }
        prev_objective = objective;

        let svd = m.svd(true, true);
        match (svd.u, svd.v_t) {
            (Some(u), Some(v_t)) => rotation = u * v_t,
            _ => {
                warn!("Procrustes SVD failed at iteration {}, keeping last rotation", iterations);
                break;
            }
        }
    }

    if converged {
        debug!("Axis alignment converged after {} iterations", iterations);
    } else {
        warn!(
            "Axis alignment stopped after {} iterations without converging",
            iterations
        );
    }

    let mut one_hot = DMatrix::<f64>::zeros(n, k);
    for (i, &c) in labels.iter().enumerate() {
        one_hot[(i, c)] = 1.0;
    }

    Ok(AxisAlignment {
        one_hot,
        rotation,
        labels,
        iterations,
        converged,
    })
}

/// Seed rotation: a random row, then rows least aligned with those already chosen.
fn initial_rotation(x: &DMatrix<f64>, seed: u64) -> DMatrix<f64> {
    let (n, k) = x.shape();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut r = DMatrix::<f64>::zeros(k, k);
    r.row_mut(0).copy_from(&x.row(rng.random_range(0..n)));

    let mut cumulative = vec![0.0f64; n];
    for i in 1..k {
        let prev = r.row(i - 1).transpose();
        let projections = x * prev; // [N]
        for (c, p) in cumulative.iter_mut().zip(projections.iter()) {
            *c += p.abs();
        }
        let next = argmin(&cumulative);
        r.row_mut(i).copy_from(&x.row(next));
    }
    r
}

fn argmax_rows(m: &DMatrix<f64>) -> Vec<usize> {
    m.row_iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0usize, f64::NEG_INFINITY), |(bi, bv), (i, &v)| {
                    if v > bv {
                        (i, v)
                    } else {
                        (bi, bv)
                    }
                })
                .0
        })
        .collect()
}

fn argmin(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0usize, f64::INFINITY), |(bi, bv), (i, &v)| {
            if v < bv {
                (i, v)
            } else {
                (bi, bv)
            }
        })
        .0
}
