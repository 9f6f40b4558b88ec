//! Pairwise affinity primitive: `A = exp(-D(a, b) / γ)`.
//!
//! Distances are computed as batched tensor algebra on `AutoBackend`,
//! avoiding the explicit [N, M, F] difference tensor:
//!   ‖a − b‖² = ‖a‖² + ‖b‖² − 2⟨a, b⟩
//!
//! Shape flow (Euclidean):
//!   a.powf(2).sum_dim(1)             [N, 1]  ┐
//!   b.powf(2).sum_dim(1).reshape     [1, M]  ├ broadcast → [N, M]
//!   a.matmul(bᵀ)                     [N, M]  ┘
//!
//! The result is symmetric when `a == b` and strictly positive for finite
//! inputs, which is what degree normalization downstream relies on.

use burn::prelude::*;
use log::{debug, trace};
use nalgebra::DMatrix;

use crate::backend::{get_device, matrix_to_tensor, tensor_to_matrix, AutoBackend};
use crate::config::DistanceMetric;
use crate::error::{NcutError, Result};

/// Lower/upper quantiles bracketing ±1σ of a normal distribution.
const ROBUST_STD_QUANTILES: (f64, f64) = (0.158655, 0.841345);

/// Affinity between every row of `a` [N, F] and every row of `b` [M, F] → [N, M].
pub fn affinity(
    a: &DMatrix<f64>,
    b: &DMatrix<f64>,
    focal_gamma: f64,
    metric: DistanceMetric,
) -> Result<DMatrix<f64>> {
    if !(focal_gamma.is_finite() && focal_gamma > 0.0) {
        return Err(NcutError::Configuration(format!(
            "affinity focal gamma must be positive, got {focal_gamma}"
        )));
    }

    debug!(
        "Affinity [{}×{}] ({}), γ={:.3}",
        a.nrows(),
        b.nrows(),
        metric,
        focal_gamma
    );

    let d = distance_tensor(a, b, metric)?;
    tensor_to_matrix(d.div_scalar(focal_gamma).neg().exp())
}

/// Raw pairwise distances [N, M] under `metric`.
pub fn distance(a: &DMatrix<f64>, b: &DMatrix<f64>, metric: DistanceMetric) -> Result<DMatrix<f64>> {
    tensor_to_matrix(distance_tensor(a, b, metric)?)
}

fn distance_tensor(
    a: &DMatrix<f64>,
    b: &DMatrix<f64>,
    metric: DistanceMetric,
) -> Result<Tensor<AutoBackend, 2>> {
    if a.nrows() == 0 || b.nrows() == 0 {
        return Err(NcutError::EmptyInput("affinity operands".into()));
    }
    if a.ncols() != b.ncols() {
        return Err(NcutError::ShapeMismatch {
            context: "affinity feature dimension",
            expected: a.ncols(),
            got: b.ncols(),
        });
    }

    let device = get_device();
    let a_gpu = matrix_to_tensor(a, &device);
    let b_gpu = matrix_to_tensor(b, &device);

    let d = match metric {
        DistanceMetric::Cosine => cosine_distance(a_gpu, b_gpu),
        DistanceMetric::Euclidean => squared_euclidean(a_gpu, b_gpu).sqrt(),
        DistanceMetric::Rbf => {
            let scale = robust_scale(a)?;
            trace!("RBF robust scale ‖σ‖² = {:.6}", scale);
            squared_euclidean(a_gpu, b_gpu).mul_scalar(0.5 / scale)
        }
    };
    Ok(d)
}

/// `1 − ⟨â, b̂⟩` on L2-normalized rows.
fn cosine_distance(a: Tensor<AutoBackend, 2>, b: Tensor<AutoBackend, 2>) -> Tensor<AutoBackend, 2> {
    let a_hat = l2_normalize_rows(a);
    let b_hat = l2_normalize_rows(b);
    a_hat.matmul(b_hat.transpose()).neg().add_scalar(1.0)
}

fn l2_normalize_rows(x: Tensor<AutoBackend, 2>) -> Tensor<AutoBackend, 2> {
    let norms = x
        .clone()
        .powf_scalar(2.0)
        .sum_dim(1)
        .sqrt()
        .clamp_min(1e-12); // [N, 1]
    x / norms
}

/// ‖a − b‖² via the norm expansion, clamped at zero against cancellation.
fn squared_euclidean(a: Tensor<AutoBackend, 2>, b: Tensor<AutoBackend, 2>) -> Tensor<AutoBackend, 2> {
    let [m, _] = b.dims();

    let a_norm = a.clone().powf_scalar(2.0).sum_dim(1); // [N, 1]
    let b_norm = b.clone().powf_scalar(2.0).sum_dim(1).reshape([1, m]); // [1, M]
    let interaction = a.matmul(b.transpose()); // [N, M]

    (a_norm + b_norm - interaction.mul_scalar(2.0)).clamp_min(0.0)
}

/// ‖σ‖² where σ_f is half the inter-quantile spread of column f.
///
/// Computed on the reference operand only, so a fixed anchor set always
/// yields the same scale whatever the query batch.
fn robust_scale(reference: &DMatrix<f64>) -> Result<f64> {
    let (lo, hi) = ROBUST_STD_QUANTILES;
    let scale: f64 = reference
        .column_iter()
        .map(|col| {
            let mut sorted: Vec<f64> = col.iter().copied().collect();
            sorted.sort_by(|x, y| x.total_cmp(y));
            let sigma = (quantile(&sorted, hi) - quantile(&sorted, lo)) / 2.0;
            sigma * sigma
        })
        .sum();

    if scale > 0.0 && scale.is_finite() {
        Ok(scale)
    } else {
        Err(NcutError::NumericalDegeneracy(
            "rbf scale is zero: reference points have no spread".into(),
        ))
    }
}

/// Linear-interpolated quantile of an ascending slice.
pub(crate) fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}
