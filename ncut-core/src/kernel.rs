//! Online affinity kernels.
//!
//! An online kernel is anchored on a fixed landmark set and can absorb new
//! points without ever materializing the full [N, N] affinity.
//!
//! The concrete kernel builds the symmetric degree-normalized affinity
//!     W_sym[i, j] = w_ij / sqrt(d_i · d_j)
//! (the off-diagonal of `I − L_sym`, as in Normalized Cut). Degrees are
//! tracked incrementally:
//!   - anchors:     d_i = a_r[i] + b_r[i], where a_r is the anchor-block row
//!                  sum and b_r accumulates the affinity of every streamed point;
//!   - new point j: d_j = Σ_i B[i, j] + (Bᵀ · A⁺ · b_r)[j], where the second
//!                  term estimates its affinity to all previously streamed
//!                  points through a rank-(F+1) pseudo-inverse A⁺ of the
//!                  anchor block.
//!
//! Degrees must stay strictly positive. A zero row sum is a degenerate input
//! (e.g. a metric that disconnects an anchor) and is reported, not patched.

use log::{debug, trace};
use nalgebra::{DMatrix, DVector};

use crate::affinity::affinity;
use crate::config::{DistanceMetric, EigSolver, NcutConfig};
use crate::eigen::solve_eig;
use crate::error::{NcutError, Result};
use crate::linalg::{col_sums, ensure_finite, row_sums};

/// Incrementally extensible affinity kernel over a fixed anchor set.
///
/// `update` is a streaming operation: feeding the same batch twice counts it
/// twice. A failed `update` leaves the state as it was. The `transform*`
/// methods are pure reads of the current state.
pub trait OnlineKernel {
    /// Establish anchor-side state from `anchors` [n_a, F]. Discards any prior state.
    fn fit(&mut self, anchors: &DMatrix<f64>) -> Result<()>;

    /// Absorb `batch` [m, F] and return its normalized cross block [m, n_a].
    fn update(&mut self, batch: &DMatrix<f64>) -> Result<DMatrix<f64>>;

    /// The normalized anchor block [n_a, n_a] including all updates so far.
    fn transform_anchors(&self) -> Result<DMatrix<f64>>;

    /// Normalized affinity [m, n_a] of arbitrary points under the current state.
    fn transform(&self, features: &DMatrix<f64>) -> Result<DMatrix<f64>>;

    fn n_anchors(&self) -> usize;

    fn feature_dim(&self) -> usize;
}

/// Anchor-side state, created by `fit`.
#[derive(Debug, Clone)]
struct AnchorState {
    features: DMatrix<f64>, // [n_a, F]
    a: DMatrix<f64>,        // [n_a, n_a] raw affinity
    ainv: DMatrix<f64>,     // [n_a, n_a] rank-(F+1) pseudo-inverse of A
    a_r: DVector<f64>,      // [n_a] static row sums of A
    b_r: DVector<f64>,      // [n_a] accumulated row sums of streamed blocks
}

/// Symmetric degree-normalized affinity with incremental degree bookkeeping.
#[derive(Debug, Clone)]
pub struct NormalizedAffinityKernel {
    pub focal_gamma: f64,
    pub distance: DistanceMetric,
    pub eig_solver: EigSolver,
    pub seed: u64,
    state: Option<AnchorState>,
}

impl NormalizedAffinityKernel {
    pub fn new(focal_gamma: f64, distance: DistanceMetric, eig_solver: EigSolver, seed: u64) -> Self {
        Self {
            focal_gamma,
            distance,
            eig_solver,
            seed,
            state: None,
        }
    }

    pub fn from_config(config: &NcutConfig) -> Self {
        Self::new(
            config.affinity_focal_gamma,
            config.distance,
            config.eig_solver,
            config.seed,
        )
    }

    /// Current anchor degrees `a_r + b_r`.
    pub fn anchor_degrees(&self) -> Result<DVector<f64>> {
        let state = self.state("anchor_degrees")?;
        Ok(&state.a_r + &state.b_r)
    }

    /// Total affinity each anchor has received from streamed points.
    pub fn streamed_degrees(&self) -> Result<&DVector<f64>> {
        Ok(&self.state("streamed_degrees")?.b_r)
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    fn state(&self, op: &'static str) -> Result<&AnchorState> {
        self.state.as_ref().ok_or(NcutError::NotFitted(op))
    }

    fn check_dim(state: &AnchorState, features: &DMatrix<f64>) -> Result<()> {
        if features.ncols() != state.features.ncols() {
            return Err(NcutError::ShapeMismatch {
                context: "kernel feature dimension",
                expected: state.features.ncols(),
                got: features.ncols(),
            });
        }
        Ok(())
    }

    /// Degrees of new points: own column sum plus the pseudo-inverse correction.
    fn extended_degrees(ainv: &DMatrix<f64>, b_r: &DVector<f64>, b: &DMatrix<f64>) -> DVector<f64> {
        let ainv_br = ainv * b_r; // [n_a]
        col_sums(b) + b.tr_mul(&ainv_br) // [m]
    }

    /// `B[i, j] / sqrt(row[i] · col[j])`, returned transposed as [m, n_a].
    fn normalize(b: &DMatrix<f64>, row: &DVector<f64>, col: &DVector<f64>) -> Result<DMatrix<f64>> {
        ensure_positive(row, "anchor row sum")?;
        ensure_positive(col, "column sum")?;

        let (n_a, m) = b.shape();
        Ok(DMatrix::from_fn(m, n_a, |j, i| {
            b[(i, j)] / (row[i] * col[j]).sqrt()
        }))
    }
}

impl OnlineKernel for NormalizedAffinityKernel {
    fn fit(&mut self, anchors: &DMatrix<f64>) -> Result<()> {
        let (n_a, f) = anchors.shape();
        if n_a == 0 || f == 0 {
            return Err(NcutError::EmptyInput("kernel anchors".into()));
        }

        debug!(
            "NormalizedAffinityKernel::fit: {} anchors × {} features ({}, γ={:.3})",
            n_a, f, self.distance, self.focal_gamma
        );

        let a = affinity(anchors, anchors, self.focal_gamma, self.distance)?;
        ensure_finite(&a, "anchor affinity")?;

        let a_r = row_sums(&a);
        ensure_positive(&a_r, "anchor row sum")?;

        // Pseudo-inverse restricted to the top-(F+1) eigenspace.
        let rank = (f + 1).min(n_a);
        let eig = solve_eig(&a, rank, self.eig_solver, self.seed)?;
        ensure_positive(&eig.values, "anchor affinity eigenvalue")?;

        let inv_l = DMatrix::from_diagonal(&eig.values.map(|l| 1.0 / l));
        let ainv = &eig.vectors * inv_l * eig.vectors.transpose();

        trace!(
            "Anchor pseudo-inverse: rank={}, λ range [{:.4e}, {:.4e}]",
            rank,
            eig.values[rank - 1],
            eig.values[0]
        );

        self.state = Some(AnchorState {
            features: anchors.clone(),
            a,
            ainv,
            b_r: DVector::zeros(n_a),
            a_r,
        });
        Ok(())
    }

    fn update(&mut self, batch: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let (focal_gamma, distance) = (self.focal_gamma, self.distance);
        let state = self.state.as_mut().ok_or(NcutError::NotFitted("kernel update"))?;
        Self::check_dim(state, batch)?;

        let b = affinity(&state.features, batch, focal_gamma, distance)?; // [n_a, m]
        ensure_finite(&b, "cross affinity")?;

        // Committed only once every degree is known to be positive.
        let b_r = &state.b_r + row_sums(&b);
        let row = &state.a_r + &b_r;
        let col = Self::extended_degrees(&state.ainv, &b_r, &b);
        let block = Self::normalize(&b, &row, &col)?;
        state.b_r = b_r;

        trace!(
            "Kernel update: {} new points, Σb_r={:.4}",
            batch.nrows(),
            state.b_r.sum()
        );

        Ok(block)
    }

    fn transform_anchors(&self) -> Result<DMatrix<f64>> {
        let state = self.state("kernel transform_anchors")?;
        let row = &state.a_r + &state.b_r;
        Self::normalize(&state.a, &row, &row)
    }

    fn transform(&self, features: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let state = self.state("kernel transform")?;
        Self::check_dim(state, features)?;

        let b = affinity(&state.features, features, self.focal_gamma, self.distance)?;
        ensure_finite(&b, "cross affinity")?;

        let row = &state.a_r + &state.b_r;
        let col = Self::extended_degrees(&state.ainv, &state.b_r, &b);
        Self::normalize(&b, &row, &col)
    }

    fn n_anchors(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.features.nrows())
    }

    fn feature_dim(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.features.ncols())
    }
}

fn ensure_positive(v: &DVector<f64>, what: &str) -> Result<()> {
    match v.iter().position(|&x| !(x > 0.0)) {
        None => Ok(()),
        Some(i) => Err(NcutError::NumericalDegeneracy(format!(
            "{what} at index {i} is {} (must be strictly positive)",
            v[i]
        ))),
    }
}
