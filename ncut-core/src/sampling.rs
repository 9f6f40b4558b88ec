//! Anchor (landmark) selection for the Nystrom approximation.
//!
//! # Sampling Strategies
//!
//! ## FarthestPointSampler
//! - Greedy farthest point traversal, starting from the first candidate
//! - Anchors cover the data manifold evenly, which is what keeps the
//!   Nystrom extension accurate far from dense regions
//! - Cosine data is L2-normalized first so the traversal sees the same
//!   geometry as the affinity kernel
//! - High-dimensional data is first projected onto its top `fps_dim`
//!   principal axes; very large inputs are pre-drawn at random down to
//!   `max_draw` candidates
//!
//! ## RandomSampler
//! - Uniform subset without replacement
//! - Cheap, but leaves sparse regions without anchors
//!
//! Both return `min(num_sample, n)` unique indices in ascending order.
//! When `num_sample >= n` every point is returned and no sampling runs.

use std::fmt;

use log::{debug, info, trace, warn};
use nalgebra::DMatrix;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use rayon::prelude::*;

use crate::config::{DistanceMetric, EigSolver, SampleMethod};
use crate::eigen::solve_eig;
use crate::error::{NcutError, Result};
use crate::linalg::{normalize_rows, select_rows};

/// Dimensionality used for the farthest point traversal.
pub const DEFAULT_FPS_DIM: usize = 12;
/// Above this many points, farthest point sampling runs on a random draw.
pub const DEFAULT_MAX_DRAW: usize = 1_000_000;

// ============================================================================
// TRAIT DEFINITION
// ============================================================================

pub trait AnchorSampler: Send {
    /// Pick `num_sample` anchor indices from `features` [N, F].
    fn sample(&mut self, features: &DMatrix<f64>, num_sample: usize) -> Result<Vec<usize>>;

    /// (kept, discarded) counts of the last `sample` call.
    fn get_stats(&self) -> (usize, usize);

    /// Get a display name for the sampler
    fn name(&self) -> &str;
}

impl SampleMethod {
    /// Build the sampler for this method.
    pub fn sampler(&self, metric: DistanceMetric, seed: u64) -> Box<dyn AnchorSampler> {
        match self {
            SampleMethod::Farthest => Box::new(FarthestPointSampler::new(metric, seed)),
            SampleMethod::Random => Box::new(RandomSampler::new(seed)),
        }
    }
}

/// Shared preamble: validates the request and handles the bypass case.
fn resolve_trivial(features: &DMatrix<f64>, num_sample: usize, name: &str) -> Result<Option<Vec<usize>>> {
    let n = features.nrows();
    if n == 0 {
        return Err(NcutError::EmptyInput("features to sample from".into()));
    }
    if num_sample == 0 {
        return Err(NcutError::Configuration("num_sample must be positive".into()));
    }
    if num_sample >= n {
        info!(
            "{}: num_sample={} ≥ n={}, using every point as anchor",
            name, num_sample, n
        );
        return Ok(Some((0..n).collect()));
    }
    Ok(None)
}

// ============================================================================
// FARTHEST POINT SAMPLER
// ============================================================================

pub struct FarthestPointSampler {
    pub metric: DistanceMetric,
    pub fps_dim: usize,
    pub max_draw: usize,
    rng: StdRng,
    sampled_count: usize,
    discarded_count: usize,
}

impl FarthestPointSampler {
    pub fn new(metric: DistanceMetric, seed: u64) -> Self {
        Self {
            metric,
            fps_dim: DEFAULT_FPS_DIM,
            max_draw: DEFAULT_MAX_DRAW,
            rng: StdRng::seed_from_u64(seed),
            sampled_count: 0,
            discarded_count: 0,
        }
    }

    pub fn with_fps_dim(mut self, fps_dim: usize) -> Self {
        self.fps_dim = fps_dim.max(1);
        self
    }

    pub fn with_max_draw(mut self, max_draw: usize) -> Self {
        self.max_draw = max_draw.max(1);
        self
    }
}

impl AnchorSampler for FarthestPointSampler {
    fn sample(&mut self, features: &DMatrix<f64>, num_sample: usize) -> Result<Vec<usize>> {
        let n = features.nrows();
        if let Some(all) = resolve_trivial(features, num_sample, self.name())? {
            self.sampled_count = n;
            self.discarded_count = 0;
            return Ok(all);
        }

        let mut points = match self.metric {
            DistanceMetric::Cosine => normalize_rows(features),
            DistanceMetric::Euclidean | DistanceMetric::Rbf => features.clone(),
        };

        let draw: Option<Vec<usize>> = if n > self.max_draw {
            warn!(
                "n={} exceeds max_draw={}, running farthest point sampling on a random draw",
                n, self.max_draw
            );
            let mut idx: Vec<usize> = (0..n).collect();
            idx.shuffle(&mut self.rng);
            idx.truncate(self.max_draw);
            idx.sort_unstable();
            points = select_rows(&points, &idx);
            Some(idx)
        } else {
            None
        };

        if points.ncols() > self.fps_dim {
            debug!(
                "Projecting {} → {} principal axes before traversal",
                points.ncols(),
                self.fps_dim
            );
            points = principal_projection(&points, self.fps_dim)?;
        }

        let picked = farthest_points(&points, num_sample.min(points.nrows()));
        let mut indices: Vec<usize> = match draw {
            Some(draw) => picked.into_iter().map(|i| draw[i]).collect(),
            None => picked,
        };
        indices.sort_unstable();

        self.sampled_count = indices.len();
        self.discarded_count = n - indices.len();
        info!(
            "{}: {} anchors from {} points",
            self.name(),
            indices.len(),
            n
        );
        Ok(indices)
    }

    fn get_stats(&self) -> (usize, usize) {
        (self.sampled_count, self.discarded_count)
    }

    fn name(&self) -> &str {
        "FarthestPointSampler"
    }
}

/// Center `x` and project it onto its top-`dim` principal axes → [N, dim].
fn principal_projection(x: &DMatrix<f64>, dim: usize) -> Result<DMatrix<f64>> {
    let (n, f) = x.shape();
    let means = x.row_mean();
    let mut centered = x.clone();
    for mut row in centered.row_iter_mut() {
        row -= &means;
    }

    let cov = centered.tr_mul(&centered) / (n.max(2) - 1) as f64; // [F, F]
    let axes = solve_eig(&cov, dim.min(f), EigSolver::Eigh, 0)?;
    Ok(centered * axes.vectors)
}

/// Greedy farthest point traversal from row 0; returns `k` unique row indices.
fn farthest_points(points: &DMatrix<f64>, k: usize) -> Vec<usize> {
    let n = points.nrows();
    // Row-major copies keep the parallel distance sweep cache friendly.
    let rows: Vec<Vec<f64>> = points
        .row_iter()
        .map(|r| r.iter().copied().collect())
        .collect();

    let mut min_dist = vec![f64::INFINITY; n];
    let mut chosen = Vec::with_capacity(k);
    let mut current = 0usize;

    while chosen.len() < k {
        chosen.push(current);
        min_dist[current] = f64::NEG_INFINITY;

        let pivot = &rows[current];
        min_dist
            .par_iter_mut()
            .zip(rows.par_iter())
            .for_each(|(d, row)| {
                let dist: f64 = row
                    .iter()
                    .zip(pivot.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                if dist < *d {
                    *d = dist;
                }
            });

        let (next, far) = min_dist
            .iter()
            .enumerate()
            .fold((0usize, f64::NEG_INFINITY), |(bi, bd), (i, &d)| {
                if d > bd {
                    (i, d)
                } else {
                    (bi, bd)
                }
            });
        trace!("FPS step {}: next={} at d²={:.4e}", chosen.len(), next, far);
        current = next;
    }

    chosen
}

// ============================================================================
// RANDOM SAMPLER
// ============================================================================

pub struct RandomSampler {
    rng: StdRng,
    sampled_count: usize,
    discarded_count: usize,
}

impl RandomSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            sampled_count: 0,
            discarded_count: 0,
        }
    }
}

impl AnchorSampler for RandomSampler {
    fn sample(&mut self, features: &DMatrix<f64>, num_sample: usize) -> Result<Vec<usize>> {
        let n = features.nrows();
        if let Some(all) = resolve_trivial(features, num_sample, self.name())? {
            self.sampled_count = n;
            self.discarded_count = 0;
            return Ok(all);
        }

        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(&mut self.rng);
        indices.truncate(num_sample);
        indices.sort_unstable();

        self.sampled_count = num_sample;
        self.discarded_count = n - num_sample;
        info!(
            "Random sampler keeping {:.1}% of {} points",
            100.0 * num_sample as f64 / n as f64,
            n
        );
        Ok(indices)
    }

    fn get_stats(&self) -> (usize, usize) {
        (self.sampled_count, self.discarded_count)
    }

    fn name(&self) -> &str {
        "RandomSampler"
    }
}

impl fmt::Display for dyn AnchorSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kept, discarded) = self.get_stats();
        write!(f, "{}(kept={}, discarded={})", self.name(), kept, discarded)
    }
}
