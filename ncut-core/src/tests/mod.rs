mod test_affinity;
mod test_discretize;

use nalgebra::{DMatrix, DVector};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal, StandardNormal};

pub fn init() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

// ─────────────────────────────────────────────────────────────────────────────
// Synthetic data
// ─────────────────────────────────────────────────────────────────────────────

/// Isotropic Gaussian blobs: `per_blob` rows around each center.
/// Returns the features and the generating blob of each row.
pub fn gaussian_blobs(
    centers: &[Vec<f64>],
    per_blob: usize,
    std: f64,
    seed: u64,
) -> (DMatrix<f64>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, std).unwrap();
    let f = centers[0].len();
    let n = centers.len() * per_blob;

    let mut rows = Vec::with_capacity(n * f);
    let mut truth = Vec::with_capacity(n);
    for (c, center) in centers.iter().enumerate() {
        for _ in 0..per_blob {
            rows.extend(center.iter().map(|&mu| mu + noise.sample(&mut rng)));
            truth.push(c);
        }
    }
    (DMatrix::from_row_slice(n, f, &rows), truth)
}

/// Uniform features in [0, 1).
pub fn uniform_features(n: usize, f: usize, seed: u64) -> DMatrix<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    DMatrix::from_fn(n, f, |_, _| rng.random_range(0.0..1.0))
}

/// Symmetric matrix `Q diag(spectrum) Qᵀ` with a random orthogonal Q.
pub fn symmetric_with_spectrum(spectrum: &[f64], seed: u64) -> DMatrix<f64> {
    let n = spectrum.len();
    let mut rng = StdRng::seed_from_u64(seed);
    let g = DMatrix::from_fn(n, n, |_, _| rng.sample::<f64, _>(StandardNormal));
    let q = g.qr().q();
    let l = DMatrix::from_diagonal(&DVector::from_column_slice(spectrum));
    &q * l * q.transpose()
}

/// Fraction of rows whose label matches `truth` under the best relabeling (k = 2).
pub fn two_cluster_agreement(labels: &[usize], truth: &[usize]) -> f64 {
    let same = labels.iter().zip(truth).filter(|(a, b)| a == b).count();
    let best = same.max(labels.len() - same);
    best as f64 / labels.len() as f64
}

/// Max |xᵢⱼ − yᵢⱼ| / max(1, max |yᵢⱼ|).
pub fn relative_max_diff(x: &DMatrix<f64>, y: &DMatrix<f64>) -> f64 {
    assert_eq!(x.shape(), y.shape());
    (x - y).amax() / y.amax().max(1.0)
}

/// Projector onto the column span of `v` (columns assumed orthonormal).
pub fn projector(v: &DMatrix<f64>) -> DMatrix<f64> {
    v * v.transpose()
}
