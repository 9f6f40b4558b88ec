mod test_pipeline;

use nalgebra::DMatrix;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};

pub fn init() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

/// `per_blob` 2-D points around each center; returns features and true blob ids.
pub fn blobs_2d(centers: &[(f64, f64)], per_blob: usize, std: f64, seed: u64) -> (DMatrix<f64>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, std).unwrap();
    let n = centers.len() * per_blob;

    let mut rows = Vec::with_capacity(2 * n);
    let mut truth = Vec::with_capacity(n);
    for (c, &(cx, cy)) in centers.iter().enumerate() {
        for _ in 0..per_blob {
            rows.push(cx + noise.sample(&mut rng));
            rows.push(cy + noise.sample(&mut rng));
            truth.push(c);
        }
    }
    (DMatrix::from_row_slice(n, 2, &rows), truth)
}

/// Best agreement between `labels` and `truth` over all relabelings.
pub fn agreement(labels: &[usize], truth: &[usize], k: usize) -> f64 {
    // Small k only: enumerate permutations.
    fn permutations(k: usize) -> Vec<Vec<usize>> {
        if k == 0 {
            return vec![vec![]];
        }
        let mut out = Vec::new();
        for p in permutations(k - 1) {
            for pos in 0..=p.len() {
                let mut q = p.clone();
                q.insert(pos, k - 1);
                out.push(q);
            }
        }
        out
    }

    permutations(k)
        .iter()
        .map(|perm| {
            labels
                .iter()
                .zip(truth)
                .filter(|(l, t)| perm[**l] == **t)
                .count()
        })
        .max()
        .unwrap_or(0) as f64
        / labels.len() as f64
}
