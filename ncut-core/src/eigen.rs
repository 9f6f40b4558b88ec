//! Top-k symmetric eigendecomposition behind one contract.
//!
//! `solve_eig` dispatches to one of four interchangeable backends and then
//! applies the same post-processing to every result:
//!   1. keep the k largest eigenvalues, descending;
//!   2. flip each eigenvector so its entries sum to ≥ 0 (+1 on an exact zero).
//!
//! Step 2 removes the sign ambiguity of eigenvectors, so repeated fits and
//! anchor-subset vs. full-set decompositions line up column by column.
//!
//! All backends work on real symmetric input; there is no imaginary part to
//! discard. The input is symmetrized as `(A + Aᵀ) / 2` before decomposition
//! so floating-point asymmetry of accumulated kernels cannot leak through.

use log::{debug, trace};
use nalgebra::{DMatrix, DVector, SymmetricEigen};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::config::EigSolver;
use crate::error::{NcutError, Result};
use crate::linalg::ensure_finite;

/// Extra sketch columns beyond k for the randomized and iterative backends.
const OVERSAMPLE: usize = 10;
/// Power iterations in the randomized range finder.
const POWER_ITERS: usize = 2;
/// Iteration cap and relative tolerance for subspace iteration.
const SUBSPACE_MAX_ITERS: usize = 500;
const SUBSPACE_TOL: f64 = 1e-10;

/// k eigenvectors (columns) and their eigenvalues, descending.
#[derive(Debug, Clone)]
pub struct EigenPairs {
    /// [N, k]
    pub vectors: DMatrix<f64>,
    /// [k]
    pub values: DVector<f64>,
}

impl EigenPairs {
    pub fn rank(&self) -> usize {
        self.values.len()
    }
}

/// Top-`k` eigenpairs of the symmetric matrix `a` [N, N].
pub fn solve_eig(a: &DMatrix<f64>, k: usize, solver: EigSolver, seed: u64) -> Result<EigenPairs> {
    let (n, cols) = a.shape();
    if n == 0 {
        return Err(NcutError::EmptyInput("eigen decomposition input".into()));
    }
    if n != cols {
        return Err(NcutError::ShapeMismatch {
            context: "eigen decomposition of a square matrix",
            expected: n,
            got: cols,
        });
    }
    if k == 0 || k > n {
        return Err(NcutError::Configuration(format!(
            "requested {k} eigenpairs from a {n}×{n} matrix"
        )));
    }
    ensure_finite(a, "eigen decomposition input")?;

    trace!("solve_eig: {}×{} → top {} via {}", n, n, k, solver);

    let sym = (a + a.transpose()) * 0.5;
    let (vectors, values) = match solver {
        EigSolver::RandomizedSvd => randomized_svd(&sym, (k + OVERSAMPLE).min(n), seed)?,
        EigSolver::SubspaceIteration => subspace_iteration(&sym, k, (k + OVERSAMPLE).min(n), seed),
        EigSolver::Svd => {
            let svd = sym.svd(true, false);
            let u = svd
                .u
                .ok_or_else(|| NcutError::NumericalDegeneracy("SVD did not return U".into()))?;
            (u, svd.singular_values)
        }
        EigSolver::Eigh => {
            let eig = SymmetricEigen::new(sym);
            (eig.eigenvectors, eig.eigenvalues)
        }
    };

    let (mut vectors, values) = top_k_descending(&vectors, &values, k);
    canonicalize_signs(&mut vectors);

    ensure_finite(&vectors, "eigenvectors")?;
    if values.iter().any(|v| !v.is_finite()) {
        return Err(NcutError::NumericalDegeneracy(
            "eigenvalues contain NaN or infinite entries".into(),
        ));
    }

    debug!(
        "solve_eig({}): λ_max={:.6}, λ_k={:.6}",
        solver,
        values[0],
        values[k - 1]
    );

    Ok(EigenPairs { vectors, values })
}

/// Flip columns so each one sums to a non-negative value.
pub fn canonicalize_signs(vectors: &mut DMatrix<f64>) {
    for mut col in vectors.column_iter_mut() {
        if col.sum() < 0.0 {
            col.neg_mut();
        }
    }
}

/// Keep the `k` largest values and matching columns, descending.
fn top_k_descending(
    vectors: &DMatrix<f64>,
    values: &DVector<f64>,
    k: usize,
) -> (DMatrix<f64>, DVector<f64>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| values[j].total_cmp(&values[i]));
    order.truncate(k);

    let vectors = vectors.select_columns(order.iter());
    let values = DVector::from_iterator(order.len(), order.iter().map(|&i| values[i]));
    (vectors, values)
}

fn gaussian_sketch(n: usize, q: usize, seed: u64) -> DMatrix<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    DMatrix::from_fn(n, q, |_, _| rng.sample::<f64, _>(StandardNormal))
}

/// Randomized low-rank SVD (range finder with power iterations).
///
/// For a PSD matrix the singular triplets are the eigenpairs.
fn randomized_svd(a: &DMatrix<f64>, q: usize, seed: u64) -> Result<(DMatrix<f64>, DVector<f64>)> {
    let mut basis = (a * gaussian_sketch(a.nrows(), q, seed)).qr().q(); // [N, q]

    for _ in 0..POWER_ITERS {
        let z = a.tr_mul(&basis).qr().q();
        basis = (a * z).qr().q();
    }

    let projected = basis.tr_mul(a); // [q, N]
    let svd = projected.svd(true, false);
    let u_small = svd
        .u
        .ok_or_else(|| NcutError::NumericalDegeneracy("sketch SVD did not return U".into()))?;

    Ok((basis * u_small, svd.singular_values))
}

/// Block orthogonal iteration with Rayleigh-Ritz extraction.
///
/// Stops when the top-k Ritz values move by less than `SUBSPACE_TOL`
/// relative to the largest one.
fn subspace_iteration(
    a: &DMatrix<f64>,
    k: usize,
    block: usize,
    seed: u64,
) -> (DMatrix<f64>, DVector<f64>) {
    let mut x = gaussian_sketch(a.nrows(), block, seed).qr().q();
    let mut ritz = DVector::zeros(block);
    let mut prev_top: Option<DVector<f64>> = None;

    for iter in 0..SUBSPACE_MAX_ITERS {
        let q = (a * &x).qr().q();
        let aq = a * &q;
        let h = q.tr_mul(&aq);
        let h = (&h + h.transpose()) * 0.5;

        let eig = SymmetricEigen::new(h);
        let (w, values) = top_k_descending(&eig.eigenvectors, &eig.eigenvalues, block);
        x = q * w;
        ritz = values;

        let top = ritz.rows(0, k).into_owned();
        if let Some(prev) = &prev_top {
            let scale = top.amax().max(f64::MIN_POSITIVE);
            if (&top - prev).amax() <= SUBSPACE_TOL * scale {
                trace!("Subspace iteration converged after {} iterations", iter + 1);
                break;
            }
        }
        prev_top = Some(top);
    }

    (x, ritz)
}
