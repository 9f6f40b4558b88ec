//! Online Nystrom eigen-approximation.
//!
//! Approximates the top eigenpairs of an implicit [N, N] kernel from a small
//! anchor block A [n_a, n_a] plus streamed cross blocks B [n_a, m]:
//!
//!   S = A + A^{-½} (Σ B Bᵀ) A^{-½}          (n_a × n_a, fixed size)
//!   S = U_S Λ_S U_Sᵀ
//!   T = A^{-½} U_S Λ_S^{-½}                 (transform matrix)
//!   V_batch = Bᵀ T
//!
//! A^{-½} is restricted to the top-k eigenspace of A, k = max(n_components, F+1):
//!   ahinv_ul = U Λ^{-½}   [n_a, k]
//!   ahinv_vt = Uᵀ          [k, n_a]
//! so each chunk is folded in as a k×k Gram of `ahinv_vt · B` and never
//! needs an [n_a, m] intermediate beyond the chunk itself.
//!
//! Chunking only bounds peak memory. All chunks are absorbed by the kernel
//! before any of them is projected, so every chunk sees the same final
//! degrees and the result does not depend on chunk size or order.

use std::ops::Range;

use log::{debug, info, trace, warn};
use nalgebra::{DMatrix, DVector};

use crate::config::EigSolver;
use crate::eigen::solve_eig;
use crate::error::{NcutError, Result};
use crate::kernel::OnlineKernel;
use crate::linalg::{ceildiv, chunk_ranges, scale_columns};

/// A spectral embedding: one row per point, meaningful jointly with its eigenvalues.
#[derive(Debug, Clone)]
pub struct Embedding {
    /// [N, n_components]
    pub vectors: DMatrix<f64>,
    /// [n_components], descending
    pub eigenvalues: DVector<f64>,
}

impl Embedding {
    pub fn n_points(&self) -> usize {
        self.vectors.nrows()
    }

    pub fn n_components(&self) -> usize {
        self.eigenvalues.len()
    }
}

/// Top-k eigenbasis of the anchor block and its half-inverse factors.
#[derive(Debug, Clone)]
struct AnchorBasis {
    vectors: DMatrix<f64>, // U [n_a, k]
    values: DVector<f64>,  // Λ [k]
    ahinv_ul: DMatrix<f64>, // U Λ^{-½} [n_a, k]
    ahinv_vt: DMatrix<f64>, // Uᵀ [k, n_a]
    ahinv: DMatrix<f64>,    // A^{-½} [n_a, n_a]
}

impl AnchorBasis {
    fn decompose(a: &DMatrix<f64>, k: usize, solver: EigSolver, seed: u64) -> Result<Self> {
        let eig = solve_eig(a, k, solver, seed)?;
        require_positive(&eig.values, "anchor kernel")?;

        let ahinv_ul = scale_columns(&eig.vectors, &eig.values.map(|l| l.powf(-0.5)));
        let ahinv_vt = eig.vectors.transpose();
        let ahinv = &ahinv_ul * &ahinv_vt;

        Ok(Self {
            vectors: eig.vectors,
            values: eig.values,
            ahinv_ul,
            ahinv_vt,
            ahinv,
        })
    }
}

/// Mutable engine state, created by `fit` and advanced by `update`.
#[derive(Debug, Clone)]
struct NystromState {
    anchor_features: DMatrix<f64>,
    inverse_approximation_dim: usize,
    a: DMatrix<f64>,     // normalized anchor block at the last refresh
    basis: AnchorBasis,
    cross: DMatrix<f64>, // Σ over streamed points of A^{-½} B Bᵀ A^{-½}
    s: DMatrix<f64>,     // A + cross
    transform_matrix: DMatrix<f64>, // [n_a, n_components]
    eigenvalues: DVector<f64>,      // [n_components]
}

/// Online Nystrom engine over any `OnlineKernel`.
#[derive(Debug, Clone)]
pub struct OnlineNystrom<K: OnlineKernel> {
    pub n_components: usize,
    pub eig_solver: EigSolver,
    pub chunk_size: usize,
    pub seed: u64,
    kernel: K,
    state: Option<NystromState>,
}

impl<K: OnlineKernel + Clone> OnlineNystrom<K> {
    pub fn new(
        n_components: usize,
        kernel: K,
        eig_solver: EigSolver,
        chunk_size: usize,
        seed: u64,
    ) -> Result<Self> {
        if n_components == 0 {
            return Err(NcutError::Configuration("n_components must be positive".into()));
        }
        if chunk_size == 0 {
            return Err(NcutError::Configuration("chunk_size must be positive".into()));
        }
        Ok(Self {
            n_components,
            eig_solver,
            chunk_size,
            seed,
            kernel,
            state: None,
        })
    }

    /// Exact decomposition of the anchor kernel. Discards all prior state.
    ///
    /// Returns the anchor embedding U[:, :n_components] and its eigenvalues.
    pub fn fit(&mut self, features: &DMatrix<f64>) -> Result<Embedding> {
        let (n_a, f) = features.shape();
        if n_a == 0 {
            return Err(NcutError::EmptyInput("nystrom anchors".into()));
        }
        if n_a < self.n_components {
            return Err(NcutError::Configuration(format!(
                "{} anchors cannot support {} components",
                n_a, self.n_components
            )));
        }

        self.state = None;
        self.kernel.fit(features)?;

        let k = self.n_components.max(f + 1).min(n_a);
        info!(
            "OnlineNystrom::fit: {} anchors × {} features, rank {} → {} components",
            n_a, f, k, self.n_components
        );

        let a = self.kernel.transform_anchors()?;
        let basis = AnchorBasis::decompose(&a, k, self.eig_solver, self.seed)?;

        let nc = self.n_components;
        let u_top = basis.vectors.columns(0, nc).into_owned();
        let l_top = basis.values.rows(0, nc).into_owned();
        let transform_matrix = scale_columns(&u_top, &l_top.map(|l| 1.0 / l));

        debug!(
            "Anchor spectrum: λ₁={:.6}, λ_{}={:.6}",
            l_top[0],
            nc,
            l_top[nc - 1]
        );

        self.state = Some(NystromState {
            anchor_features: features.clone(),
            inverse_approximation_dim: k,
            s: a.clone(),
            cross: DMatrix::zeros(n_a, n_a),
            a,
            basis,
            transform_matrix,
            eigenvalues: l_top.clone(),
        });

        Ok(Embedding {
            vectors: u_top,
            eigenvalues: l_top,
        })
    }

    /// Extend the approximation to `features` [m, F].
    ///
    /// Returns the embedding of this batch only (rows in input order) and
    /// the refreshed eigenvalues. On error neither the kernel nor the
    /// engine keeps any trace of the batch, so the call can be retried.
    pub fn update(&mut self, features: &DMatrix<f64>) -> Result<Embedding> {
        let m = features.nrows();
        {
            let state = self.state.as_ref().ok_or(NcutError::NotFitted("nystrom update"))?;
            if features.ncols() != state.anchor_features.ncols() {
                return Err(NcutError::ShapeMismatch {
                    context: "nystrom update feature dimension",
                    expected: state.anchor_features.ncols(),
                    got: features.ncols(),
                });
            }
        }
        if m == 0 {
            return Err(NcutError::EmptyInput("nystrom update batch".into()));
        }

        let n_chunks = ceildiv(m, self.chunk_size);
        let ranges = chunk_ranges(m, n_chunks);
        info!(
            "OnlineNystrom::update: {} points in {} chunk(s) of ≤{}",
            m, n_chunks, self.chunk_size
        );

        let checkpoint = self.kernel.clone();
        let result = self.absorb(features, &ranges);
        if let Err(e) = &result {
            warn!("OnlineNystrom::update failed, kernel rolled back: {e}");
            self.kernel = checkpoint;
        }
        result
    }

    fn absorb(&mut self, features: &DMatrix<f64>, ranges: &[Range<usize>]) -> Result<Embedding> {
        let n_chunks = ranges.len();

        // ── Pass 1: absorb every chunk into the kernel degrees ───────────────
        let mut single_block = None;
        for range in ranges {
            let chunk = features.rows(range.start, range.len()).into_owned();
            let block = self.kernel.update(&chunk)?;
            trace!("Absorbed chunk {}..{}", range.start, range.end);
            if n_chunks == 1 {
                single_block = Some(block);
            }
        }

        // ── Refresh the anchor basis under the new degrees ──────────────────
        let k = self.state("nystrom update")?.inverse_approximation_dim;
        let a = self.kernel.transform_anchors()?;
        let basis = AnchorBasis::decompose(&a, k, self.eig_solver, self.seed)?;

        // ── Pass 2: fold compressed cross blocks into the accumulator ────────
        let mut gram = DMatrix::<f64>::zeros(k, k);
        for range in ranges {
            let block = match &single_block {
                Some(b) => b.clone(),
                None => self.cross_block(features, range)?,
            }; // [m_c, n_a]
            let compressed = &basis.ahinv_vt * block.transpose(); // [k, m_c]
            gram += &compressed * compressed.transpose();
        }

        let cross = &self.state("nystrom update")?.cross
            + &basis.ahinv_ul * gram * basis.ahinv_ul.transpose();
        let s = &a + &cross;

        let eig_s = solve_eig(&s, self.n_components, self.eig_solver, self.seed)?;
        require_positive(&eig_s.values, "accumulated kernel")?;
        let transform_matrix =
            &basis.ahinv * scale_columns(&eig_s.vectors, &eig_s.values.map(|l| l.powf(-0.5)));

        debug!(
            "Refreshed spectrum: λ₁={:.6}, λ_{}={:.6}",
            eig_s.values[0],
            self.n_components,
            eig_s.values[self.n_components - 1]
        );

        // ── Pass 3: project the batch ────────────────────────────────────────
        let vectors = match single_block {
            Some(block) => block * &transform_matrix,
            None => self.project_chunked(features, ranges, &transform_matrix)?,
        };

        let state = self.state.as_mut().ok_or(NcutError::NotFitted("nystrom update"))?;
        state.cross = cross;
        state.s = s;
        state.transform_matrix = transform_matrix;
        state.eigenvalues = eig_s.values.clone();
        state.a = a;
        state.basis = basis;

        Ok(Embedding {
            vectors,
            eigenvalues: eig_s.values,
        })
    }

    /// Project the stored anchor block through the current transform matrix.
    pub fn transform_anchors(&self) -> Result<Embedding> {
        let state = self.state("nystrom transform_anchors")?;
        Ok(Embedding {
            vectors: &state.a * &state.transform_matrix,
            eigenvalues: state.eigenvalues.clone(),
        })
    }

    /// Project arbitrary points without touching any state.
    pub fn transform(&self, features: &DMatrix<f64>) -> Result<Embedding> {
        let state = self.state("nystrom transform")?;
        let m = features.nrows();
        if m == 0 {
            return Err(NcutError::EmptyInput("nystrom transform batch".into()));
        }
        let ranges = chunk_ranges(m, ceildiv(m, self.chunk_size));
        let vectors = self.project_chunked(features, &ranges, &state.transform_matrix)?;
        Ok(Embedding {
            vectors,
            eigenvalues: state.eigenvalues.clone(),
        })
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    pub fn transform_matrix(&self) -> Result<&DMatrix<f64>> {
        Ok(&self.state("transform_matrix")?.transform_matrix)
    }

    pub fn eigenvalues(&self) -> Result<&DVector<f64>> {
        Ok(&self.state("eigenvalues")?.eigenvalues)
    }

    /// The running accumulator S [n_a, n_a].
    pub fn accumulator(&self) -> Result<&DMatrix<f64>> {
        Ok(&self.state("accumulator")?.s)
    }

    pub fn anchor_features(&self) -> Result<&DMatrix<f64>> {
        Ok(&self.state("anchor_features")?.anchor_features)
    }

    /// Rank of the anchor half-inverse, max(n_components, F+1) clamped to n_a.
    pub fn inverse_approximation_dim(&self) -> Result<usize> {
        Ok(self.state("inverse_approximation_dim")?.inverse_approximation_dim)
    }

    /// Eigenvalues of the anchor block at the last refresh.
    pub fn anchor_spectrum(&self) -> Result<&DVector<f64>> {
        Ok(&self.state("anchor_spectrum")?.basis.values)
    }

    fn state(&self, op: &'static str) -> Result<&NystromState> {
        self.state.as_ref().ok_or(NcutError::NotFitted(op))
    }

    fn cross_block(&self, features: &DMatrix<f64>, range: &Range<usize>) -> Result<DMatrix<f64>> {
        let chunk = features.rows(range.start, range.len()).into_owned();
        self.kernel.transform(&chunk)
    }

    fn project_chunked(
        &self,
        features: &DMatrix<f64>,
        ranges: &[Range<usize>],
        transform_matrix: &DMatrix<f64>,
    ) -> Result<DMatrix<f64>> {
        let mut out = DMatrix::zeros(features.nrows(), transform_matrix.ncols());
        for range in ranges {
            let projected = self.cross_block(features, range)? * transform_matrix;
            out.rows_mut(range.start, range.len()).copy_from(&projected);
        }
        Ok(out)
    }
}

fn require_positive(values: &DVector<f64>, what: &str) -> Result<()> {
    match values.iter().position(|&l| !(l > 0.0)) {
        None => Ok(()),
        Some(i) => Err(NcutError::NumericalDegeneracy(format!(
            "{what} is singular: eigenvalue {i} is {:.3e}",
            values[i]
        ))),
    }
}
