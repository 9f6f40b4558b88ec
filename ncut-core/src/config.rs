//! Configuration for the Nystrom Normalized Cut.
//!
//! Eigensolver, distance and anchor sampling are closed enums. Names are
//! parsed once, when the config is built, so an unknown backend fails before
//! any matrix is touched.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{NcutError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Closed enumerations
// ─────────────────────────────────────────────────────────────────────────────

/// Top-k symmetric eigendecomposition backend.
///
/// All variants return the same top-k subspace up to sign and tolerance;
/// they differ only in speed and accuracy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EigSolver {
    /// Randomized range finder + small SVD. Only the top q directions, fastest.
    #[default]
    RandomizedSvd,
    /// Block orthogonal iteration with Rayleigh-Ritz. Top k only.
    SubspaceIteration,
    /// Full SVD, slow.
    Svd,
    /// Full symmetric eigendecomposition, slow.
    Eigh,
}

impl fmt::Display for EigSolver {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EigSolver::RandomizedSvd => write!(f, "svd_lowrank"),
            EigSolver::SubspaceIteration => write!(f, "lobpcg"),
            EigSolver::Svd => write!(f, "svd"),
            EigSolver::Eigh => write!(f, "eigh"),
        }
    }
}

impl FromStr for EigSolver {
    type Err = NcutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "svd_lowrank" | "randomized" => Ok(EigSolver::RandomizedSvd),
            "lobpcg" | "subspace" => Ok(EigSolver::SubspaceIteration),
            "svd" => Ok(EigSolver::Svd),
            "eigh" => Ok(EigSolver::Eigh),
            other => Err(NcutError::Configuration(format!(
                "eigen solver should be 'svd_lowrank', 'lobpcg', 'svd' or 'eigh', got '{other}'"
            ))),
        }
    }
}

/// Distance used inside the affinity kernel `A = exp(-D / γ)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// `1 - cos(a, b)`.
    #[default]
    Cosine,
    /// `‖a − b‖₂`.
    Euclidean,
    /// `½‖a − b‖² / ‖σ‖²` with a quantile-based robust σ.
    Rbf,
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DistanceMetric::Cosine => write!(f, "cosine"),
            DistanceMetric::Euclidean => write!(f, "euclidean"),
            DistanceMetric::Rbf => write!(f, "rbf"),
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = NcutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(DistanceMetric::Cosine),
            "euclidean" => Ok(DistanceMetric::Euclidean),
            "rbf" => Ok(DistanceMetric::Rbf),
            other => Err(NcutError::Configuration(format!(
                "distance should be 'cosine', 'euclidean' or 'rbf', got '{other}'"
            ))),
        }
    }
}

/// Anchor selection strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleMethod {
    /// Farthest point sampling, recommended for approximation accuracy.
    #[default]
    Farthest,
    /// Uniform random subset.
    Random,
}

impl fmt::Display for SampleMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SampleMethod::Farthest => write!(f, "farthest"),
            SampleMethod::Random => write!(f, "random"),
        }
    }
}

impl FromStr for SampleMethod {
    type Err = NcutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "farthest" | "fps" => Ok(SampleMethod::Farthest),
            "random" => Ok(SampleMethod::Random),
            other => Err(NcutError::Configuration(format!(
                "sample method should be 'farthest' or 'random', got '{other}'"
            ))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// NcutConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the Nystrom Normalized Cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NcutConfig {
    /// Number of top eigenvectors to return.
    pub n_components: usize,

    /// Affinity temperature γ in `exp(-D / γ)`.
    /// Lower γ suppresses weakly connected edges, giving sharper eigenvectors.
    pub affinity_focal_gamma: f64,

    /// Number of anchors for the Nystrom approximation.
    /// Reduce only if memory is short; larger is more accurate.
    pub num_sample: usize,

    /// Anchor selection strategy.
    pub sample_method: SampleMethod,

    /// Distance inside the affinity kernel.
    pub distance: DistanceMetric,

    /// Eigendecomposition backend, shared by the kernel and the engine.
    pub eig_solver: EigSolver,

    /// Maximum rows per chunk when streaming non-anchor points.
    /// Bounds peak memory; does not change the result.
    pub chunk_size: usize,

    /// Maximum rotation updates in axis alignment.
    pub max_iter: usize,

    /// Seed for every random choice (sketches, sampling, rotation init).
    pub seed: u64,
}

impl Default for NcutConfig {
    fn default() -> Self {
        Self {
            n_components: 100,
            affinity_focal_gamma: 1.0,
            num_sample: 10_000,
            sample_method: SampleMethod::Farthest,
            distance: DistanceMetric::Cosine,
            eig_solver: EigSolver::RandomizedSvd,
            chunk_size: 8192,
            max_iter: 300,
            seed: 0,
        }
    }
}

impl NcutConfig {
    /// Exact dense backends, for small problems and regression tests.
    pub fn exact(n_components: usize) -> Self {
        Self {
            n_components,
            eig_solver: EigSolver::Eigh,
            ..Self::default()
        }
    }

    /// Low-dimensional point clouds where Euclidean geometry is meaningful.
    pub fn euclidean(n_components: usize, num_sample: usize) -> Self {
        Self {
            n_components,
            num_sample,
            distance: DistanceMetric::Euclidean,
            ..Self::default()
        }
    }

    /// Reject nonsensical values before any state is touched.
    pub fn validate(&self) -> Result<()> {
        if self.n_components == 0 {
            return Err(NcutError::Configuration(
                "n_components must be positive".into(),
            ));
        }
        if self.num_sample == 0 {
            return Err(NcutError::Configuration(
                "num_sample must be positive".into(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(NcutError::Configuration(
                "chunk_size must be positive".into(),
            ));
        }
        if !(self.affinity_focal_gamma.is_finite() && self.affinity_focal_gamma > 0.0) {
            return Err(NcutError::Configuration(format!(
                "affinity_focal_gamma must be a positive finite number, got {}",
                self.affinity_focal_gamma
            )));
        }
        if self.num_sample < self.n_components {
            return Err(NcutError::Configuration(format!(
                "num_sample ({}) must be at least n_components ({})",
                self.num_sample, self.n_components
            )));
        }
        Ok(())
    }

    pub fn summary(&self) -> String {
        format!(
            "NcutConfig: n_components={}, γ={:.3}, num_sample={}, sampler={}, distance={}, solver={}, chunk_size={}",
            self.n_components,
            self.affinity_focal_gamma,
            self.num_sample,
            self.sample_method,
            self.distance,
            self.eig_solver,
            self.chunk_size,
        )
    }
}
