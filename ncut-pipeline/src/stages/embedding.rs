//! Stage A: Nystrom Normalized Cut embedding.
//!
//! features [N, F] → anchors [n_a] → embedding [N, n_components]

use nalgebra::DMatrix;
use ncut_core::{Embedding, NCut, NcutConfig, Result};

/// Output of Stage A.
pub struct EmbeddingOutput {
    /// [N, n_components] rows in input order, with eigenvalues [n_components].
    pub embedding: Embedding,

    /// Anchors the approximation was fitted on.
    pub anchor_indices: Vec<usize>,
}

/// Stage A executor.
pub struct EmbeddingStage {
    pub config: NcutConfig,
}

impl EmbeddingStage {
    pub fn new(config: NcutConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(NcutConfig::default())
    }

    /// Execute Stage A.
    ///
    /// Input:  features [N, F], optionally a fixed anchor set.
    /// Output: EmbeddingOutput with the embedding [N, n_components].
    pub fn execute(
        &self,
        features: &DMatrix<f64>,
        precomputed_indices: Option<&[usize]>,
    ) -> Result<EmbeddingOutput> {
        let (n, f) = features.shape();

        log::info!("╔═══════════════════════════════════════════════════════╗");
        log::info!("║  STAGE A: NYSTROM NORMALIZED CUT EMBEDDING            ║");
        log::info!("╚═══════════════════════════════════════════════════════╝");
        log::info!("📐 Embedding [{N}×{F}] features", N = n, F = f);
        log::info!(
            "  • n_components={}, num_sample={}, γ={:.3}, distance={}, solver={}",
            self.config.n_components,
            self.config.num_sample,
            self.config.affinity_focal_gamma,
            self.config.distance,
            self.config.eig_solver,
        );

        let mut ncut = NCut::new(self.config.clone())?;
        let embedding = ncut.fit_transform(features, precomputed_indices)?;
        let anchor_indices = ncut.anchor_indices()?.to_vec();

        log::info!(
            "  ✓ Embedding complete: {} anchors, λ = {:?}",
            anchor_indices.len(),
            embedding.eigenvalues.as_slice()
        );
        log::info!("╔═══════════════════════════════════════════════════════╗");
        log::info!("║  STAGE A COMPLETE                                     ║");
        log::info!("╚═══════════════════════════════════════════════════════╝");

        Ok(EmbeddingOutput {
            embedding,
            anchor_indices,
        })
    }
}
