//! Stage B: discretize the embedding into hard cluster labels.

use ncut_core::{axis_align, AxisAlignment, Embedding, NcutConfig, Result};

/// Stage B executor: axis alignment of the Stage A embedding.
pub struct DiscretizationStage {
    /// Maximum rotation updates.
    pub max_iter: usize,
    /// Seed for the initial rotation.
    pub seed: u64,
}

impl DiscretizationStage {
    pub fn new(max_iter: usize, seed: u64) -> Self {
        Self { max_iter, seed }
    }

    pub fn from_config(config: &NcutConfig) -> Self {
        Self::new(config.max_iter, config.seed)
    }

    /// Execute Stage B.
    ///
    /// Input:  embedding [N, k].
    /// Output: one-hot [N, k], labels [N], rotation [k, k].
    pub fn execute(&self, embedding: &Embedding) -> Result<AxisAlignment> {
        log::info!("╔═══════════════════════════════════════════════════════╗");
        log::info!("║  STAGE B: DISCRETIZATION (AXIS ALIGNMENT)             ║");
        log::info!("╚═══════════════════════════════════════════════════════╝");
        log::info!(
            "  • {} rows, k={}, max_iter={}",
            embedding.n_points(),
            embedding.n_components(),
            self.max_iter
        );

        let alignment = axis_align(&embedding.vectors, self.max_iter, self.seed)?;

        log::info!(
            "  ✓ Discretization complete: {} iterations, converged={}, sizes={:?}",
            alignment.iterations,
            alignment.converged,
            alignment.cluster_sizes()
        );
        log::info!("╔═══════════════════════════════════════════════════════╗");
        log::info!("║  STAGE B COMPLETE                                     ║");
        log::info!("╚═══════════════════════════════════════════════════════╝");

        Ok(alignment)
    }
}
