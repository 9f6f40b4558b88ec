//! Spectral clustering pipeline.
//!
//! 1. Embedding       features [N, F] → Nystrom NCut embedding [N, k]
//! 2. Discretization  embedding [N, k] → one-hot labels [N, k]

pub mod stages;

use nalgebra::{DMatrix, DVector};
use ncut_core::{NcutConfig, Result};

use crate::stages::discretization::DiscretizationStage;
use crate::stages::embedding::EmbeddingStage;

/// Everything the pipeline produces, in input row order.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// [N, k] continuous embedding.
    pub embedding: DMatrix<f64>,
    /// [k] eigenvalues, descending.
    pub eigenvalues: DVector<f64>,
    /// [N, k] exactly one 1.0 per row.
    pub one_hot: DMatrix<f64>,
    /// [N] cluster id per row.
    pub labels: Vec<usize>,
    /// [k, k] final axis-alignment rotation.
    pub rotation: DMatrix<f64>,
    pub converged: bool,
    pub anchor_indices: Vec<usize>,
}

impl PipelineOutput {
    pub fn n_clusters(&self) -> usize {
        self.one_hot.ncols()
    }

    pub fn summary(&self) -> String {
        format!(
            "PipelineOutput: N={}, k={}, anchors={}, converged={}",
            self.labels.len(),
            self.n_clusters(),
            self.anchor_indices.len(),
            self.converged,
        )
    }
}

/// Runs the embedding and discretization stages back to back.
pub struct SpectralClusteringPipeline {
    pub config: NcutConfig,
    /// Fixed anchor set; the configured sampler is used when `None`.
    pub precomputed_indices: Option<Vec<usize>>,
}

impl SpectralClusteringPipeline {
    /// Validates `config` up front so a bad value fails before any stage runs.
    pub fn new(config: NcutConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            precomputed_indices: None,
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(NcutConfig::default())
    }

    pub fn with_precomputed_indices(mut self, indices: Vec<usize>) -> Self {
        self.precomputed_indices = Some(indices);
        self
    }

    pub fn execute(&self, features: &DMatrix<f64>) -> Result<PipelineOutput> {
        log::info!(
            "🚀 Starting spectral clustering on [{}×{}]",
            features.nrows(),
            features.ncols()
        );
        log::debug!("{}", self.config.summary());

        // Stage A: embedding
        let embedded = EmbeddingStage::new(self.config.clone())
            .execute(features, self.precomputed_indices.as_deref())?;

        // Stage B: discretization
        let alignment = DiscretizationStage::from_config(&self.config).execute(&embedded.embedding)?;

        let output = PipelineOutput {
            embedding: embedded.embedding.vectors,
            eigenvalues: embedded.embedding.eigenvalues,
            one_hot: alignment.one_hot,
            labels: alignment.labels,
            rotation: alignment.rotation,
            converged: alignment.converged,
            anchor_indices: embedded.anchor_indices,
        };

        log::info!("✓ Pipeline complete: {}", output.summary());
        Ok(output)
    }
}

#[cfg(test)]
mod tests;
