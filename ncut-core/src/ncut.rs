//! Nystrom Normalized Cut driver.
//!
//! Fit on a subsample, extend to the rest:
//!   1. pick anchors (sampler, or caller-provided indices)
//!   2. exact decomposition of the anchor kernel        → OnlineNystrom::fit
//!   3. one streaming update with every non-anchor point → OnlineNystrom::update
//!   4. scatter anchor rows (re-projected under the final degrees) and
//!      non-anchor rows back into input order
//!
//! Every `fit*` call starts from scratch; nothing carries over between calls.

use log::{debug, info};
use nalgebra::{DMatrix, DVector};

use crate::config::NcutConfig;
use crate::error::{NcutError, Result};
use crate::kernel::NormalizedAffinityKernel;
use crate::linalg::select_rows;
use crate::nystrom::{Embedding, OnlineNystrom};

pub struct NCut {
    pub config: NcutConfig,
    engine: OnlineNystrom<NormalizedAffinityKernel>,
    anchor_indices: Option<Vec<usize>>,
    eigenvalues: Option<DVector<f64>>,
}

impl NCut {
    /// Build a driver; the config is validated here so bad values fail before any work.
    pub fn new(config: NcutConfig) -> Result<Self> {
        config.validate()?;
        let kernel = NormalizedAffinityKernel::from_config(&config);
        let engine = OnlineNystrom::new(
            config.n_components,
            kernel,
            config.eig_solver,
            config.chunk_size,
            config.seed,
        )?;
        debug!("{}", config.summary());
        Ok(Self {
            config,
            engine,
            anchor_indices: None,
            eigenvalues: None,
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(NcutConfig::default())
    }

    /// Embed every row of `features` [N, F] → [N, n_components].
    ///
    /// `precomputed_indices` bypasses the sampler; they must be unique,
    /// in range and non-empty.
    pub fn fit_transform(
        &mut self,
        features: &DMatrix<f64>,
        precomputed_indices: Option<&[usize]>,
    ) -> Result<Embedding> {
        let n = features.nrows();
        if n == 0 || features.ncols() == 0 {
            return Err(NcutError::EmptyInput("ncut features".into()));
        }

        self.anchor_indices = None;
        self.eigenvalues = None;

        let anchors = match precomputed_indices {
            Some(indices) => {
                validate_indices(indices, n)?;
                info!("Using {} precomputed anchors", indices.len());
                indices.to_vec()
            }
            None => {
                let mut sampler = self
                    .config
                    .sample_method
                    .sampler(self.config.distance, self.config.seed);
                let picked = sampler.sample(features, self.config.num_sample)?;
                debug!("{}", sampler);
                picked
            }
        };

        let mut is_anchor = vec![false; n];
        for &i in &anchors {
            is_anchor[i] = true;
        }
        let rest: Vec<usize> = (0..n).filter(|&i| !is_anchor[i]).collect();

        info!(
            "NCut: {} points, {} anchors, {} to extend",
            n,
            anchors.len(),
            rest.len()
        );

        let anchor_features = select_rows(features, &anchors);
        let fitted = self.engine.fit(&anchor_features)?;

        let (anchor_emb, rest_emb, eigenvalues) = if rest.is_empty() {
            debug!("Every point is an anchor, no extension needed");
            (fitted.vectors, None, fitted.eigenvalues)
        } else {
            let rest_features = select_rows(features, &rest);
            let extended = self.engine.update(&rest_features)?;
            let anchor_emb = self.engine.transform_anchors()?;
            (anchor_emb.vectors, Some(extended.vectors), extended.eigenvalues)
        };

        let nc = eigenvalues.len();
        let mut vectors = DMatrix::<f64>::zeros(n, nc);
        for (r, &i) in anchors.iter().enumerate() {
            vectors.row_mut(i).copy_from(&anchor_emb.row(r));
        }
        if let Some(rest_emb) = rest_emb {
            for (r, &i) in rest.iter().enumerate() {
                vectors.row_mut(i).copy_from(&rest_emb.row(r));
            }
        }

        info!(
            "✓ NCut embedding: {} × {}, λ₁={:.6}",
            n,
            nc,
            eigenvalues[0]
        );

        self.anchor_indices = Some(anchors);
        self.eigenvalues = Some(eigenvalues.clone());

        Ok(Embedding {
            vectors,
            eigenvalues,
        })
    }

    /// Same as `fit_transform`, keeping only the fitted state.
    pub fn fit(&mut self, features: &DMatrix<f64>, precomputed_indices: Option<&[usize]>) -> Result<()> {
        self.fit_transform(features, precomputed_indices).map(|_| ())
    }

    /// Project new points through the fitted engine. Does not change any state.
    pub fn transform(&self, features: &DMatrix<f64>) -> Result<Embedding> {
        self.engine.transform(features)
    }

    /// Anchors used by the last fit, in the order they were fitted.
    pub fn anchor_indices(&self) -> Result<&[usize]> {
        self.anchor_indices
            .as_deref()
            .ok_or(NcutError::NotFitted("anchor_indices"))
    }

    pub fn eigenvalues(&self) -> Result<&DVector<f64>> {
        self.eigenvalues
            .as_ref()
            .ok_or(NcutError::NotFitted("eigenvalues"))
    }

    pub fn engine(&self) -> &OnlineNystrom<NormalizedAffinityKernel> {
        &self.engine
    }
}

fn validate_indices(indices: &[usize], n: usize) -> Result<()> {
    if indices.is_empty() {
        return Err(NcutError::EmptyInput("precomputed anchor indices".into()));
    }
    let mut seen = vec![false; n];
    for &i in indices {
        if i >= n {
            return Err(NcutError::Configuration(format!(
                "anchor index {i} out of range for {n} points"
            )));
        }
        if seen[i] {
            return Err(NcutError::Configuration(format!(
                "anchor index {i} appears more than once"
            )));
        }
        seen[i] = true;
    }
    Ok(())
}
