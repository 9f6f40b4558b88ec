//! Nystrom Normalized Cut: approximate spectral embedding of large point sets.
//!
//! Data flow:
//!   features [N, F]
//!     → sampling      anchors [n_a]
//!     → kernel        normalized affinity, anchor block [n_a, n_a]
//!     → nystrom       fit on anchors, stream the rest in chunks
//!     → ncut          embedding [N, n_components] in input order
//!     → discretize    one-hot labels [N, n_components]

pub mod affinity;
pub mod backend;
pub mod config;
pub mod discretize;
pub mod eigen;
pub mod error;
pub mod kernel;
pub mod linalg;
pub mod ncut;
pub mod nystrom;
pub mod sampling;

pub use config::{DistanceMetric, EigSolver, NcutConfig, SampleMethod};
pub use discretize::{axis_align, AxisAlignment};
pub use eigen::{solve_eig, EigenPairs};
pub use error::{NcutError, Result};
pub use kernel::{NormalizedAffinityKernel, OnlineKernel};
pub use ncut::NCut;
pub use nystrom::{Embedding, OnlineNystrom};
pub use sampling::{AnchorSampler, FarthestPointSampler, RandomSampler};

#[cfg(test)]
mod tests;
