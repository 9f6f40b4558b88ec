//! Error types for the Nystrom Normalized Cut core.

use thiserror::Error;

/// Root error type for every fallible operation in the crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NcutError {
    /// Invalid parameters: unknown backend name, non-positive counts, bad γ.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A division by a non-positive row sum, a singular anchor kernel,
    /// or NaN/Inf leaking out of a decomposition.
    #[error("numerical degeneracy: {0}")]
    NumericalDegeneracy(String),

    /// Matrix dimensions do not line up.
    #[error("shape mismatch in {context}: expected {expected}, got {got}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },

    /// `update`/`transform` called before `fit`.
    #[error("{0} called before fit")]
    NotFitted(&'static str),

    /// Empty input where non-empty was required.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// Tensor backend failed to hand data back to the host.
    #[error("tensor backend error: {0}")]
    Backend(String),
}

/// Result type alias for ncut operations.
pub type Result<T> = std::result::Result<T, NcutError>;
