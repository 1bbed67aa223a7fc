//! Assembly Error Types

use thiserror::Error;

use crate::kind::FeatureKind;

/// Errors raised while assembling or encoding feature rows
#[derive(Debug, Clone, Error)]
pub enum AssemblyError {
    /// A feature vector does not have the configured band count
    #[error("Feature '{kind}' array length {actual} does not match target_bands {expected}")]
    ShapeMismatch {
        kind: FeatureKind,
        expected: usize,
        actual: usize,
    },

    /// Identifier is not one of the stable feature kind names
    #[error("Unknown feature kind '{0}'")]
    UnknownKind(String),

    /// Batched assembly was given no feature sets
    #[error("Cannot assemble an empty batch of feature sets")]
    EmptyBatch,

    /// Feature sets in a batch carry different feature kinds
    #[error("Feature set {index} has kinds {found:?}, expected {expected:?}")]
    KeyMismatch {
        index: usize,
        expected: Vec<FeatureKind>,
        found: Vec<FeatureKind>,
    },

    /// CSV encoding or decoding failed
    #[error("CSV error: {0}")]
    Csv(String),
}

impl From<csv::Error> for AssemblyError {
    fn from(err: csv::Error) -> Self {
        AssemblyError::Csv(err.to_string())
    }
}
