//! Cube Error Types

use thiserror::Error;

/// Errors raised while loading, describing, or slicing a cube
#[derive(Debug, Clone, Error)]
pub enum CubeError {
    /// Malformed or absent input object
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Wavelength metadata present but unusable
    #[error("Missing or invalid wavelength metadata: {0}")]
    MissingMetadata(String),

    /// Declared dimensions disagree with the data
    #[error("{what} mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Reading the backing file failed
    #[error("I/O error: {0}")]
    Io(String),

    /// Backing document could not be decoded
    #[error("Invalid cube document: {0}")]
    Format(String),

    /// Object detector failed
    #[error("Object detection failed: {0}")]
    Detection(String),
}

impl From<std::io::Error> for CubeError {
    fn from(err: std::io::Error) -> Self {
        CubeError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CubeError {
    fn from(err: serde_json::Error) -> Self {
        CubeError::Format(err.to_string())
    }
}
