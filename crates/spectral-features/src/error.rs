//! Spectral Error Types

use thiserror::Error;

/// Errors raised by the numerical stages
#[derive(Debug, Clone, Error)]
pub enum SpectralError {
    /// Input array is malformed (wrong rank, too few samples, bad wavelengths)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Two arrays that must agree in size do not
    #[error("{what} mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Filter parameters are unusable
    #[error("Invalid filter parameters: {0}")]
    InvalidParameters(String),
}
