//! Preprocessing Error Types

use feature_table::AssemblyError;
use hypercube::CubeError;
use spectral_features::SpectralError;
use thiserror::Error;

/// Failure kinds surfaced to callers of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    ShapeMismatch,
    MissingMetadata,
    BackgroundRemoval,
    DataProcessing,
}

impl ErrorKind {
    /// HTTP status a transport layer should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::InvalidInput | ErrorKind::ShapeMismatch | ErrorKind::MissingMetadata => 400,
            ErrorKind::BackgroundRemoval => 422,
            ErrorKind::DataProcessing => 500,
        }
    }

    /// Whether the request itself was at fault
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::ShapeMismatch => "shape_mismatch",
            ErrorKind::MissingMetadata => "missing_metadata",
            ErrorKind::BackgroundRemoval => "background_removal",
            ErrorKind::DataProcessing => "data_processing",
        }
    }
}

/// Errors raised by the preprocessing pipeline
#[derive(Debug, Clone, Error)]
pub enum PreprocessError {
    /// Malformed or absent input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Array dimensions disagree
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Wavelength metadata present but unusable
    #[error("Missing metadata: {0}")]
    MissingMetadata(String),

    /// Background removal left no foreground pixels
    #[error("Background removal failed: {0}")]
    BackgroundRemoval(String),

    /// Internal invariant or configuration failure
    #[error("Data processing failed: {0}")]
    DataProcessing(String),
}

impl PreprocessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PreprocessError::InvalidInput(_) => ErrorKind::InvalidInput,
            PreprocessError::ShapeMismatch(_) => ErrorKind::ShapeMismatch,
            PreprocessError::MissingMetadata(_) => ErrorKind::MissingMetadata,
            PreprocessError::BackgroundRemoval(_) => ErrorKind::BackgroundRemoval,
            PreprocessError::DataProcessing(_) => ErrorKind::DataProcessing,
        }
    }
}

impl From<CubeError> for PreprocessError {
    fn from(err: CubeError) -> Self {
        let message = err.to_string();
        match err {
            CubeError::InvalidInput(_) | CubeError::Io(_) | CubeError::Format(_) => {
                PreprocessError::InvalidInput(message)
            }
            CubeError::MissingMetadata(_) => PreprocessError::MissingMetadata(message),
            CubeError::ShapeMismatch { .. } => PreprocessError::ShapeMismatch(message),
            CubeError::Detection(_) => PreprocessError::DataProcessing(message),
        }
    }
}

impl From<SpectralError> for PreprocessError {
    fn from(err: SpectralError) -> Self {
        let message = err.to_string();
        match err {
            SpectralError::InvalidInput(_) => PreprocessError::InvalidInput(message),
            SpectralError::ShapeMismatch { .. } => PreprocessError::ShapeMismatch(message),
            SpectralError::InvalidParameters(_) => PreprocessError::DataProcessing(message),
        }
    }
}

impl From<AssemblyError> for PreprocessError {
    fn from(err: AssemblyError) -> Self {
        let message = err.to_string();
        match err {
            AssemblyError::ShapeMismatch { .. } => PreprocessError::ShapeMismatch(message),
            AssemblyError::UnknownKind(_) => PreprocessError::InvalidInput(message),
            AssemblyError::EmptyBatch
            | AssemblyError::KeyMismatch { .. }
            | AssemblyError::Csv(_) => PreprocessError::DataProcessing(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ErrorKind::InvalidInput.status_code(), 400);
        assert_eq!(ErrorKind::ShapeMismatch.status_code(), 400);
        assert_eq!(ErrorKind::MissingMetadata.status_code(), 400);
        assert_eq!(ErrorKind::BackgroundRemoval.status_code(), 422);
        assert_eq!(ErrorKind::DataProcessing.status_code(), 500);
        assert!(ErrorKind::BackgroundRemoval.is_client_error());
        assert!(!ErrorKind::DataProcessing.is_client_error());
    }

    #[test]
    fn test_component_kinds_are_preserved() {
        let err: PreprocessError = CubeError::MissingMetadata("wavelength".into()).into();
        assert_eq!(err.kind(), ErrorKind::MissingMetadata);

        let err: PreprocessError = SpectralError::ShapeMismatch {
            what: "band count",
            expected: 4,
            actual: 6,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);

        let err: PreprocessError = SpectralError::InvalidParameters("window".into()).into();
        assert_eq!(err.kind(), ErrorKind::DataProcessing);

        let err: PreprocessError = AssemblyError::UnknownKind("x".into()).into();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_message_keeps_component_detail() {
        let err: PreprocessError = CubeError::Io("no such file".into()).into();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("no such file"));
    }
}
