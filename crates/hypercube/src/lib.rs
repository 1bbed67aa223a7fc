//! Hyperspectral Cube Model
//!
//! Shared types for the preprocessing pipeline:
//! - [`Cube`] and [`Mask`] array aliases
//! - wavelength metadata parsing and synthesis
//! - the [`CubeSource`] loading interface
//! - detector-driven cube slicing

mod error;
mod metadata;
mod slicer;
mod source;

pub use error::CubeError;
pub use metadata::{linspace, WavelengthMetadata};
pub use slicer::{
    extract_shape, BoundingBox, CubeSlicer, Detection, ObjectDetector, MIN_SLICER_BANDS,
};
pub use source::{CubeSource, DataType, InMemoryCube, JsonCubeFile, SourceGuard};

use ndarray::{Array2, Array3};

/// Reflectance cube with axes (row, column, band)
pub type Cube = Array3<f32>;

/// Foreground selection over a cube's (row, column) plane
pub type Mask = Array2<bool>;
