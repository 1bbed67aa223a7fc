//! Cube Sources
//!
//! A cube source describes a cube (dimensions, sample type, wavelength
//! metadata) before its samples are read, and hands the samples over once on
//! [`CubeSource::load`]. Whatever the source holds open is given back through
//! [`CubeSource::release`]; [`SourceGuard`] calls it on every exit path.

use std::fs::File;
use std::io::{BufReader, Read};
use std::ops::{Deref, DerefMut};
use std::path::Path;

use ndarray::Array3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CubeError;
use crate::metadata::WavelengthMetadata;
use crate::Cube;

/// Sample type of the stored cube
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    UInt8,
    Int16,
    UInt16,
    #[default]
    Float32,
    Float64,
}

/// Something a cube can be loaded from
pub trait CubeSource {
    /// Number of image rows (lines)
    fn rows(&self) -> usize;
    /// Number of image columns (samples)
    fn cols(&self) -> usize;
    /// Number of wavelength bands
    fn bands(&self) -> usize;
    /// Stored sample type
    fn dtype(&self) -> DataType;
    /// Wavelength entries from the header, if the header had any
    fn wavelength_metadata(&self) -> Option<&WavelengthMetadata>;
    /// Read the samples as a (row, column, band) cube
    fn load(&mut self) -> Result<Cube, CubeError>;
    /// Give back whatever the source holds open
    fn release(&mut self) {}
}

/// Borrows a source and releases it when dropped
pub struct SourceGuard<'a, S: CubeSource + ?Sized> {
    source: &'a mut S,
}

impl<'a, S: CubeSource + ?Sized> SourceGuard<'a, S> {
    pub fn new(source: &'a mut S) -> Self {
        Self { source }
    }
}

impl<S: CubeSource + ?Sized> Deref for SourceGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.source
    }
}

impl<S: CubeSource + ?Sized> DerefMut for SourceGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.source
    }
}

impl<S: CubeSource + ?Sized> Drop for SourceGuard<'_, S> {
    fn drop(&mut self) {
        self.source.release();
    }
}

/// Cube already resident in memory
#[derive(Debug, Clone)]
pub struct InMemoryCube {
    cube: Option<Cube>,
    dims: (usize, usize, usize),
    metadata: Option<WavelengthMetadata>,
    released: bool,
}

impl InMemoryCube {
    /// Wrap a cube and its optional header wavelengths
    pub fn new(cube: Cube, metadata: Option<WavelengthMetadata>) -> Self {
        Self {
            dims: cube.dim(),
            cube: Some(cube),
            metadata,
            released: false,
        }
    }

    /// Whether [`CubeSource::release`] has run
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl CubeSource for InMemoryCube {
    fn rows(&self) -> usize {
        self.dims.0
    }

    fn cols(&self) -> usize {
        self.dims.1
    }

    fn bands(&self) -> usize {
        self.dims.2
    }

    fn dtype(&self) -> DataType {
        DataType::Float32
    }

    fn wavelength_metadata(&self) -> Option<&WavelengthMetadata> {
        self.metadata.as_ref()
    }

    fn load(&mut self) -> Result<Cube, CubeError> {
        self.cube
            .take()
            .ok_or_else(|| CubeError::InvalidInput("cube has already been loaded".to_string()))
    }

    fn release(&mut self) {
        self.cube = None;
        self.released = true;
    }
}

/// JSON cube document, samples stored row-major as (row, column, band)
#[derive(Debug, Deserialize)]
struct CubeDocument {
    rows: usize,
    cols: usize,
    bands: usize,
    #[serde(default)]
    data_type: DataType,
    data: Vec<f32>,
    #[serde(default)]
    wavelengths: Option<Vec<serde_json::Value>>,
}

/// Cube read from a JSON document
///
/// The document is parsed when the source is opened so the dimensions and
/// wavelengths are known up front; the sample buffer is kept until
/// [`CubeSource::load`] takes it or [`CubeSource::release`] drops it.
#[derive(Debug)]
pub struct JsonCubeFile {
    rows: usize,
    cols: usize,
    bands: usize,
    dtype: DataType,
    metadata: Option<WavelengthMetadata>,
    buffer: Option<Vec<f32>>,
}

impl JsonCubeFile {
    /// Open and parse a JSON cube file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CubeError> {
        let path = path.as_ref();
        debug!("Opening JSON cube {}", path.display());
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parse a JSON cube document from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CubeError> {
        let doc: CubeDocument = serde_json::from_reader(reader)?;

        // an empty list carries no information, same as a missing one
        let metadata = doc
            .wavelengths
            .filter(|entries| !entries.is_empty())
            .map(|entries| {
                WavelengthMetadata::new(
                    entries
                        .into_iter()
                        .map(|value| match value {
                            serde_json::Value::String(s) => s,
                            other => other.to_string(),
                        })
                        .collect(),
                )
            });

        Ok(Self {
            rows: doc.rows,
            cols: doc.cols,
            bands: doc.bands,
            dtype: doc.data_type,
            metadata,
            buffer: Some(doc.data),
        })
    }

    /// Whether the sample buffer is still held
    pub fn is_open(&self) -> bool {
        self.buffer.is_some()
    }
}

impl CubeSource for JsonCubeFile {
    fn rows(&self) -> usize {
        self.rows
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn bands(&self) -> usize {
        self.bands
    }

    fn dtype(&self) -> DataType {
        self.dtype
    }

    fn wavelength_metadata(&self) -> Option<&WavelengthMetadata> {
        self.metadata.as_ref()
    }

    fn load(&mut self) -> Result<Cube, CubeError> {
        let data = self
            .buffer
            .take()
            .ok_or_else(|| CubeError::InvalidInput("cube has already been loaded".to_string()))?;

        let expected = self
            .rows
            .checked_mul(self.cols)
            .and_then(|n| n.checked_mul(self.bands))
            .ok_or_else(|| {
                CubeError::InvalidInput(format!(
                    "cube dimensions {}x{}x{} are too large",
                    self.rows, self.cols, self.bands
                ))
            })?;
        if data.len() != expected {
            return Err(CubeError::ShapeMismatch {
                what: "sample count",
                expected,
                actual: data.len(),
            });
        }

        Array3::from_shape_vec((self.rows, self.cols, self.bands), data)
            .map_err(|e| CubeError::InvalidInput(e.to_string()))
    }

    fn release(&mut self) {
        self.buffer = None;
    }
}
