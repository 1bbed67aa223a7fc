//! Detector-Driven Cube Slicing
//!
//! Splits a scene cube into one sub-cube per detected sample. Detection
//! itself sits behind [`ObjectDetector`]; the slicer is built once with its
//! detector and passed to whoever needs it.

use std::sync::Arc;

use ndarray::{s, Array2, Array3, ArrayView2, ArrayView3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CubeError;

/// Detectors render bands 29, 19 and 9 as RGB, so the cube needs more than 29
pub const MIN_SLICER_BANDS: usize = 30;

/// Axis-aligned box in pixel coordinates, `x` along columns and `y` along rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: usize,
    pub y1: usize,
    pub x2: usize,
    pub y2: usize,
}

impl BoundingBox {
    pub fn new(x1: usize, y1: usize, x2: usize, y2: usize) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> usize {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> usize {
        self.y2.saturating_sub(self.y1)
    }
}

/// One detected sample: its box and a segmentation mask
///
/// The mask may have a different resolution than the cube; it is sampled
/// proportionally.
#[derive(Debug, Clone)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub mask: Array2<f32>,
}

/// Finds samples in a cube
pub trait ObjectDetector: Send + Sync {
    fn detect(&self, cube: ArrayView3<'_, f32>) -> Result<Vec<Detection>, CubeError>;
}

/// Cuts a cube into per-detection sub-cubes
#[derive(Clone)]
pub struct CubeSlicer {
    detector: Arc<dyn ObjectDetector>,
}

impl CubeSlicer {
    /// Create a slicer around an already-loaded detector
    pub fn new(detector: Arc<dyn ObjectDetector>) -> Self {
        Self { detector }
    }

    /// Detect samples and extract one sub-cube for each
    pub fn slice(&self, cube: ArrayView3<'_, f32>) -> Result<Vec<Array3<f32>>, CubeError> {
        let bands = cube.dim().2;
        if bands < MIN_SLICER_BANDS {
            return Err(CubeError::InvalidInput(format!(
                "cube has {} bands; at least {} are needed to render the detector image",
                bands, MIN_SLICER_BANDS
            )));
        }

        let detections = self.detector.detect(cube)?;
        info!("Detector found {} samples", detections.len());

        detections
            .iter()
            .map(|detection| extract_shape(cube, detection.bbox, detection.mask.view()))
            .collect()
    }
}

impl std::fmt::Debug for CubeSlicer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CubeSlicer").finish_non_exhaustive()
    }
}

/// Copy the masked pixels of `bbox` out of `cube`
///
/// Pixels inside the box whose mask sample is unset stay zero.
pub fn extract_shape(
    cube: ArrayView3<'_, f32>,
    bbox: BoundingBox,
    mask: ArrayView2<'_, f32>,
) -> Result<Array3<f32>, CubeError> {
    let (rows, cols, bands) = cube.dim();
    let (mask_rows, mask_cols) = mask.dim();

    if bbox.x1 > bbox.x2 || bbox.y1 > bbox.y2 || bbox.x2 > cols || bbox.y2 > rows {
        return Err(CubeError::InvalidInput(format!(
            "box {:?} does not fit a {}x{} cube",
            bbox, rows, cols
        )));
    }

    let height = bbox.height();
    let width = bbox.width();
    let mut shape = Array3::<f32>::zeros((height, width, bands));
    if height == 0 || width == 0 {
        return Ok(shape);
    }
    if mask_rows == 0 || mask_cols == 0 {
        return Err(CubeError::InvalidInput("detection mask is empty".to_string()));
    }

    let row_scale = mask_rows as f64 / rows as f64;
    let col_scale = mask_cols as f64 / cols as f64;

    let mut copied = 0usize;
    for j in 0..height {
        let mask_row = (((j + bbox.y1) as f64 * row_scale) as usize).min(mask_rows - 1);
        for k in 0..width {
            let mask_col = (((k + bbox.x1) as f64 * col_scale) as usize).min(mask_cols - 1);
            if mask[[mask_row, mask_col]] >= 0.5 {
                shape
                    .slice_mut(s![j, k, ..])
                    .assign(&cube.slice(s![j + bbox.y1, k + bbox.x1, ..]));
                copied += 1;
            }
        }
    }

    debug!("Extracted {}x{} shape with {} masked pixels", height, width, copied);
    Ok(shape)
}
