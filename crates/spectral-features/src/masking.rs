//! Background Masking

use hypercube::Mask;
use ndarray::{Array2, ArrayView2, ArrayViewD, Axis, Ix2, Ix3};
use tracing::debug;

use crate::error::SpectralError;

/// Normalized intensity a pixel must exceed to count as foreground
pub const DEFAULT_BACKGROUND_THRESHOLD: f64 = 0.1;

/// Keeps the normalization finite on a constant band
const EPSILON: f64 = 1e-9;

/// Compute a foreground mask from a 2-D image or a 3-D cube
///
/// A cube is judged by a single band at three quarters of its band range.
/// The band is min-max normalized and compared against `threshold`. A
/// constant band is all foreground when the constant is positive and all
/// background otherwise. Non-finite samples never count as foreground.
pub fn background_mask(image: ArrayViewD<'_, f32>, threshold: f64) -> Result<Mask, SpectralError> {
    let intensity: ArrayView2<'_, f32> = match image.ndim() {
        2 => image
            .into_dimensionality::<Ix2>()
            .map_err(|e| SpectralError::InvalidInput(e.to_string()))?,
        3 => {
            let cube = image
                .into_dimensionality::<Ix3>()
                .map_err(|e| SpectralError::InvalidInput(e.to_string()))?;
            let (rows, cols, bands) = cube.dim();
            if bands == 0 {
                return Ok(Array2::from_elem((rows, cols), false));
            }
            let mut band = bands * 3 / 4;
            if band >= bands {
                band = bands / 2;
            }
            debug!("Using band {} of {} for background intensity", band, bands);
            cube.index_axis_move(Axis(2), band)
        }
        ndim => {
            return Err(SpectralError::InvalidInput(format!(
                "Input image data must be 2D or 3D. Got {}D with shape {:?}",
                ndim,
                image.shape()
            )))
        }
    };

    if intensity.is_empty() {
        return Ok(Array2::from_elem(intensity.dim(), false));
    }

    let (min, max) = intensity
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v as f64), hi.max(v as f64))
        });

    if !min.is_finite() {
        return Ok(Array2::from_elem(intensity.dim(), false));
    }
    if max == min {
        return Ok(Array2::from_elem(intensity.dim(), min > 0.0));
    }

    let range = max - min + EPSILON;
    Ok(intensity.mapv(|v| (v as f64 - min) / range > threshold))
}
