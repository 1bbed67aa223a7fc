//! Band Resampling
//!
//! Re-samples every pixel's spectrum onto an evenly spaced wavelength grid
//! spanning the original range. Targets outside the fitted range are
//! extrapolated from the end segments, never clipped. Pixels are independent
//! and processed in parallel.

use std::fmt;
use std::str::FromStr;

use hypercube::linspace;
use ndarray::{Array3, ArrayView3, ArrayViewMut1, Axis, Zip};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SpectralError;

/// 1-D interpolant fitted per pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationKind {
    /// Piecewise linear
    #[default]
    Linear,
    /// Nearest original sample
    Nearest,
    /// Natural cubic spline
    Cubic,
}

impl InterpolationKind {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            InterpolationKind::Linear => "linear",
            InterpolationKind::Nearest => "nearest",
            InterpolationKind::Cubic => "cubic",
        }
    }

    /// Fewest original bands the interpolant can be fitted to
    pub fn min_samples(&self) -> usize {
        match self {
            InterpolationKind::Nearest => 1,
            InterpolationKind::Linear => 2,
            InterpolationKind::Cubic => 4,
        }
    }
}

impl fmt::Display for InterpolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterpolationKind {
    type Err = SpectralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(InterpolationKind::Linear),
            "nearest" => Ok(InterpolationKind::Nearest),
            "cubic" => Ok(InterpolationKind::Cubic),
            other => Err(SpectralError::InvalidInput(format!(
                "unknown interpolation kind '{}'",
                other
            ))),
        }
    }
}

/// Resample `cube` from its native bands to `target_bands` bands
///
/// Returns the resampled cube together with the target wavelengths, an
/// evenly spaced grid over `[min, max]` of `original_wavelengths`.
pub fn resample(
    cube: ArrayView3<'_, f32>,
    original_wavelengths: &[f64],
    target_bands: usize,
    kind: InterpolationKind,
) -> Result<(Array3<f32>, Vec<f64>), SpectralError> {
    let (rows, cols, bands) = cube.dim();

    if bands != original_wavelengths.len() {
        return Err(SpectralError::ShapeMismatch {
            what: "band count",
            expected: original_wavelengths.len(),
            actual: bands,
        });
    }
    if bands < kind.min_samples() {
        return Err(SpectralError::InvalidInput(format!(
            "{} interpolation needs at least {} bands, cube has {}",
            kind,
            kind.min_samples(),
            bands
        )));
    }
    if original_wavelengths.iter().any(|w| !w.is_finite()) {
        return Err(SpectralError::InvalidInput(
            "original wavelengths contain non-finite values".to_string(),
        ));
    }

    let (min_wv, max_wv) = original_wavelengths
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &w| (lo.min(w), hi.max(w)));
    let target_wavelengths = linspace(min_wv, max_wv, target_bands);

    let grid = SampleGrid::new(original_wavelengths, &target_wavelengths)?;

    debug!(
        "Resampling {}x{} cube from {} to {} bands ({})",
        rows, cols, bands, target_bands, kind
    );

    let mut resampled = Array3::<f32>::zeros((rows, cols, target_bands));
    Zip::from(resampled.lanes_mut(Axis(2)))
        .and(cube.lanes(Axis(2)))
        .par_for_each(|out, pixel| {
            let ys: Vec<f64> = grid.order.iter().map(|&i| pixel[i] as f64).collect();
            match kind {
                InterpolationKind::Linear => grid.linear(&ys, out),
                InterpolationKind::Nearest => grid.nearest(&ys, out),
                InterpolationKind::Cubic => grid.cubic(&ys, out),
            }
        });

    Ok((resampled, target_wavelengths))
}

/// Original sample positions and the target positions located on them
struct SampleGrid {
    /// Original band indices in ascending wavelength order
    order: Vec<usize>,
    /// Sorted original wavelengths
    xs: Vec<f64>,
    /// Target wavelengths
    targets: Vec<f64>,
    /// Segment `i` (between `xs[i]` and `xs[i + 1]`) used for each target
    segments: Vec<usize>,
}

impl SampleGrid {
    fn new(original: &[f64], targets: &[f64]) -> Result<Self, SpectralError> {
        let mut order: Vec<usize> = (0..original.len()).collect();
        order.sort_by(|&a, &b| original[a].total_cmp(&original[b]));
        let xs: Vec<f64> = order.iter().map(|&i| original[i]).collect();

        if xs.windows(2).any(|w| w[0] == w[1]) {
            return Err(SpectralError::InvalidInput(
                "original wavelengths contain duplicates".to_string(),
            ));
        }

        let last_segment = xs.len().saturating_sub(2);
        let segments = targets
            .iter()
            .map(|&t| xs.partition_point(|&x| x <= t).saturating_sub(1).min(last_segment))
            .collect();

        Ok(Self {
            order,
            xs,
            targets: targets.to_vec(),
            segments,
        })
    }

    fn linear(&self, ys: &[f64], mut out: ArrayViewMut1<'_, f32>) {
        for ((slot, &t), &i) in out.iter_mut().zip(&self.targets).zip(&self.segments) {
            let (x0, x1) = (self.xs[i], self.xs[i + 1]);
            let w = (t - x0) / (x1 - x0);
            let value = if w == 0.0 {
                ys[i]
            } else if w == 1.0 {
                ys[i + 1]
            } else {
                ys[i] + w * (ys[i + 1] - ys[i])
            };
            *slot = value as f32;
        }
    }

    fn nearest(&self, ys: &[f64], mut out: ArrayViewMut1<'_, f32>) {
        for (slot, &t) in out.iter_mut().zip(&self.targets) {
            let upper = self.xs.partition_point(|&x| x < t).min(self.xs.len() - 1);
            let idx = if upper > 0 && (t - self.xs[upper - 1]) <= (self.xs[upper] - t) {
                upper - 1
            } else {
                upper
            };
            *slot = ys[idx] as f32;
        }
    }

    fn cubic(&self, ys: &[f64], mut out: ArrayViewMut1<'_, f32>) {
        let m = natural_spline_moments(&self.xs, ys);
        for ((slot, &t), &i) in out.iter_mut().zip(&self.targets).zip(&self.segments) {
            let (x0, x1) = (self.xs[i], self.xs[i + 1]);
            let h = x1 - x0;
            let a = x1 - t;
            let b = t - x0;
            let value = m[i] * a.powi(3) / (6.0 * h)
                + m[i + 1] * b.powi(3) / (6.0 * h)
                + (ys[i] / h - m[i] * h / 6.0) * a
                + (ys[i + 1] / h - m[i + 1] * h / 6.0) * b;
            *slot = value as f32;
        }
    }
}

/// Second derivatives of the natural cubic spline through `(xs, ys)`
fn natural_spline_moments(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let mut m = vec![0.0; n];
    if n < 3 {
        return m;
    }

    // Thomas algorithm over the interior moments; M[0] = M[n-1] = 0
    let inner = n - 2;
    let mut diag = vec![0.0; inner];
    let mut upper = vec![0.0; inner];
    let mut rhs = vec![0.0; inner];
    for k in 0..inner {
        let i = k + 1;
        let h0 = xs[i] - xs[i - 1];
        let h1 = xs[i + 1] - xs[i];
        diag[k] = 2.0 * (h0 + h1);
        upper[k] = h1;
        rhs[k] = 6.0 * ((ys[i + 1] - ys[i]) / h1 - (ys[i] - ys[i - 1]) / h0);
    }
    for k in 1..inner {
        let lower = xs[k + 1] - xs[k];
        let factor = lower / diag[k - 1];
        diag[k] -= factor * upper[k - 1];
        rhs[k] -= factor * rhs[k - 1];
    }
    m[inner] = rhs[inner - 1] / diag[inner - 1];
    for k in (0..inner - 1).rev() {
        m[k + 1] = (rhs[k] - upper[k] * m[k + 2]) / diag[k];
    }
    m
}
