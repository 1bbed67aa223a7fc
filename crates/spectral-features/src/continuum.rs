//! Continuum Removal
//!
//! Rubber-band normalization: the continuum is the upper convex envelope of
//! the spectrum over wavelength, and the spectrum is divided by it so that
//! absorption features show up as dips below 1.0.
//!
//! Inputs with no usable continuum (empty, too short, all non-finite,
//! exactly linear, flat) produce [`ContinuumOutcome::Degenerate`], which maps
//! to an all-ones vector. That is a normal result, not an error.

use tracing::debug;

/// Minimum height above a chord for a point to join the hull
pub const HULL_TOLERANCE: f64 = 1e-9;

/// Continuum values are clamped up to this before dividing
pub const CONTINUUM_FLOOR: f64 = 1e-9;

/// Slope difference under which consecutive segments count as collinear
const LINEAR_TOLERANCE: f64 = 1e-9;

/// Why no continuum could be computed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegenerateReason {
    /// Spectrum has no samples
    Empty,
    /// Fewer than two finite samples to fill gaps from
    TooFewFinite,
    /// Fewer than three usable samples after truncation
    TooShort,
    /// Wavelengths contain NaN or infinity
    NonFiniteWavelength,
    /// Fewer than two distinct wavelengths
    TooFewUnique,
    /// Points are collinear, including perfectly flat
    Linear,
    /// Division produced values that could not be repaired
    NonFiniteResult,
}

/// Result of continuum analysis
#[derive(Debug, Clone, PartialEq)]
pub enum ContinuumOutcome {
    /// Spectrum divided by its continuum, in caller order
    Removed(Vec<f64>),
    /// No usable continuum for a spectrum of `len` samples
    Degenerate { len: usize, reason: DegenerateReason },
}

impl ContinuumOutcome {
    /// Whether the input had no usable continuum
    pub fn is_degenerate(&self) -> bool {
        matches!(self, ContinuumOutcome::Degenerate { .. })
    }

    /// Continuum-removed values; degenerate inputs become all ones
    pub fn into_values(self) -> Vec<f64> {
        match self {
            ContinuumOutcome::Removed(values) => values,
            ContinuumOutcome::Degenerate { len, .. } => vec![1.0; len],
        }
    }
}

/// Continuum-removed spectrum, same length as `spectrum`, always finite
pub fn continuum_remove(spectrum: &[f64], wavelengths: &[f64]) -> Vec<f64> {
    let outcome = analyze_continuum(spectrum, wavelengths);
    if let ContinuumOutcome::Degenerate { reason, len } = &outcome {
        debug!(?reason, len, "No usable continuum, returning ones");
    }
    outcome.into_values()
}

/// Continuum removal with the degenerate cases kept distinguishable
///
/// When `wavelengths` is shorter than `spectrum` only the common prefix is
/// analysed; the remaining positions are reported as 1.0.
pub fn analyze_continuum(spectrum: &[f64], wavelengths: &[f64]) -> ContinuumOutcome {
    let len = spectrum.len();
    let degenerate = |reason| ContinuumOutcome::Degenerate { len, reason };

    if len == 0 {
        return degenerate(DegenerateReason::Empty);
    }

    let Some(filled) = fill_non_finite(spectrum) else {
        return degenerate(DegenerateReason::TooFewFinite);
    };

    let n = len.min(wavelengths.len());
    if n < 3 {
        return degenerate(DegenerateReason::TooShort);
    }
    let values = &filled[..n];
    let wavelengths = &wavelengths[..n];
    if wavelengths.iter().any(|w| !w.is_finite()) {
        return degenerate(DegenerateReason::NonFiniteWavelength);
    }

    let points = SortedPoints::new(values, wavelengths);
    if points.xs.len() < 2 {
        return degenerate(DegenerateReason::TooFewUnique);
    }
    if is_linear(&points.xs, &points.ys) {
        return degenerate(DegenerateReason::Linear);
    }

    let hull = upper_hull(&points.xs, &points.ys);
    let continuum = continuum_line(&points.xs, &points.ys, &hull);

    let mut removed = vec![1.0; len];
    for (i, value) in values.iter().enumerate() {
        removed[i] = value / continuum[points.slot[i]];
    }

    match fill_non_finite(&removed) {
        Some(repaired) => ContinuumOutcome::Removed(repaired),
        None => degenerate(DegenerateReason::NonFiniteResult),
    }
}

/// Points sorted by wavelength with duplicate wavelengths collapsed
struct SortedPoints {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Index into `xs`/`ys` for each caller position
    slot: Vec<usize>,
}

impl SortedPoints {
    fn new(values: &[f64], wavelengths: &[f64]) -> Self {
        let n = values.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| wavelengths[a].total_cmp(&wavelengths[b]));

        let mut xs: Vec<f64> = Vec::with_capacity(n);
        let mut ys: Vec<f64> = Vec::with_capacity(n);
        let mut slot = vec![0usize; n];
        for &i in &order {
            match xs.last() {
                // duplicate wavelength: the larger value wins
                Some(&last) if last == wavelengths[i] => {
                    let k = ys.len() - 1;
                    ys[k] = ys[k].max(values[i]);
                }
                _ => {
                    xs.push(wavelengths[i]);
                    ys.push(values[i]);
                }
            }
            slot[i] = xs.len() - 1;
        }

        Self { xs, ys, slot }
    }
}

/// Whether all consecutive slopes agree
fn is_linear(xs: &[f64], ys: &[f64]) -> bool {
    let mut slopes = xs
        .windows(2)
        .zip(ys.windows(2))
        .map(|(x, y)| (y[1] - y[0]) / (x[1] - x[0]));

    let Some(first) = slopes.next() else {
        return true;
    };
    first.is_finite() && slopes.all(|s| s.is_finite() && (s - first).abs() <= LINEAR_TOLERANCE)
}

/// Indices of the upper hull vertices, ascending
///
/// Splits each range at the point highest above its chord until no point
/// clears the chord by more than [`HULL_TOLERANCE`]. Ranges are kept on an
/// explicit stack so depth does not grow with spectrum length.
fn upper_hull(xs: &[f64], ys: &[f64]) -> Vec<usize> {
    let last = xs.len() - 1;
    let mut vertices = vec![0, last];
    let mut pending = vec![(0usize, last)];

    while let Some((start, end)) = pending.pop() {
        if end <= start + 1 {
            continue;
        }

        let slope = (ys[end] - ys[start]) / (xs[end] - xs[start]);
        let mut apex = None;
        let mut apex_height = HULL_TOLERANCE;
        for k in start + 1..end {
            let chord = ys[start] + slope * (xs[k] - xs[start]);
            let height = ys[k] - chord;
            if height > apex_height {
                apex_height = height;
                apex = Some(k);
            }
        }

        if let Some(k) = apex {
            vertices.push(k);
            pending.push((start, k));
            pending.push((k, end));
        }
    }

    vertices.sort_unstable();
    vertices.dedup();
    vertices
}

/// Hull vertices linearly interpolated over every sorted wavelength
fn continuum_line(xs: &[f64], ys: &[f64], hull: &[usize]) -> Vec<f64> {
    let mut line = vec![0.0; xs.len()];
    for segment in hull.windows(2) {
        let (a, b) = (segment[0], segment[1]);
        let slope = (ys[b] - ys[a]) / (xs[b] - xs[a]);
        line[a] = ys[a];
        for i in a + 1..b {
            line[i] = ys[a] + slope * (xs[i] - xs[a]);
        }
    }
    if let Some(&last) = hull.last() {
        line[last] = ys[last];
    }

    for value in &mut line {
        if *value <= CONTINUUM_FLOOR {
            *value = CONTINUUM_FLOOR;
        }
    }
    line
}

/// Replace non-finite samples by linear interpolation over sample index
///
/// Positions before the first or after the last finite sample take that
/// sample's value. Returns `None` when fewer than two samples are finite.
fn fill_non_finite(values: &[f64]) -> Option<Vec<f64>> {
    let finite: Vec<usize> = (0..values.len()).filter(|&i| values[i].is_finite()).collect();
    if finite.len() < 2 {
        return None;
    }
    if finite.len() == values.len() {
        return Some(values.to_vec());
    }

    let filled = values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            if v.is_finite() {
                return v;
            }
            let upper = finite.partition_point(|&f| f < i);
            if upper == 0 {
                values[finite[0]]
            } else if upper == finite.len() {
                values[finite[finite.len() - 1]]
            } else {
                let (lo, hi) = (finite[upper - 1], finite[upper]);
                let t = (i - lo) as f64 / (hi - lo) as f64;
                values[lo] + t * (values[hi] - values[lo])
            }
        })
        .collect();
    Some(filled)
}
