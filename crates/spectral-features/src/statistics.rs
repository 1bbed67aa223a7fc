//! Spectrum Statistics and SNV

/// Deviation below which a spectrum is treated as constant
const MIN_STD_DEV: f64 = 1e-12;

/// Summary statistics of a spectrum
#[derive(Debug, Clone, Default)]
pub struct SpectrumStatistics {
    /// Mean value
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
}

impl SpectrumStatistics {
    /// Compute statistics over a slice of values
    pub fn compute(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;

        let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;

        Self {
            mean,
            std_dev: variance.sqrt(),
        }
    }
}

/// Standard normal variate: centre on the mean, scale by the deviation
///
/// A constant spectrum, or one whose deviation is not finite, maps to zeros.
pub fn snv(spectrum: &[f64]) -> Vec<f64> {
    let stats = SpectrumStatistics::compute(spectrum);
    if !stats.std_dev.is_finite() || stats.std_dev <= MIN_STD_DEV {
        return vec![0.0; spectrum.len()];
    }
    spectrum
        .iter()
        .map(|v| (v - stats.mean) / stats.std_dev)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std_dev() {
        let stats = SpectrumStatistics::compute(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((stats.mean - 5.0).abs() < 1e-12);
        assert!((stats.std_dev - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_values() {
        let stats = SpectrumStatistics::compute(&[]);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn test_snv_is_standardized() {
        let result = snv(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let stats = SpectrumStatistics::compute(&result);
        assert!(stats.mean.abs() < 1e-12);
        assert!((stats.std_dev - 1.0).abs() < 1e-12);
        assert!(result[0] < 0.0 && result[4] > 0.0);
    }

    #[test]
    fn test_snv_constant_is_zero() {
        assert_eq!(snv(&[0.4; 6]), vec![0.0; 6]);
        assert!(snv(&[]).is_empty());
    }

    #[test]
    fn test_snv_nan_is_zero() {
        assert_eq!(snv(&[f64::NAN, 1.0, 2.0]), vec![0.0; 3]);
    }
}
