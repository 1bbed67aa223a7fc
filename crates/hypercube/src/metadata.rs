//! Wavelength Metadata

use serde::{Deserialize, Serialize};

use crate::error::CubeError;

/// Raw wavelength entries as they appear in a cube header
///
/// Entries stay textual until [`WavelengthMetadata::parse`] so that a header
/// carrying garbage can be told apart from a header carrying nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WavelengthMetadata {
    entries: Vec<String>,
}

impl WavelengthMetadata {
    /// Wrap raw textual entries
    pub fn new(entries: Vec<String>) -> Self {
        Self { entries }
    }

    /// Build metadata from already-numeric wavelengths
    pub fn from_values(values: &[f64]) -> Self {
        Self {
            entries: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// Number of raw entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the header listed no wavelengths at all
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse entries into wavelengths, requiring one per band
    pub fn parse(&self, expected_bands: usize) -> Result<Vec<f64>, CubeError> {
        if self.entries.len() != expected_bands {
            return Err(CubeError::MissingMetadata(format!(
                "header lists {} wavelengths but the cube has {} bands",
                self.entries.len(),
                expected_bands
            )));
        }

        self.entries
            .iter()
            .map(|entry| {
                let trimmed = entry.trim();
                match trimmed.parse::<f64>() {
                    Ok(v) if v.is_finite() => Ok(v),
                    _ => Err(CubeError::MissingMetadata(format!(
                        "wavelength entry '{}' is not a number",
                        trimmed
                    ))),
                }
            })
            .collect()
    }
}

/// Evenly spaced values over `[start, end]`, endpoints included
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut values: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            // pin the last sample so it is exactly `end`
            values[n - 1] = end;
            values
        }
    }
}
