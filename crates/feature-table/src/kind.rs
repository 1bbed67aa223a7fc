//! Feature Kinds

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AssemblyError;

/// Spectral transform emitted as a block of feature columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureKind {
    /// Masked mean spectrum
    #[serde(rename = "avg_spectrum")]
    AvgSpectrum,
    /// First derivative of the mean spectrum
    #[serde(rename = "deriv1_avg_spectrum")]
    Deriv1AvgSpectrum,
    /// Mean spectrum divided by its continuum
    #[serde(rename = "continuum_removed_avg_spectrum")]
    ContinuumRemovedAvgSpectrum,
    /// Standard normal variate of the mean spectrum
    #[serde(rename = "snv_avg_spectrum")]
    SnvAvgSpectrum,
    /// First derivative of the continuum-removed spectrum
    #[serde(rename = "deriv1_continuum_removed")]
    Deriv1ContinuumRemoved,
}

impl FeatureKind {
    /// Every kind, in evaluation order
    pub const ALL: [FeatureKind; 5] = [
        FeatureKind::AvgSpectrum,
        FeatureKind::Deriv1AvgSpectrum,
        FeatureKind::ContinuumRemovedAvgSpectrum,
        FeatureKind::SnvAvgSpectrum,
        FeatureKind::Deriv1ContinuumRemoved,
    ];

    /// Stable identifier used in column names and configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::AvgSpectrum => "avg_spectrum",
            FeatureKind::Deriv1AvgSpectrum => "deriv1_avg_spectrum",
            FeatureKind::ContinuumRemovedAvgSpectrum => "continuum_removed_avg_spectrum",
            FeatureKind::SnvAvgSpectrum => "snv_avg_spectrum",
            FeatureKind::Deriv1ContinuumRemoved => "deriv1_continuum_removed",
        }
    }

    /// Column name for band `index` of this kind
    pub fn column_name(&self, index: usize) -> String {
        format!("{}_b{}", self.as_str(), index)
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureKind {
    type Err = AssemblyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| AssemblyError::UnknownKind(s.to_string()))
    }
}
