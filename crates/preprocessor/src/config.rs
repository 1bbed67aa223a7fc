//! Preprocessing configuration

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use config::{Config, ConfigError, Environment, File};
use feature_table::FeatureKind;
use serde::{Deserialize, Serialize};
use spectral_features::{InterpolationKind, DEFAULT_BACKGROUND_THRESHOLD};

use crate::error::PreprocessError;

/// Options for one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Feature kinds to emit
    pub extraction_methods: Vec<FeatureKind>,

    /// Band count after resampling
    pub target_bands: usize,

    /// Interpolation used by the resampler
    pub interpolation: InterpolationKind,

    /// Wavelength range synthesized when the cube has no wavelengths (nm)
    pub min_wavelength: f64,
    pub max_wavelength: f64,

    /// Drop background pixels before averaging
    pub remove_background: bool,

    /// Normalized intensity above which a pixel is foreground
    pub background_threshold: f64,

    /// Savitzky-Golay window length (odd)
    pub savgol_window: usize,

    /// Savitzky-Golay polynomial order
    pub savgol_polyorder: usize,

    /// Emit the placeholder metadata columns
    pub extra_features: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            extraction_methods: FeatureKind::ALL.to_vec(),
            target_bands: 100,
            interpolation: InterpolationKind::Linear,
            min_wavelength: 400.0,
            max_wavelength: 900.0,
            remove_background: false,
            background_threshold: DEFAULT_BACKGROUND_THRESHOLD,
            savgol_window: 11,
            savgol_polyorder: 2,
            extra_features: false,
        }
    }
}

impl ExtractionConfig {
    /// Create config with background removal enabled
    pub fn with_background_removal() -> Self {
        Self {
            remove_background: true,
            ..Default::default()
        }
    }

    /// Create config that exports the placeholder columns as well
    pub fn full_export() -> Self {
        Self {
            extra_features: true,
            ..Default::default()
        }
    }

    /// Whether `kind` was requested
    pub fn requests(&self, kind: FeatureKind) -> bool {
        self.extraction_methods.contains(&kind)
    }

    /// Check the filter and wavelength settings against each other
    pub fn validate(&self) -> Result<(), PreprocessError> {
        if self.savgol_window == 0 || self.savgol_window % 2 == 0 {
            return Err(PreprocessError::DataProcessing(format!(
                "savgol_window must be a positive odd number, got {}",
                self.savgol_window
            )));
        }
        if self.savgol_window >= self.target_bands {
            return Err(PreprocessError::DataProcessing(format!(
                "savgol_window {} must be smaller than target_bands {}",
                self.savgol_window, self.target_bands
            )));
        }
        if self.savgol_polyorder >= self.savgol_window {
            return Err(PreprocessError::DataProcessing(format!(
                "savgol_polyorder {} must be smaller than savgol_window {}",
                self.savgol_polyorder, self.savgol_window
            )));
        }
        if !self.min_wavelength.is_finite()
            || !self.max_wavelength.is_finite()
            || self.min_wavelength > self.max_wavelength
        {
            return Err(PreprocessError::DataProcessing(format!(
                "invalid wavelength range [{}, {}]",
                self.min_wavelength, self.max_wavelength
            )));
        }
        if !self.background_threshold.is_finite() {
            return Err(PreprocessError::DataProcessing(format!(
                "background_threshold must be finite, got {}",
                self.background_threshold
            )));
        }
        Ok(())
    }

    /// Build a config from individually named form fields
    ///
    /// Absent fields keep their defaults and unrecognized fields are ignored.
    /// `extraction_methods` is a comma-separated list of feature identifiers.
    pub fn from_form_fields(fields: &HashMap<String, String>) -> Result<Self, PreprocessError> {
        let mut config = Self::default();

        for (name, raw) in fields {
            let value = raw.trim();
            match name.as_str() {
                "extraction_methods" => {
                    config.extraction_methods = value
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(FeatureKind::from_str)
                        .collect::<Result<Vec<_>, _>>()?;
                }
                "target_bands" => config.target_bands = parse_field(name, value)?,
                "interpolation" => config.interpolation = value.parse()?,
                "min_wavelength" => config.min_wavelength = parse_field(name, value)?,
                "max_wavelength" => config.max_wavelength = parse_field(name, value)?,
                "remove_background" => config.remove_background = parse_flag(name, value)?,
                "background_threshold" => config.background_threshold = parse_field(name, value)?,
                "savgol_window" => config.savgol_window = parse_field(name, value)?,
                "savgol_polyorder" => config.savgol_polyorder = parse_field(name, value)?,
                "extra_features" => config.extra_features = parse_flag(name, value)?,
                _ => {}
            }
        }

        Ok(config)
    }
}

fn parse_field<T: FromStr>(name: &str, value: &str) -> Result<T, PreprocessError> {
    value.parse().map_err(|_| {
        PreprocessError::InvalidInput(format!(
            "field '{}' has invalid value '{}'",
            name, value
        ))
    })
}

fn parse_flag(name: &str, value: &str) -> Result<bool, PreprocessError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(PreprocessError::InvalidInput(format!(
            "field '{}' has invalid boolean '{}'",
            name, value
        ))),
    }
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app_name: String,
    pub log_level: String,
    pub extraction: ExtractionConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "Data Preprocessor".to_string(),
            log_level: "info".to_string(),
            extraction: ExtractionConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings from an optional file, then `PREPROCESSOR__*` variables
    ///
    /// Nested keys use a double underscore, e.g.
    /// `PREPROCESSOR__EXTRACTION__TARGET_BANDS=64`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        builder
            .add_source(
                Environment::with_prefix("PREPROCESSOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
