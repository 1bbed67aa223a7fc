//! Preprocessing Pipeline
//!
//! Sequences resampling, masking, aggregation and the spectral transforms for
//! one cube and assembles the result into a feature row. Each run moves
//! through [`Stage`]s in order and stops at the first failure.

use std::time::Instant;

use feature_table::{assemble, assemble_batch, FeatureKind, FeatureRow, FeatureSet, FeatureTable};
use hypercube::{linspace, Cube, CubeSlicer, CubeSource, SourceGuard, WavelengthMetadata};
use metrics::{counter, histogram};
use ndarray::ArrayView3;
use rayon::prelude::*;
use spectral_features::{
    average_spectrum, background_mask, continuum_remove, resample, savgol_derivative, snv,
};
use tracing::{debug, info, warn};

use crate::config::ExtractionConfig;
use crate::error::PreprocessError;

/// Pipeline stage reached by a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Loaded,
    Resampled,
    Masked,
    Aggregated,
    FeaturesExtracted,
    Assembled,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Loaded => "loaded",
            Stage::Resampled => "resampled",
            Stage::Masked => "masked",
            Stage::Aggregated => "aggregated",
            Stage::FeaturesExtracted => "features_extracted",
            Stage::Assembled => "assembled",
        }
    }
}

/// Turns cubes into feature rows under one configuration
#[derive(Debug, Clone)]
pub struct Preprocessor {
    config: ExtractionConfig,
}

impl Preprocessor {
    /// Create a new preprocessor, rejecting inconsistent configuration
    pub fn new(config: ExtractionConfig) -> Result<Self, PreprocessError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Load a cube from `source` and extract its feature row
    ///
    /// The source is released before returning, whether or not the run
    /// succeeded.
    pub fn run<S: CubeSource + ?Sized>(
        &self,
        source: &mut S,
    ) -> Result<FeatureRow, PreprocessError> {
        self.observe("run", |stage| {
            let mut source = SourceGuard::new(source);
            debug!(
                rows = source.rows(),
                cols = source.cols(),
                bands = source.bands(),
                dtype = ?source.dtype(),
                "Loading cube"
            );
            let cube = source.load()?;
            self.extract_row(cube.view(), source.wavelength_metadata(), stage)
        })
    }

    /// Extract the feature row of an already-loaded cube
    pub fn extract(
        &self,
        cube: &Cube,
        metadata: Option<&WavelengthMetadata>,
    ) -> Result<FeatureRow, PreprocessError> {
        self.observe("extract", |stage| self.extract_row(cube.view(), metadata, stage))
    }

    /// Slice `cube` into detected samples and extract one row per sample
    pub fn extract_batch(
        &self,
        cube: &Cube,
        metadata: Option<&WavelengthMetadata>,
        slicer: &CubeSlicer,
    ) -> Result<FeatureTable, PreprocessError> {
        self.observe("extract_batch", |stage| {
            let samples = slicer.slice(cube.view())?;
            if samples.is_empty() {
                return Err(PreprocessError::DataProcessing(
                    "object detection found no samples in the cube".to_string(),
                ));
            }

            // samples are independent; a failure reports the stage its sample reached
            let feature_sets = samples
                .par_iter()
                .map(|sample| {
                    let mut reached = None;
                    self.feature_set(sample.view(), metadata, &mut reached)
                        .map_err(|e| (e, reached))
                })
                .collect::<Result<Vec<_>, _>>();
            let feature_sets = match feature_sets {
                Ok(sets) => sets,
                Err((e, reached)) => {
                    *stage = reached;
                    return Err(e);
                }
            };
            *stage = Some(Stage::FeaturesExtracted);

            let table = assemble_batch(
                &feature_sets,
                self.config.target_bands,
                self.config.extra_features,
            )?;
            *stage = Some(Stage::Assembled);
            Ok(table)
        })
    }

    fn extract_row(
        &self,
        cube: ArrayView3<'_, f32>,
        metadata: Option<&WavelengthMetadata>,
        stage: &mut Option<Stage>,
    ) -> Result<FeatureRow, PreprocessError> {
        let features = self.feature_set(cube, metadata, stage)?;
        let row = assemble(&features, self.config.target_bands, self.config.extra_features)?;
        *stage = Some(Stage::Assembled);
        Ok(row)
    }

    fn feature_set(
        &self,
        cube: ArrayView3<'_, f32>,
        metadata: Option<&WavelengthMetadata>,
        stage: &mut Option<Stage>,
    ) -> Result<FeatureSet, PreprocessError> {
        let config = &self.config;
        *stage = Some(Stage::Loaded);

        let (rows, cols, bands) = cube.dim();
        let wavelengths = self.wavelengths(bands, metadata)?;

        let (resampled, target_wavelengths) =
            resample(cube, &wavelengths, config.target_bands, config.interpolation)?;
        if resampled.dim().2 != config.target_bands {
            return Err(PreprocessError::DataProcessing(format!(
                "resampling produced {} bands, expected {}",
                resampled.dim().2,
                config.target_bands
            )));
        }
        *stage = Some(Stage::Resampled);
        debug!(rows, cols, bands, target_bands = config.target_bands, "Cube resampled");

        let mask = if config.remove_background {
            let mask = background_mask(resampled.view().into_dyn(), config.background_threshold)?;
            let foreground = mask.iter().filter(|&&keep| keep).count();
            if foreground == 0 {
                return Err(PreprocessError::BackgroundRemoval(format!(
                    "no foreground pixels above threshold {}",
                    config.background_threshold
                )));
            }
            debug!(foreground, total = mask.len(), "Background removed");
            Some(mask)
        } else {
            None
        };
        *stage = Some(Stage::Masked);

        let average = average_spectrum(
            resampled.view().into_dyn(),
            mask.as_ref().map(|m| m.view()),
        )?;
        *stage = Some(Stage::Aggregated);

        let mut features = FeatureSet::new();
        if config.requests(FeatureKind::AvgSpectrum) {
            features.insert(FeatureKind::AvgSpectrum, average.clone());
        }
        if config.requests(FeatureKind::Deriv1AvgSpectrum) {
            features.insert(FeatureKind::Deriv1AvgSpectrum, self.derivative(&average)?);
        }

        let continuum_removed = continuum_remove(&average, &target_wavelengths);
        if config.requests(FeatureKind::ContinuumRemovedAvgSpectrum) {
            features.insert(FeatureKind::ContinuumRemovedAvgSpectrum, continuum_removed.clone());
        }
        if config.requests(FeatureKind::SnvAvgSpectrum) {
            features.insert(FeatureKind::SnvAvgSpectrum, snv(&average));
        }
        if config.requests(FeatureKind::Deriv1ContinuumRemoved) {
            features.insert(
                FeatureKind::Deriv1ContinuumRemoved,
                self.derivative(&continuum_removed)?,
            );
        }

        if features.is_empty() {
            return Err(PreprocessError::DataProcessing(
                "no extraction methods were requested".to_string(),
            ));
        }
        *stage = Some(Stage::FeaturesExtracted);
        debug!(kinds = ?features.kinds(), "Features extracted");

        Ok(features)
    }

    /// Header wavelengths when present, otherwise the configured range
    fn wavelengths(
        &self,
        bands: usize,
        metadata: Option<&WavelengthMetadata>,
    ) -> Result<Vec<f64>, PreprocessError> {
        match metadata.filter(|m| !m.is_empty()) {
            Some(metadata) => Ok(metadata.parse(bands)?),
            None => {
                info!(
                    bands,
                    min = self.config.min_wavelength,
                    max = self.config.max_wavelength,
                    "No wavelength metadata, using evenly spaced wavelengths"
                );
                Ok(linspace(self.config.min_wavelength, self.config.max_wavelength, bands))
            }
        }
    }

    fn derivative(&self, spectrum: &[f64]) -> Result<Vec<f64>, PreprocessError> {
        if spectrum.len() < self.config.savgol_window {
            return Ok(vec![0.0; spectrum.len()]);
        }
        Ok(savgol_derivative(
            spectrum,
            self.config.savgol_window,
            self.config.savgol_polyorder,
        )?)
    }

    /// Time a run, count its outcome and log where it stopped
    fn observe<T>(
        &self,
        operation: &'static str,
        run: impl FnOnce(&mut Option<Stage>) -> Result<T, PreprocessError>,
    ) -> Result<T, PreprocessError> {
        let start = Instant::now();
        let mut stage = None;
        let result = run(&mut stage);
        let elapsed = start.elapsed();

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind().as_str(),
        };
        counter!("preprocessor_runs_total", "outcome" => outcome).increment(1);
        histogram!("preprocessor_run_seconds").record(elapsed.as_secs_f64());

        match &result {
            Ok(_) => info!(
                operation,
                elapsed_ms = elapsed.as_millis() as u64,
                "Preprocessing complete"
            ),
            Err(e) => warn!(
                operation,
                stage = stage.map_or("none", |s| s.as_str()),
                kind = e.kind().as_str(),
                "Preprocessing failed: {}",
                e
            ),
        }

        result
    }
}

/// One-shot extraction with a throwaway [`Preprocessor`]
pub fn extract_features(
    cube: &Cube,
    metadata: Option<&WavelengthMetadata>,
    config: &ExtractionConfig,
) -> Result<FeatureRow, PreprocessError> {
    Preprocessor::new(config.clone())?.extract(cube, metadata)
}
