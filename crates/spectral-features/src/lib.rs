//! Spectral Feature Engine
//!
//! Numerical stages of the preprocessing pipeline, leaf-first:
//! - [`background_mask`] - intensity-threshold foreground selection
//! - [`resample`] - per-pixel band resampling to a fixed band count
//! - [`average_spectrum`] - masked mean spectrum
//! - [`continuum_remove`] - rubber-band continuum normalization
//! - [`savgol_derivative`] - smoothed first derivative
//! - [`snv`] - standard normal variate

mod aggregate;
mod continuum;
mod derivative;
mod error;
mod masking;
mod resample;
mod statistics;

pub use aggregate::average_spectrum;
pub use continuum::{analyze_continuum, continuum_remove, ContinuumOutcome, DegenerateReason};
pub use derivative::savgol_derivative;
pub use error::SpectralError;
pub use masking::{background_mask, DEFAULT_BACKGROUND_THRESHOLD};
pub use resample::{resample, InterpolationKind};
pub use statistics::{snv, SpectrumStatistics};
