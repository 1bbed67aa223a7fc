//! Spectral Preprocessor
//!
//! Converts hyperspectral cubes into fixed-width feature rows: resampling,
//! optional background removal, the averaged spectrum and its transforms,
//! then CSV-ready assembly.

mod config;
mod error;
mod pipeline;

pub use config::{ExtractionConfig, Settings};
pub use error::{ErrorKind, PreprocessError};
pub use pipeline::{extract_features, Preprocessor, Stage};

use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Initialize logging at `level` (`error`, `warn`, `info`, `debug`, `trace`)
///
/// Log lines go to stderr so CSV written to stdout stays clean.
pub fn init_logging(level: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let level = Level::from_str(level.trim())?;
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
