//! Spectral Preprocessor - Command Line Entry Point

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::Parser;
use feature_table::FeatureTable;
use hypercube::JsonCubeFile;
use preprocessor::{init_logging, Preprocessor, Settings};
use tracing::info;

/// Extract a spectral feature row from a hyperspectral cube
#[derive(Parser, Debug)]
#[command(name = "spectral-preprocess", version, about)]
struct Cli {
    /// JSON cube document
    #[arg(short, long)]
    input: PathBuf,

    /// Settings file (TOML, JSON or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output CSV path, `-` for stdout
    #[arg(short, long, default_value = "-")]
    out: String,

    /// Log level, overrides the settings file
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    init_logging(cli.log_level.as_deref().unwrap_or(&settings.log_level))
        .map_err(|e| anyhow!(e))?;

    info!("=== {} v{} ===", settings.app_name, env!("CARGO_PKG_VERSION"));

    let preprocessor = Preprocessor::new(settings.extraction)?;
    let mut source = JsonCubeFile::open(&cli.input)
        .with_context(|| format!("opening cube {}", cli.input.display()))?;

    let row = preprocessor.run(&mut source)?;
    let table = FeatureTable::from_row(row);

    if cli.out == "-" {
        table.write_csv(io::stdout().lock())?;
    } else {
        let file = File::create(&cli.out).with_context(|| format!("creating {}", cli.out))?;
        table.write_csv(BufWriter::new(file))?;
        info!("Wrote {} feature columns to {}", table.columns.len(), cli.out);
    }

    Ok(())
}
