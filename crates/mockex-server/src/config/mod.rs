//! Exporter config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use mockex_core::error::{MockError, Result};

pub use schema::{ChaosSection, ExporterConfig, Schedule, WebSection};

pub fn load_from_file(path: impl AsRef<Path>) -> Result<ExporterConfig> {
    let cfg = read_file(path)?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_from_str(s: &str) -> Result<ExporterConfig> {
    let cfg = parse_str(s)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Read and parse without validating, for callers that still merge
/// overrides on top (the CLI).
pub fn read_file(path: impl AsRef<Path>) -> Result<ExporterConfig> {
    let path = path.as_ref();
    let s = fs::read_to_string(path).map_err(|source| MockError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_str(&s)
}

fn parse_str(s: &str) -> Result<ExporterConfig> {
    serde_yaml::from_str(s).map_err(|e| MockError::Config(format!("invalid yaml: {e}")))
}
