//! Exposition-format snapshot loading.
//!
//! Input is Prometheus text format 0.0.4, with the OpenMetrics additions a
//! scraped snapshot commonly carries (`# EOF`, `_total` counter samples,
//! `_created` samples, float timestamps, exemplars). Timestamps and
//! exemplars are dropped.
//! - `decode` reads one line through `prometheus-parse`,
//! - `parser` groups samples into families and builds the `Registry`.

mod decode;
mod parser;

use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{MockError, Result};
use crate::model::Registry;

pub use parser::parse_snapshot;

/// Why a family was left out of the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    /// Type declared, no series found.
    EmptyFamily,
    /// Type this mock does not model (including untyped samples).
    UnsupportedType(String),
}

/// Recoverable problem found while parsing. The family is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    pub family: String,
    pub kind: WarningKind,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            WarningKind::EmptyFamily => write!(f, "no metric values for {}", self.family),
            WarningKind::UnsupportedType(token) => {
                write!(f, "unsupported metric type {token:?} for {}", self.family)
            }
        }
    }
}

/// Parser output: the registry plus every family that was skipped.
#[derive(Debug)]
pub struct Snapshot {
    pub registry: Registry,
    pub warnings: Vec<ParseWarning>,
}

/// Read `path` fully and parse it.
pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Snapshot> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| MockError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_snapshot(&text)
}
