use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{MockError, Result};

use super::value::SeriesValue;

/// Family type. Fixed once parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Counter,
    Gauge,
    Summary,
    Histogram,
}

impl MetricKind {
    /// Token used on `# TYPE` lines.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Summary => "summary",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label assignment of one series, kept sorted by label name so equal
/// assignments compare equal regardless of input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelSet(Vec<(String, String)>);

impl LabelSet {
    pub fn new(mut pairs: Vec<(String, String)>) -> Self {
        pairs.sort();
        Self(pairs)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{k}={v:?}")?;
        }
        f.write_str("}")
    }
}

/// One label-set-distinguished measurement.
#[derive(Debug)]
pub struct MetricSeries {
    labels: LabelSet,
    value: SeriesValue,
}

impl MetricSeries {
    pub fn new(labels: LabelSet, value: SeriesValue) -> Self {
        Self { labels, value }
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn value(&self) -> &SeriesValue {
        &self.value
    }
}

/// Named group of series sharing help text and type.
#[derive(Debug)]
pub struct MetricFamily {
    name: String,
    help: String,
    kind: MetricKind,
    series: Vec<Arc<MetricSeries>>,
}

impl MetricFamily {
    /// Build a family. Fails when two series share a label set.
    pub fn new(
        name: impl Into<String>,
        help: impl Into<String>,
        kind: MetricKind,
        series: Vec<MetricSeries>,
    ) -> Result<Self> {
        let name = name.into();
        let mut seen = HashSet::with_capacity(series.len());
        for s in &series {
            if !seen.insert(s.labels()) {
                return Err(MockError::DuplicateSeries {
                    family: name,
                    labels: s.labels().to_string(),
                });
            }
        }
        drop(seen);

        Ok(Self {
            name,
            help: help.into(),
            kind,
            series: series.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn series(&self) -> &[Arc<MetricSeries>] {
        &self.series
    }
}
