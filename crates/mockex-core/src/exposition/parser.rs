//! Family assembly: turns lexed lines into a `Registry`.

use std::collections::HashMap;

use crate::error::{MockError, Result};
use crate::model::{
    CounterValue, GaugeValue, HistogramSnapshot, LabelSet, MetricFamily, MetricKind, MetricSeries,
    Registry, SeriesValue, SummarySnapshot,
};

use super::decode::{decode_line, parse_float, Line, RawSample};
use super::{ParseWarning, Snapshot, WarningKind};

/// Declared family type.
#[derive(Debug, Clone)]
enum TypeDecl {
    Supported(MetricKind),
    /// A valid exposition type this mock does not reproduce.
    Unmodeled(String),
}

/// `None` means the token is not an exposition type at all.
fn classify_type(token: &str) -> Option<TypeDecl> {
    let decl = match token {
        "counter" => TypeDecl::Supported(MetricKind::Counter),
        "gauge" => TypeDecl::Supported(MetricKind::Gauge),
        "summary" => TypeDecl::Supported(MetricKind::Summary),
        "histogram" => TypeDecl::Supported(MetricKind::Histogram),
        "untyped" | "unknown" | "gaugehistogram" | "stateset" | "info" => {
            TypeDecl::Unmodeled(token.to_string())
        }
        _ => return None,
    };
    Some(decl)
}

/// What a sample line contributes to its series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Value,
    Quantile,
    Bucket,
    Sum,
    Count,
    /// Histogram sample without a recognised suffix.
    Bare,
    /// Accepted and dropped (`_created`, unmodeled families).
    Ignored,
}

const SUFFIXES: [&str; 5] = ["_bucket", "_sum", "_count", "_total", "_created"];

fn suffix_role(decl: &TypeDecl, suffix: &str) -> Option<Role> {
    let kind = match decl {
        TypeDecl::Unmodeled(_) => return Some(Role::Ignored),
        TypeDecl::Supported(kind) => *kind,
    };
    match (kind, suffix) {
        (MetricKind::Histogram, "_bucket") => Some(Role::Bucket),
        (MetricKind::Histogram | MetricKind::Summary, "_sum") => Some(Role::Sum),
        (MetricKind::Histogram | MetricKind::Summary, "_count") => Some(Role::Count),
        (MetricKind::Counter, "_total") => Some(Role::Value),
        (MetricKind::Counter | MetricKind::Summary | MetricKind::Histogram, "_created") => {
            Some(Role::Ignored)
        }
        _ => None,
    }
}

#[derive(Debug, Default)]
struct SeriesBuilder {
    labels: LabelSet,
    value: Option<f64>,
    sum: Option<f64>,
    count: Option<f64>,
    quantiles: Vec<(f64, f64)>,
    buckets: Vec<(f64, f64)>,
    inf_bucket: Option<f64>,
}

impl SeriesBuilder {
    fn build(self, kind: MetricKind, family: &str) -> Result<MetricSeries> {
        let value = match kind {
            MetricKind::Counter => {
                let v = self.required_value(family)?;
                if v.is_nan() || v < 0.0 {
                    return Err(MockError::InvalidSample {
                        family: family.to_string(),
                        reason: format!("counter {} has value {v}", self.labels),
                    });
                }
                SeriesValue::Counter(CounterValue::new(v))
            }
            MetricKind::Gauge => SeriesValue::Gauge(GaugeValue::new(self.required_value(family)?)),
            MetricKind::Summary => {
                let mut quantiles = self.quantiles;
                quantiles.sort_by(|a, b| a.0.total_cmp(&b.0));
                SeriesValue::Summary(SummarySnapshot {
                    sum: self.sum.unwrap_or(0.0),
                    count: self.count.unwrap_or(0.0),
                    quantiles,
                })
            }
            MetricKind::Histogram => {
                let mut buckets = self.buckets;
                buckets.sort_by(|a, b| a.0.total_cmp(&b.0));
                let count = self
                    .count
                    .or(self.inf_bucket)
                    .or_else(|| buckets.last().map(|b| b.1))
                    .unwrap_or(0.0);
                SeriesValue::Histogram(HistogramSnapshot {
                    sum: self.sum.unwrap_or(0.0),
                    count,
                    buckets,
                })
            }
        };
        Ok(MetricSeries::new(self.labels, value))
    }

    fn required_value(&self, family: &str) -> Result<f64> {
        self.value.ok_or_else(|| MockError::InvalidSample {
            family: family.to_string(),
            reason: format!("series {} has no value", self.labels),
        })
    }
}

#[derive(Debug)]
struct FamilyBuilder {
    name: String,
    help: Option<String>,
    decl: Option<TypeDecl>,
    sample_count: usize,
    /// Counter samples were exposed as `<name>_total`.
    total_suffix: bool,
    series: Vec<SeriesBuilder>,
    index: HashMap<LabelSet, usize>,
}

impl FamilyBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            help: None,
            decl: None,
            sample_count: 0,
            total_suffix: false,
            series: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn series_mut(&mut self, labels: LabelSet) -> &mut SeriesBuilder {
        let next = self.series.len();
        let idx = *self.index.entry(labels.clone()).or_insert(next);
        if idx == next {
            self.series.push(SeriesBuilder {
                labels,
                ..SeriesBuilder::default()
            });
        }
        &mut self.series[idx]
    }
}

#[derive(Debug, Default)]
struct Parser {
    families: Vec<FamilyBuilder>,
    index: HashMap<String, usize>,
}

impl Parser {
    fn family_idx(&mut self, name: &str) -> usize {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.families.len();
        self.families.push(FamilyBuilder::new(name));
        self.index.insert(name.to_string(), idx);
        idx
    }

    fn family_mut(&mut self, idx: usize) -> Result<&mut FamilyBuilder> {
        self.families
            .get_mut(idx)
            .ok_or_else(|| MockError::Internal(format!("family index {idx} out of range")))
    }

    fn on_help(&mut self, line: usize, name: &str, text: String) -> Result<()> {
        let idx = self.family_idx(name);
        let fam = self.family_mut(idx)?;
        if fam.help.is_some() {
            return Err(MockError::malformed(line, format!("second HELP line for {name}")));
        }
        fam.help = Some(text);
        Ok(())
    }

    fn on_type(&mut self, line: usize, name: &str, token: &str) -> Result<()> {
        let decl = classify_type(token).ok_or_else(|| MockError::UnsupportedType {
            family: name.to_string(),
            token: token.to_string(),
        })?;
        let idx = self.family_idx(name);
        let fam = self.family_mut(idx)?;
        if fam.decl.is_some() {
            return Err(MockError::malformed(line, format!("second TYPE line for {name}")));
        }
        if fam.sample_count > 0 {
            return Err(MockError::malformed(
                line,
                format!("TYPE line for {name} after its samples"),
            ));
        }
        fam.decl = Some(decl);
        Ok(())
    }

    /// Find the typed family a sample name belongs to.
    fn resolve(&self, name: &str) -> Option<(usize, Role)> {
        let typed = |n: &str| {
            let idx = *self.index.get(n)?;
            let decl = self.families.get(idx)?.decl.as_ref()?;
            Some((idx, decl))
        };

        if let Some((idx, decl)) = typed(name) {
            let role = match decl {
                TypeDecl::Supported(MetricKind::Counter | MetricKind::Gauge) => Role::Value,
                TypeDecl::Supported(MetricKind::Summary) => Role::Quantile,
                TypeDecl::Supported(MetricKind::Histogram) => Role::Bare,
                TypeDecl::Unmodeled(_) => Role::Ignored,
            };
            return Some((idx, role));
        }

        SUFFIXES.iter().find_map(|suffix| {
            let base = name.strip_suffix(suffix)?;
            let (idx, decl) = typed(base)?;
            suffix_role(decl, suffix).map(|role| (idx, role))
        })
    }

    fn on_sample(&mut self, line: usize, sample: RawSample) -> Result<()> {
        let Some((idx, role)) = self.resolve(&sample.name) else {
            // No TYPE line: untyped, counted so it is reported when skipped.
            let idx = self.family_idx(&sample.name);
            self.family_mut(idx)?.sample_count += 1;
            return Ok(());
        };

        let fam = self.family_mut(idx)?;
        fam.sample_count += 1;
        if role == Role::Value && sample.name != fam.name {
            fam.total_suffix = true;
        }

        let mut labels = sample.labels;
        let bound = match role {
            Role::Bare => {
                return Err(MockError::malformed(
                    line,
                    format!("histogram sample {} needs a _bucket, _sum or _count suffix", sample.name),
                ));
            }
            Role::Ignored => return Ok(()),
            Role::Quantile => Some(take_bound(&mut labels, "quantile", line, &sample.name)?),
            Role::Bucket => Some(take_bound(&mut labels, "le", line, &sample.name)?),
            Role::Value | Role::Sum | Role::Count => None,
        };

        let series = fam.series_mut(LabelSet::new(labels));
        let target = format!("{}{}", sample.name, series.labels);
        let dup = |what: &str| MockError::malformed(line, format!("duplicate {what} for {target}"));
        let v = sample.value;

        match (role, bound) {
            (Role::Value, _) => set_once(&mut series.value, v).map_err(|_| dup("value")),
            (Role::Sum, _) => set_once(&mut series.sum, v).map_err(|_| dup("sum")),
            (Role::Count, _) => set_once(&mut series.count, v).map_err(|_| dup("count")),
            (Role::Quantile, Some(q)) => {
                push_unique(&mut series.quantiles, q, v).map_err(|_| dup("quantile"))
            }
            (Role::Bucket, Some(le)) if le == f64::INFINITY => {
                set_once(&mut series.inf_bucket, v).map_err(|_| dup("+Inf bucket"))
            }
            (Role::Bucket, Some(le)) => {
                push_unique(&mut series.buckets, le, v).map_err(|_| dup("bucket"))
            }
            _ => Ok(()),
        }
    }

    fn finish(self) -> Result<Snapshot> {
        let mut registry = Registry::new();
        let mut warnings = Vec::new();

        for fam in self.families {
            let kind = match fam.decl {
                None => {
                    if fam.sample_count > 0 {
                        warnings.push(warning(&fam.name, WarningKind::UnsupportedType("untyped".into())));
                    }
                    continue;
                }
                Some(TypeDecl::Unmodeled(token)) => {
                    warnings.push(warning(&fam.name, WarningKind::UnsupportedType(token)));
                    continue;
                }
                Some(TypeDecl::Supported(kind)) => kind,
            };

            if fam.series.is_empty() {
                warnings.push(warning(&fam.name, WarningKind::EmptyFamily));
                continue;
            }

            let help = fam.help.ok_or_else(|| MockError::MissingMetadata {
                family: fam.name.clone(),
                field: "HELP",
            })?;
            let series = fam
                .series
                .into_iter()
                .map(|s| s.build(kind, &fam.name))
                .collect::<Result<Vec<_>>>()?;
            // Counters keep the sample name scrapers query.
            let name = if kind == MetricKind::Counter && fam.total_suffix {
                format!("{}_total", fam.name)
            } else {
                fam.name
            };
            registry.insert(MetricFamily::new(name, help, kind, series)?)?;
        }

        for w in &warnings {
            tracing::warn!(family = %w.family, reason = %w, "metric family skipped");
        }

        Ok(Snapshot { registry, warnings })
    }
}

fn warning(family: &str, kind: WarningKind) -> ParseWarning {
    ParseWarning {
        family: family.to_string(),
        kind,
    }
}

fn take_bound(labels: &mut Vec<(String, String)>, key: &str, line: usize, name: &str) -> Result<f64> {
    let pos = labels
        .iter()
        .position(|(k, _)| k == key)
        .ok_or_else(|| MockError::malformed(line, format!("{name} sample without {key} label")))?;
    let (_, raw) = labels.remove(pos);
    parse_float(&raw)
        .ok_or_else(|| MockError::malformed(line, format!("invalid {key} value {raw:?} on {name}")))
}

fn set_once(slot: &mut Option<f64>, v: f64) -> std::result::Result<(), ()> {
    if slot.is_some() {
        return Err(());
    }
    *slot = Some(v);
    Ok(())
}

fn push_unique(points: &mut Vec<(f64, f64)>, at: f64, v: f64) -> std::result::Result<(), ()> {
    if points.iter().any(|(p, _)| p.total_cmp(&at).is_eq()) {
        return Err(());
    }
    points.push((at, v));
    Ok(())
}

/// Parse exposition text into a registry.
///
/// Fatal problems (malformed lines, a supported family without HELP, a TYPE
/// token outside the exposition vocabulary, negative counters) return an
/// error. Families that are empty or of a type this mock does not model are
/// skipped and reported in `Snapshot::warnings`.
pub fn parse_snapshot(text: &str) -> Result<Snapshot> {
    let mut parser = Parser::default();

    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        match decode_line(raw).map_err(|reason| MockError::malformed(line, reason))? {
            Line::Blank | Line::Comment => {}
            Line::Eof => break,
            Line::Help { name, text } => parser.on_help(line, &name, text)?,
            Line::Type { name, token } => parser.on_type(line, &name, &token)?,
            Line::Samples(samples) => {
                for sample in samples {
                    parser.on_sample(line, sample)?;
                }
            }
        }
    }

    parser.finish()
}
