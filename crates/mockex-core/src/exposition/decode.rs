//! Line decoding on top of `prometheus-parse`.
//!
//! `Scrape::parse` is fed one line at a time so every sample keeps its line
//! number and stays ungrouped; grouping into families is the parser's job.
//! The crate drops `# TYPE` lines, so those are read here.

use std::io;

use prometheus_parse::{Scrape, Value};

/// One classified input line.
#[derive(Debug)]
pub(super) enum Line {
    Blank,
    Comment,
    Eof,
    Help { name: String, text: String },
    Type { name: String, token: String },
    Samples(Vec<RawSample>),
}

/// Sample before it is attached to a family. Histogram and summary points
/// carry their `le` / `quantile` bound as an ordinary label.
#[derive(Debug)]
pub(super) struct RawSample {
    pub name: String,
    pub labels: Vec<(String, String)>,
    pub value: f64,
}

/// Classify one line.
pub(super) fn decode_line(line: &str) -> Result<Line, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Line::Blank);
    }

    if let Some(directive) = line.strip_prefix('#') {
        let mut words = directive.split_whitespace();
        return match words.next() {
            Some("HELP") => decode_help(line, words.next()),
            Some("TYPE") => match (words.next(), words.next(), words.next()) {
                (Some(name), Some(token), None) if is_valid_metric_name(name) => Ok(Line::Type {
                    name: name.to_string(),
                    token: token.to_string(),
                }),
                _ => Err("TYPE line needs a metric name and one type".into()),
            },
            Some("EOF") => Ok(Line::Eof),
            _ => Ok(Line::Comment),
        };
    }

    let samples: Vec<RawSample> = scrape(line)?
        .samples
        .into_iter()
        .flat_map(flatten)
        .collect();
    if samples.is_empty() {
        return Err(format!("unparsable sample line {line:?}"));
    }
    Ok(Line::Samples(samples))
}

fn scrape(line: &str) -> Result<Scrape, String> {
    Scrape::parse(std::iter::once(Ok::<_, io::Error>(line.to_string())))
        .map_err(|e| e.to_string())
}

fn decode_help(line: &str, name: Option<&str>) -> Result<Line, String> {
    let name = name
        .filter(|n| is_valid_metric_name(n))
        .ok_or_else(|| "HELP line needs a metric name".to_string())?;
    // The crate skips a HELP line with no text; that is an empty help.
    let text = scrape(line)?.docs.remove(name).unwrap_or_default();
    Ok(Line::Help {
        name: name.to_string(),
        text: unescape(&text),
    })
}

/// Turn a decoded sample back into flat points.
fn flatten(sample: prometheus_parse::Sample) -> Vec<RawSample> {
    let labels: Vec<(String, String)> = sample
        .labels
        .iter()
        .map(|(k, v)| (k.clone(), unescape(v)))
        .collect();
    let with_bound = |key: &str, bound: f64, value: f64| {
        let mut labels = labels.clone();
        labels.retain(|(k, _)| k != key);
        labels.push((key.to_string(), format_bound(bound)));
        RawSample {
            name: sample.metric.clone(),
            labels,
            value,
        }
    };

    match &sample.value {
        Value::Counter(v) | Value::Gauge(v) | Value::Untyped(v) => vec![RawSample {
            name: sample.metric.clone(),
            labels: labels.clone(),
            value: *v,
        }],
        Value::Histogram(counts) => counts
            .iter()
            .map(|c| with_bound("le", c.less_than, c.count))
            .collect(),
        Value::Summary(counts) => counts
            .iter()
            .map(|c| with_bound("quantile", c.quantile, c.count))
            .collect(),
    }
}

fn format_bound(v: f64) -> String {
    if v == f64::INFINITY {
        "+Inf".into()
    } else {
        v.to_string()
    }
}

/// Undo the text-format escapes `\\`, `\"` and `\n`. Anything else is kept.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('n') => out.push('\n'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == ':')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// Parse a bound label value (`le`, `quantile`), accepting the exposition
/// spellings of the special floats.
pub(super) fn parse_float(token: &str) -> Option<f64> {
    match token {
        "+Inf" | "Inf" | "+inf" | "inf" => Some(f64::INFINITY),
        "-Inf" | "-inf" => Some(f64::NEG_INFINITY),
        "NaN" | "nan" => Some(f64::NAN),
        other => other.parse::<f64>().ok(),
    }
}
