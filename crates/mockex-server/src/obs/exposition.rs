use std::sync::Arc;

use mockex_core::error::{MockError, Result};
use mockex_core::model::{MetricFamily, MetricKind, MetricSeries, Registry, SeriesValue};
use prometheus::proto;
use prometheus::{Encoder, TextEncoder};

use super::metrics::ExporterMetrics;

/// Renders the shared registry. Safe to call from any number of requests at
/// once: the snapshot registry is only read, never locked.
pub struct Exposition {
    registry: Arc<Registry>,
    aux: prometheus::Registry,
    encoder: TextEncoder,
}

impl Exposition {
    pub fn new(
        registry: Arc<Registry>,
        metrics: &ExporterMetrics,
        process_metrics: bool,
    ) -> Result<Self> {
        let aux = prometheus::Registry::new();
        metrics
            .register(&aux)
            .map_err(|e| MockError::Internal(format!("register exporter metrics: {e}")))?;
        if process_metrics {
            register_process_collector(&aux)?;
        }

        Ok(Self {
            registry,
            aux,
            encoder: TextEncoder::new(),
        })
    }

    /// Snapshot families followed by the auxiliary ones. An auxiliary
    /// family that shares a name with a snapshot family is dropped.
    pub fn gather(&self) -> Vec<proto::MetricFamily> {
        let mut families: Vec<proto::MetricFamily> =
            self.registry.families().map(family_proto).collect();

        for mf in self.aux.gather() {
            if mf.get_metric().is_empty() {
                continue;
            }
            if self.registry.contains(mf.get_name()) {
                tracing::debug!(family = %mf.get_name(), "auxiliary family shadowed by snapshot");
                continue;
            }
            families.push(mf);
        }
        families
    }

    pub fn render(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.encoder
            .encode(&self.gather(), &mut buf)
            .map_err(|e| MockError::Render(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| MockError::Render(e.to_string()))
    }

    /// Always text format 0.0.4; the encoder has no OpenMetrics output.
    pub fn content_type(&self) -> &str {
        self.encoder.format_type()
    }
}

#[cfg(target_os = "linux")]
fn register_process_collector(aux: &prometheus::Registry) -> Result<()> {
    let collector = prometheus::process_collector::ProcessCollector::for_self();
    aux.register(Box::new(collector))
        .map_err(|e| MockError::Internal(format!("register process collector: {e}")))
}

#[cfg(not(target_os = "linux"))]
fn register_process_collector(_aux: &prometheus::Registry) -> Result<()> {
    tracing::debug!("process metrics are only collected on linux");
    Ok(())
}

fn family_proto(family: &MetricFamily) -> proto::MetricFamily {
    let mut mf = proto::MetricFamily::default();
    mf.set_name(family.name().to_string());
    mf.set_help(family.help().to_string());
    mf.set_field_type(match family.kind() {
        MetricKind::Counter => proto::MetricType::COUNTER,
        MetricKind::Gauge => proto::MetricType::GAUGE,
        MetricKind::Summary => proto::MetricType::SUMMARY,
        MetricKind::Histogram => proto::MetricType::HISTOGRAM,
    });
    let metrics: Vec<proto::Metric> = family.series().iter().map(|s| series_proto(s)).collect();
    mf.set_metric(metrics.into());
    mf
}

fn series_proto(series: &MetricSeries) -> proto::Metric {
    let mut m = proto::Metric::default();
    let labels: Vec<proto::LabelPair> = series
        .labels()
        .iter()
        .map(|(k, v)| {
            let mut lp = proto::LabelPair::default();
            lp.set_name(k.to_string());
            lp.set_value(v.to_string());
            lp
        })
        .collect();
    m.set_label(labels.into());

    match series.value() {
        SeriesValue::Counter(c) => {
            let mut pc = proto::Counter::default();
            pc.set_value(c.get());
            m.set_counter(pc);
        }
        SeriesValue::Gauge(g) => {
            let mut pg = proto::Gauge::default();
            pg.set_value(g.get());
            m.set_gauge(pg);
        }
        SeriesValue::Summary(s) => {
            let quantiles: Vec<proto::Quantile> = s
                .quantiles
                .iter()
                .map(|&(q, v)| {
                    let mut pq = proto::Quantile::default();
                    pq.set_quantile(q);
                    pq.set_value(v);
                    pq
                })
                .collect();
            let mut ps = proto::Summary::default();
            ps.set_sample_sum(s.sum);
            ps.set_sample_count(as_count(s.count));
            ps.set_quantile(quantiles.into());
            m.set_summary(ps);
        }
        SeriesValue::Histogram(h) => {
            let buckets: Vec<proto::Bucket> = h
                .buckets
                .iter()
                .map(|&(le, count)| {
                    let mut pb = proto::Bucket::default();
                    pb.set_upper_bound(le);
                    pb.set_cumulative_count(as_count(count));
                    pb
                })
                .collect();
            let mut ph = proto::Histogram::default();
            ph.set_sample_sum(h.sum);
            ph.set_sample_count(as_count(h.count));
            ph.set_bucket(buckets.into());
            m.set_histogram(ph);
        }
    }
    m
}

/// Snapshot counts are parsed as floats; the wire model wants integers.
fn as_count(v: f64) -> u64 {
    if v.is_finite() && v > 0.0 {
        v.round() as u64
    } else {
        0
    }
}
