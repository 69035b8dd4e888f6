//! Perturbation engine tests. Timed tests run on a paused clock.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use mockex_core::exposition::parse_snapshot;
use mockex_core::model::{Registry, SeriesValue};
use mockex_server::config::{ChaosSection, Schedule};
use mockex_server::obs::ExporterMetrics;
use mockex_server::perturb::{jitter, PerturbationEngine};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tokio_util::sync::CancellationToken;

const MIXED: &str = "\
# HELP http_requests_total Total HTTP requests served.
# TYPE http_requests_total counter
http_requests_total{method=\"GET\"} 100
# HELP queue_depth Items waiting in the work queue.
# TYPE queue_depth gauge
queue_depth 5.2
# HELP rpc_duration_seconds RPC latency.
# TYPE rpc_duration_seconds summary
rpc_duration_seconds{quantile=\"0.5\"} 0.012
rpc_duration_seconds_sum 17.5
rpc_duration_seconds_count 1000
";

const GAUGES: &str = "\
# HELP temperature_celsius Ambient temperature.
# TYPE temperature_celsius gauge
temperature_celsius{room=\"lab\"} 21.5
temperature_celsius{room=\"hall\"} -3.5
";

fn registry(text: &str) -> Registry {
    parse_snapshot(text).unwrap().registry
}

fn chaos(coefficient: f64, schedule: Schedule) -> ChaosSection {
    ChaosSection {
        coefficient,
        interval_ms: 1000,
        schedule,
        seed: Some(42),
    }
}

fn value_of(reg: &Registry, family: &str) -> f64 {
    match reg.get(family).unwrap().series()[0].value() {
        SeriesValue::Counter(c) => c.get(),
        SeriesValue::Gauge(g) => g.get(),
        other => panic!("not scalar: {other:?}"),
    }
}

#[test]
fn counter_tick_never_decreases() {
    let reg = registry(MIXED);
    let series = &reg.get("http_requests_total").unwrap().series()[0];
    let mut rng = SmallRng::seed_from_u64(7);

    let mut prev = 100.0;
    let mut grew = 0;
    for _ in 0..1000 {
        if jitter::tick(series, 2.0, &mut rng) {
            grew += 1;
        }
        let now = value_of(&reg, "http_requests_total");
        assert!(now >= prev, "counter went from {prev} to {now}");
        prev = now;
    }
    assert!(grew > 0);
    assert!(prev > 100.0);
}

#[test]
fn gauge_tick_swings_around_baseline() {
    let reg = registry(MIXED);
    let series = &reg.get("queue_depth").unwrap().series()[0];
    let mut rng = SmallRng::seed_from_u64(7);

    let (mut lo, mut hi) = (f64::MAX, f64::MIN);
    for _ in 0..1000 {
        assert!(jitter::tick(series, 0.5, &mut rng));
        let v = value_of(&reg, "queue_depth");
        assert!(v.is_finite());
        lo = lo.min(v);
        hi = hi.max(v);
    }
    assert!(lo < 5.2 && hi > 5.2, "lo={lo} hi={hi}");

    let SeriesValue::Gauge(g) = series.value() else {
        panic!("gauge expected");
    };
    assert_eq!(g.baseline(), 5.2);
}

#[test]
fn zero_chaos_tick_leaves_values_alone() {
    let reg = registry(MIXED);
    let mut rng = SmallRng::seed_from_u64(7);
    for s in reg.live_series() {
        jitter::tick(&s, 0.0, &mut rng);
    }
    assert_eq!(value_of(&reg, "http_requests_total"), 100.0);
    assert_eq!(value_of(&reg, "queue_depth"), 5.2);
}

#[test]
fn summaries_are_never_touched() {
    let reg = registry(MIXED);
    let series = &reg.get("rpc_duration_seconds").unwrap().series()[0];
    let mut rng = SmallRng::seed_from_u64(7);
    assert!(!jitter::tick(series, 5.0, &mut rng));

    let SeriesValue::Summary(s) = series.value() else {
        panic!("summary expected");
    };
    assert_eq!(s.sum, 17.5);
    assert_eq!(s.count, 1000.0);
}

#[tokio::test(start_paused = true)]
async fn first_update_waits_one_interval() {
    let reg = registry(MIXED);
    let engine = PerturbationEngine::new(&chaos(1.0, Schedule::PerSeries));
    let handle = engine.start(&reg, CancellationToken::new());
    assert_eq!(handle.task_count(), 2);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(value_of(&reg, "queue_depth"), 5.2);
    assert_eq!(value_of(&reg, "http_requests_total"), 100.0);

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_ne!(value_of(&reg, "queue_depth"), 5.2);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn counters_grow_while_running() {
    let reg = registry(MIXED);
    let handle = PerturbationEngine::new(&chaos(1.0, Schedule::PerSeries))
        .start(&reg, CancellationToken::new());

    tokio::time::sleep(Duration::from_millis(500)).await;
    let mut prev = value_of(&reg, "http_requests_total");
    for _ in 0..30 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let now = value_of(&reg, "http_requests_total");
        assert!(now >= prev);
        assert!(now >= 100.0);
        prev = now;
    }
    assert!(prev > 100.0, "30 ticks never moved the counter");
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn every_gauge_tick_is_counted() {
    let metrics = ExporterMetrics::new().unwrap();
    let reg = registry(GAUGES);
    let handle = PerturbationEngine::new(&chaos(0.1, Schedule::PerSeries))
        .with_tick_counter(metrics.perturbation_ticks.clone())
        .start(&reg, CancellationToken::new());
    assert_eq!(handle.task_count(), 2);

    tokio::time::sleep(Duration::from_millis(10_500)).await;
    assert_eq!(metrics.perturbation_ticks.get(), 20);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn consolidated_schedule_uses_one_task() {
    let metrics = ExporterMetrics::new().unwrap();
    let reg = registry(GAUGES);
    let handle = PerturbationEngine::new(&chaos(0.1, Schedule::Consolidated))
        .with_tick_counter(metrics.perturbation_ticks.clone())
        .start(&reg, CancellationToken::new());
    assert_eq!(handle.task_count(), 1);

    tokio::time::sleep(Duration::from_millis(10_500)).await;
    assert_eq!(metrics.perturbation_ticks.get(), 20);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn zero_chaos_spawns_nothing() {
    let reg = registry(MIXED);
    let handle = PerturbationEngine::new(&chaos(0.0, Schedule::PerSeries))
        .start(&reg, CancellationToken::new());
    assert_eq!(handle.task_count(), 0);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(value_of(&reg, "http_requests_total"), 100.0);
    assert_eq!(value_of(&reg, "queue_depth"), 5.2);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn nothing_to_drive_without_live_series() {
    let reg = registry(
        "# HELP d RPC latency.\n# TYPE d summary\nd_sum 1\nd_count 2\n",
    );
    let handle = PerturbationEngine::new(&chaos(1.0, Schedule::PerSeries))
        .start(&reg, CancellationToken::new());
    assert_eq!(handle.task_count(), 0);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn values_freeze_after_shutdown() {
    let reg = registry(MIXED);
    let token = CancellationToken::new();
    let handle = PerturbationEngine::new(&chaos(1.0, Schedule::PerSeries)).start(&reg, token.clone());

    tokio::time::sleep(Duration::from_millis(3_500)).await;
    handle.shutdown().await;
    assert!(token.is_cancelled());

    let gauge = value_of(&reg, "queue_depth");
    let counter = value_of(&reg, "http_requests_total");
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(value_of(&reg, "queue_depth"), gauge);
    assert_eq!(value_of(&reg, "http_requests_total"), counter);
}

#[tokio::test(start_paused = true)]
async fn same_seed_same_trajectory() {
    let a = registry(GAUGES);
    let b = registry(GAUGES);
    let values = |reg: &Registry| -> Vec<f64> {
        reg.live_series()
            .iter()
            .map(|s| match s.value() {
                SeriesValue::Gauge(g) => g.get(),
                _ => unreachable!(),
            })
            .collect()
    };
    let initial = values(&a);

    let engine = PerturbationEngine::new(&chaos(0.3, Schedule::Consolidated));
    let ha = engine.start(&a, CancellationToken::new());
    let hb = engine.start(&b, CancellationToken::new());

    tokio::time::sleep(Duration::from_millis(5_500)).await;
    ha.shutdown().await;
    hb.shutdown().await;

    assert_eq!(values(&a), values(&b));
    assert_ne!(values(&a), initial);
}
