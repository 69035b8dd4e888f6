//! Update rule.
//!
//! `δ = z * chaos * base`, `z ~ N(0, 1)`.
//! Gauges are set to `baseline + δ`, so they swing around the snapshot value.
//! Counters use `base = 1.0` and grow by `max(0, δ)`.

use mockex_core::model::{MetricSeries, SeriesValue};
use rand::Rng;
use rand_distr::StandardNormal;

/// Base magnitude for counter increments.
pub const COUNTER_BASE: f64 = 1.0;

/// Draw a zero-mean normal perturbation with standard deviation `chaos * base`.
pub fn draw<R: Rng + ?Sized>(rng: &mut R, base: f64, chaos: f64) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    z * chaos * base
}

/// Apply one tick to `series`. Returns whether its value changed.
pub fn tick<R: Rng + ?Sized>(series: &MetricSeries, chaos: f64, rng: &mut R) -> bool {
    match series.value() {
        SeriesValue::Counter(c) => c.inc_by(draw(rng, COUNTER_BASE, chaos).max(0.0)),
        SeriesValue::Gauge(g) => {
            let next = g.baseline() + draw(rng, g.baseline(), chaos);
            if !next.is_finite() {
                return false;
            }
            g.set(next);
            true
        }
        SeriesValue::Summary(_) | SeriesValue::Histogram(_) => false,
    }
}
