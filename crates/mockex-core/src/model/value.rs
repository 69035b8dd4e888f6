//! Series value payloads.
//!
//! Floating point cells are stored as raw bits in an `AtomicU64`, so a reader
//! always observes either the value before or after a write, never a mix.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free f64 cell.
#[derive(Debug, Default)]
pub struct AtomicF64 {
    bits: AtomicU64,
}

impl AtomicF64 {
    pub fn new(v: f64) -> Self {
        Self {
            bits: AtomicU64::new(v.to_bits()),
        }
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn set(&self, v: f64) {
        self.bits.store(v.to_bits(), Ordering::Relaxed);
    }

    /// Add `delta` with a CAS loop. Returns the new value.
    pub fn add(&self, delta: f64) -> f64 {
        let mut current = self.bits.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + delta).to_bits();
            match self
                .bits
                .compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return f64::from_bits(next),
                Err(observed) => current = observed,
            }
        }
    }
}

/// Monotonic counter value.
#[derive(Debug)]
pub struct CounterValue {
    cell: AtomicF64,
}

impl CounterValue {
    pub fn new(initial: f64) -> Self {
        Self {
            cell: AtomicF64::new(initial),
        }
    }

    pub fn get(&self) -> f64 {
        self.cell.get()
    }

    /// Increment by `delta`. Negative, zero and non-finite deltas are ignored
    /// so the counter never decreases. Returns whether the value changed.
    pub fn inc_by(&self, delta: f64) -> bool {
        if !(delta.is_finite() && delta > 0.0) {
            return false;
        }
        self.cell.add(delta);
        true
    }
}

/// Gauge value anchored to the snapshot baseline.
#[derive(Debug)]
pub struct GaugeValue {
    baseline: f64,
    cell: AtomicF64,
}

impl GaugeValue {
    pub fn new(baseline: f64) -> Self {
        Self {
            baseline,
            cell: AtomicF64::new(baseline),
        }
    }

    /// Value read from the snapshot file.
    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    pub fn get(&self) -> f64 {
        self.cell.get()
    }

    pub fn set(&self, v: f64) {
        self.cell.set(v);
    }
}

/// Summary as read from the snapshot. Never mutated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SummarySnapshot {
    pub sum: f64,
    pub count: f64,
    /// `(quantile, value)`, sorted by quantile.
    pub quantiles: Vec<(f64, f64)>,
}

/// Histogram as read from the snapshot. Never mutated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistogramSnapshot {
    pub sum: f64,
    pub count: f64,
    /// `(upper_bound, cumulative_count)` for finite bounds, sorted by bound.
    /// The `+Inf` bucket is implied by `count`.
    pub buckets: Vec<(f64, f64)>,
}

/// Value payload, one variant per family kind.
#[derive(Debug)]
pub enum SeriesValue {
    Counter(CounterValue),
    Gauge(GaugeValue),
    Summary(SummarySnapshot),
    Histogram(HistogramSnapshot),
}

impl SeriesValue {
    /// Whether the perturbation engine should drive this value.
    pub fn is_live(&self) -> bool {
        matches!(self, SeriesValue::Counter(_) | SeriesValue::Gauge(_))
    }
}
