use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{MockError, Result};

use super::family::{MetricFamily, MetricSeries};

/// All families of one process, keyed by name.
///
/// Built once at startup, then shared behind `Arc`. There is no lock here:
/// the only mutable state is inside each series' atomic value cell.
#[derive(Debug, Default)]
pub struct Registry {
    families: BTreeMap<String, MetricFamily>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, family: MetricFamily) -> Result<()> {
        if self.families.contains_key(family.name()) {
            return Err(MockError::DuplicateFamily(family.name().to_string()));
        }
        self.families.insert(family.name().to_string(), family);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&MetricFamily> {
        self.families.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.families.contains_key(name)
    }

    /// Families in name order.
    pub fn families(&self) -> impl Iterator<Item = &MetricFamily> {
        self.families.values()
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    pub fn series_count(&self) -> usize {
        self.families.values().map(|f| f.series().len()).sum()
    }

    /// Counter and gauge series, the ones the perturbation engine drives.
    pub fn live_series(&self) -> Vec<Arc<MetricSeries>> {
        self.families
            .values()
            .flat_map(|f| f.series().iter())
            .filter(|s| s.value().is_live())
            .cloned()
            .collect()
    }
}
