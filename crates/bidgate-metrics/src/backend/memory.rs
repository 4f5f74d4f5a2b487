// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//! In-process accumulator backend
//!
//! Backs the push-style reporter: series live in memory and are read out
//! as a [`Snapshot`] on every push interval. Also the backend used by tests,
//! since every value can be read back directly.
//!
//! Uses `Arc<RwLock<..>>` for the series index. The index is only locked at
//! startup and when reading snapshots; recording goes straight to the
//! atomics of a series handle.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

use super::SeriesBackend;
use crate::cartesian::LabelAssignment;
use crate::error::{MetricsError, Result};
use crate::family::{MetricFamily, MetricKind};

/// f64 stored as its bit pattern
#[derive(Debug, Default)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn add(&self, delta: f64) {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + delta).to_bits();
            match self
                .0
                .compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }
}

/// One accumulator
#[derive(Debug)]
pub struct MemorySeries {
    family: String,
    kind: MetricKind,
    labels: LabelAssignment,
    /// Counter or gauge value; observation sum for histograms
    value: AtomicF64,
    count: AtomicU64,
    bounds: Vec<f64>,
    /// One slot per bound plus the overflow slot
    bucket_counts: Vec<AtomicU64>,
}

impl MemorySeries {
    fn new(family: &MetricFamily, labels: LabelAssignment) -> Self {
        let bounds = family.buckets().to_vec();
        let bucket_counts = match family.kind() {
            MetricKind::Histogram => (0..=bounds.len()).map(|_| AtomicU64::new(0)).collect(),
            MetricKind::Counter | MetricKind::Gauge => Vec::new(),
        };
        Self {
            family: family.exported_name(),
            kind: family.kind(),
            labels,
            value: AtomicF64::default(),
            count: AtomicU64::new(0),
            bounds,
            bucket_counts,
        }
    }

    /// Exported family name
    pub fn family(&self) -> &str {
        &self.family
    }

    #[allow(missing_docs)]
    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    #[allow(missing_docs)]
    pub fn labels(&self) -> &LabelAssignment {
        &self.labels
    }

    /// Counter/gauge value, or histogram sum
    pub fn value(&self) -> f64 {
        self.value.load()
    }

    /// Histogram observation count; zero for other kinds
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    fn record(&self, value: f64) {
        let slot = self.bounds.partition_point(|bound| *bound < value);
        if let Some(bucket) = self.bucket_counts.get(slot) {
            bucket.fetch_add(1, Ordering::Relaxed);
        }
        self.count.fetch_add(1, Ordering::Relaxed);
        self.value.add(value);
    }

    fn snapshot(&self) -> SeriesSnapshot {
        let mut cumulative = 0;
        let buckets = self
            .bounds
            .iter()
            .zip(&self.bucket_counts)
            .map(|(bound, slot)| {
                cumulative += slot.load(Ordering::Relaxed);
                BucketSnapshot {
                    le: *bound,
                    count: cumulative,
                }
            })
            .collect();

        SeriesSnapshot {
            name: self.family.clone(),
            kind: self.kind,
            labels: self.labels.iter().collect(),
            value: self.value(),
            count: self.count(),
            buckets,
        }
    }
}

/// Point-in-time copy of every series
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// When the copy was taken
    pub taken_at: DateTime<Utc>,
    /// Series in materialization order
    pub series: Vec<SeriesSnapshot>,
}

/// One series in a [`Snapshot`]
#[derive(Debug, Clone, Serialize)]
pub struct SeriesSnapshot {
    /// Exported family name
    pub name: String,
    #[allow(missing_docs)]
    pub kind: MetricKind,
    #[allow(missing_docs)]
    pub labels: BTreeMap<&'static str, &'static str>,
    /// Counter/gauge value, or histogram sum
    pub value: f64,
    /// Histogram observation count
    pub count: u64,
    /// Cumulative bucket counts; the `+Inf` bucket equals `count`
    pub buckets: Vec<BucketSnapshot>,
}

/// Cumulative count at one upper bound
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BucketSnapshot {
    /// Upper bound (inclusive)
    pub le: f64,
    #[allow(missing_docs)]
    pub count: u64,
}

#[derive(Default)]
struct SeriesIndex {
    families: HashMap<String, MetricKind>,
    by_labels: HashMap<(String, LabelAssignment), Arc<MemorySeries>>,
    ordered: Vec<Arc<MemorySeries>>,
}

#[derive(Default)]
struct MemoryInner {
    index: RwLock<SeriesIndex>,
    mutations: AtomicU64,
}

/// Atomic in-memory backend
///
/// Cheap to clone; clones share the same series.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

impl MemoryBackend {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of materialized series
    pub fn series_count(&self) -> usize {
        self.read().ordered.len()
    }

    /// Number of mutations applied since construction
    pub fn mutation_count(&self) -> u64 {
        self.inner.mutations.load(Ordering::Relaxed)
    }

    /// Whether `family` (exported name) was registered
    pub fn has_family(&self, family: &str) -> bool {
        self.read().families.contains_key(family)
    }

    /// Series matching an exported family name and its full label set
    pub fn find(&self, family: &str, labels: &[(&str, &str)]) -> Option<Arc<MemorySeries>> {
        self.read()
            .ordered
            .iter()
            .find(|series| series.family == family && series.labels.matches(labels))
            .map(Arc::clone)
    }

    /// Value of one series (see [`MemorySeries::value`])
    pub fn value(&self, family: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.find(family, labels).map(|series| series.value())
    }

    /// Observation count of one histogram series
    pub fn histogram_count(&self, family: &str, labels: &[(&str, &str)]) -> Option<u64> {
        self.find(family, labels).map(|series| series.count())
    }

    /// Sum of values across every series of a family
    pub fn family_total(&self, family: &str) -> f64 {
        self.read()
            .ordered
            .iter()
            .filter(|series| series.family == family)
            .map(|series| series.value())
            .sum()
    }

    /// Copy every series
    pub fn snapshot(&self) -> Snapshot {
        let index = self.read();
        Snapshot {
            taken_at: Utc::now(),
            series: index.ordered.iter().map(|series| series.snapshot()).collect(),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, SeriesIndex> {
        self.inner
            .index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.inner.mutations.fetch_add(1, Ordering::Relaxed);
    }
}

impl SeriesBackend for MemoryBackend {
    type Series = Arc<MemorySeries>;

    fn name(&self) -> &'static str {
        "memory"
    }

    fn register(&mut self, family: &MetricFamily) -> Result<()> {
        let exported = family.exported_name();
        let mut index = self
            .inner
            .index
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if index.families.contains_key(&exported) {
            return Err(MetricsError::DuplicateFamily(exported));
        }
        debug!(family = %exported, "Registered memory family");
        index.families.insert(exported, family.kind());
        Ok(())
    }

    fn touch(&self, family: &MetricFamily, labels: &LabelAssignment) -> Result<Self::Series> {
        let exported = family.exported_name();
        let mut index = self
            .inner
            .index
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if !index.families.contains_key(&exported) {
            return Err(MetricsError::UnregisteredFamily(exported));
        }

        let key = (exported, labels.clone());
        if let Some(existing) = index.by_labels.get(&key) {
            return Ok(Arc::clone(existing));
        }

        let series = Arc::new(MemorySeries::new(family, labels.clone()));
        index.by_labels.insert(key, Arc::clone(&series));
        index.ordered.push(Arc::clone(&series));
        Ok(series)
    }

    fn increment(&self, series: &Self::Series, delta: f64) {
        series.value.add(delta);
        self.bump();
    }

    fn observe(&self, series: &Self::Series, value: f64) {
        series.record(value);
        self.bump();
    }

    fn adjust_gauge(&self, series: &Self::Series, delta: f64) {
        series.value.add(delta);
        self.bump();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cartesian::cartesian;
    use crate::labels::LabelDimension;

    fn materialize(backend: &mut MemoryBackend, family: &MetricFamily) -> Vec<Arc<MemorySeries>> {
        backend.register(family).unwrap();
        cartesian(family.dimensions())
            .iter()
            .map(|labels| backend.touch(family, labels).unwrap())
            .collect()
    }

    #[test]
    fn test_touch_is_idempotent() {
        let family = MetricFamily::counter(
            "cache",
            "c",
            vec![LabelDimension::new("cache_result", vec!["hit", "miss"])],
        );
        let mut backend = MemoryBackend::new();
        let first = materialize(&mut backend, &family);
        assert_eq!(backend.series_count(), 2);

        for labels in cartesian(family.dimensions()) {
            backend.touch(&family, &labels).unwrap();
        }
        assert_eq!(backend.series_count(), 2);

        backend.increment(&first[0], 2.0);
        assert_eq!(backend.value("cache", &[("cache_result", "hit")]), Some(2.0));
        assert_eq!(backend.value("cache", &[("cache_result", "miss")]), Some(0.0));
        assert_eq!(backend.mutation_count(), 1);
    }

    #[test]
    fn test_histogram_buckets_are_inclusive() {
        let family = MetricFamily::histogram("wait", "w", vec![], vec![0.1, 0.5]);
        let mut backend = MemoryBackend::new();
        let series = materialize(&mut backend, &family);

        for value in [0.1, 0.3, 0.5, 7.0] {
            backend.observe(&series[0], value);
        }

        let snapshot = backend.snapshot();
        let wait = &snapshot.series[0];
        assert_eq!(wait.count, 4);
        assert_eq!(wait.buckets[0].count, 1);
        assert_eq!(wait.buckets[1].count, 3);
        assert!((wait.value - 7.9).abs() < 1e-9);
    }

    #[test]
    fn test_gauge_moves_both_ways() {
        let family = MetricFamily::gauge("open", "o", vec![]);
        let mut backend = MemoryBackend::new();
        let series = materialize(&mut backend, &family);

        backend.adjust_gauge(&series[0], 1.0);
        backend.adjust_gauge(&series[0], -1.0);
        backend.adjust_gauge(&series[0], -1.0);
        assert_eq!(backend.value("open", &[]), Some(-1.0));
    }

    #[test]
    fn test_clones_share_series() {
        let family = MetricFamily::counter("shared", "s", vec![]);
        let mut backend = MemoryBackend::new();
        let series = materialize(&mut backend, &family);

        let reader = backend.clone();
        backend.increment(&series[0], 1.0);
        assert_eq!(reader.value("shared", &[]), Some(1.0));
        assert!(reader.has_family("shared"));
    }

    #[test]
    fn test_snapshot_serializes() {
        let family = MetricFamily::counter(
            "tcf",
            "t",
            vec![LabelDimension::new("version", vec!["v1", "v2"])],
        );
        let mut backend = MemoryBackend::new();
        materialize(&mut backend, &family);

        let json = serde_json::to_value(backend.snapshot()).unwrap();
        assert_eq!(json["series"][1]["labels"]["version"], "v2");
        assert_eq!(json["series"][0]["kind"], "counter");
    }
}
