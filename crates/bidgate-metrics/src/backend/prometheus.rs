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
//! Pull backend on top of the prometheus client registry

use prometheus::{
    Counter, CounterVec, Encoder, Gauge, GaugeVec, Histogram, HistogramOpts, HistogramVec, Opts,
    Registry, TextEncoder,
};
use std::collections::HashMap;
use tracing::{debug, error};

use super::SeriesBackend;
use crate::cartesian::LabelAssignment;
use crate::error::{MetricsError, Result};
use crate::family::{MetricFamily, MetricKind};

enum FamilyVec {
    Counter(CounterVec),
    Gauge(GaugeVec),
    Histogram(HistogramVec),
}

/// Child handle of a registered vec
#[derive(Clone)]
pub enum PromSeries {
    #[allow(missing_docs)]
    Counter(Counter),
    #[allow(missing_docs)]
    Gauge(Gauge),
    #[allow(missing_docs)]
    Histogram(Histogram),
}

impl PromSeries {
    fn kind(&self) -> MetricKind {
        match self {
            PromSeries::Counter(_) => MetricKind::Counter,
            PromSeries::Gauge(_) => MetricKind::Gauge,
            PromSeries::Histogram(_) => MetricKind::Histogram,
        }
    }
}

/// Prometheus registry backend
///
/// Every family becomes one `*Vec` registered with the wrapped
/// [`Registry`]; every touched assignment becomes a child of that vec.
pub struct PrometheusBackend {
    registry: Registry,
    vecs: HashMap<String, FamilyVec>,
}

impl PrometheusBackend {
    /// Backend over a fresh registry
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    /// Backend over an existing registry
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            vecs: HashMap::new(),
        }
    }

    /// Underlying registry, for gathering
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encode everything in the text exposition format
    pub fn encode_text(&self) -> Result<String> {
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| {
            MetricsError::Prometheus(prometheus::Error::Msg(format!(
                "exposition is not UTF-8: {e}"
            )))
        })
    }
}

impl Default for PrometheusBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SeriesBackend for PrometheusBackend {
    type Series = PromSeries;

    fn name(&self) -> &'static str {
        "prometheus"
    }

    fn register(&mut self, family: &MetricFamily) -> Result<()> {
        let exported = family.exported_name();
        if self.vecs.contains_key(&exported) {
            return Err(MetricsError::DuplicateFamily(exported));
        }

        let labels = family.label_names();
        let vec = match family.kind() {
            MetricKind::Counter => {
                let vec = CounterVec::new(opts(family), &labels)?;
                self.registry.register(Box::new(vec.clone()))?;
                FamilyVec::Counter(vec)
            }
            MetricKind::Gauge => {
                let vec = GaugeVec::new(opts(family), &labels)?;
                self.registry.register(Box::new(vec.clone()))?;
                FamilyVec::Gauge(vec)
            }
            MetricKind::Histogram => {
                let histogram_opts = HistogramOpts::new(family.name(), family.help())
                    .namespace(family.namespace())
                    .subsystem(family.subsystem())
                    .buckets(family.buckets().to_vec());
                let vec = HistogramVec::new(histogram_opts, &labels)?;
                self.registry.register(Box::new(vec.clone()))?;
                FamilyVec::Histogram(vec)
            }
        };

        debug!(family = %exported, labels = labels.len(), "Registered prometheus family");
        self.vecs.insert(exported, vec);
        Ok(())
    }

    fn touch(&self, family: &MetricFamily, labels: &LabelAssignment) -> Result<PromSeries> {
        let exported = family.exported_name();
        let vec = self
            .vecs
            .get(&exported)
            .ok_or(MetricsError::UnregisteredFamily(exported))?;

        let map = labels.to_map();
        let series = match vec {
            FamilyVec::Counter(vec) => PromSeries::Counter(vec.get_metric_with(&map)?),
            FamilyVec::Gauge(vec) => PromSeries::Gauge(vec.get_metric_with(&map)?),
            FamilyVec::Histogram(vec) => PromSeries::Histogram(vec.get_metric_with(&map)?),
        };
        Ok(series)
    }

    fn increment(&self, series: &PromSeries, delta: f64) {
        match series {
            PromSeries::Counter(counter) => counter.inc_by(delta),
            other => kind_mismatch("increment", other.kind()),
        }
    }

    fn observe(&self, series: &PromSeries, value: f64) {
        match series {
            PromSeries::Histogram(histogram) => histogram.observe(value),
            other => kind_mismatch("observe", other.kind()),
        }
    }

    fn adjust_gauge(&self, series: &PromSeries, delta: f64) {
        match series {
            PromSeries::Gauge(gauge) => gauge.add(delta),
            other => kind_mismatch("adjust_gauge", other.kind()),
        }
    }
}

fn opts(family: &MetricFamily) -> Opts {
    Opts::new(family.name(), family.help())
        .namespace(family.namespace())
        .subsystem(family.subsystem())
}

#[cold]
fn kind_mismatch(operation: &str, kind: MetricKind) {
    error!(operation, ?kind, "Mutation does not apply to series kind");
    if cfg!(debug_assertions) {
        panic!("{operation} on a {kind:?} series");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cartesian::cartesian;
    use crate::labels::LabelDimension;

    fn outcome() -> LabelDimension {
        LabelDimension::new("outcome", vec!["ok", "failed"])
    }

    #[test]
    fn test_register_and_touch() {
        let family = MetricFamily::counter("notices", "Notices sent", vec![outcome()])
            .with_prefix("pbs", "");
        let mut backend = PrometheusBackend::new();
        backend.register(&family).unwrap();

        let series: Vec<_> = cartesian(family.dimensions())
            .iter()
            .map(|labels| backend.touch(&family, labels).unwrap())
            .collect();
        backend.increment(&series[1], 3.0);

        let text = backend.encode_text().unwrap();
        assert!(text.contains("pbs_notices{outcome=\"ok\"} 0"));
        assert!(text.contains("pbs_notices{outcome=\"failed\"} 3"));
    }

    #[test]
    fn test_unlabeled_gauge() {
        let family = MetricFamily::gauge("active_connections", "Open connections", vec![]);
        let mut backend = PrometheusBackend::new();
        backend.register(&family).unwrap();

        let series = backend.touch(&family, &LabelAssignment::default()).unwrap();
        backend.adjust_gauge(&series, 1.0);
        backend.adjust_gauge(&series, 1.0);
        backend.adjust_gauge(&series, -1.0);

        match series {
            PromSeries::Gauge(gauge) => assert_eq!(gauge.get(), 1.0),
            _ => panic!("expected gauge"),
        }
    }

    #[test]
    fn test_histogram_buckets_exported() {
        let family = MetricFamily::histogram("wait_seconds", "Wait", vec![], vec![0.5, 1.0]);
        let mut backend = PrometheusBackend::new();
        backend.register(&family).unwrap();

        let series = backend.touch(&family, &LabelAssignment::default()).unwrap();
        backend.observe(&series, 0.7);

        let text = backend.encode_text().unwrap();
        assert!(text.contains("wait_seconds_bucket{le=\"0.5\"} 0"));
        assert!(text.contains("wait_seconds_bucket{le=\"1\"} 1"));
        assert!(text.contains("wait_seconds_count 1"));
    }

    #[test]
    fn test_double_register_rejected() {
        let family = MetricFamily::counter("twice", "t", vec![]);
        let mut backend = PrometheusBackend::new();
        backend.register(&family).unwrap();
        assert!(matches!(
            backend.register(&family),
            Err(MetricsError::DuplicateFamily(_))
        ));
    }

    #[test]
    fn test_touch_unregistered() {
        let family = MetricFamily::counter("ghost", "g", vec![]);
        let backend = PrometheusBackend::new();
        assert!(matches!(
            backend.touch(&family, &LabelAssignment::default()),
            Err(MetricsError::UnregisteredFamily(_))
        ));
    }
}
