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
//! Backend-count dispatch
//!
//! The engine variant is picked once from the number of configured
//! backends and never changes afterwards.

use bidgate_config::{MetricsConfig, Validator};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::backend::{MemoryBackend, PrometheusBackend};
use crate::error::Result;
use crate::family::FamilyRegistry;
use crate::labels::{BidType, Bidder, CacheResult, RequestType, TcfVersion};
use crate::recorder::{Metrics, MetricsRecorder};
use crate::types::{AdapterLabels, ImpLabels, Labels, UserLabels};

/// One concrete backend behind the recording interface
#[derive(Clone)]
pub enum Sink {
    /// Pull backend
    Prometheus(Metrics<PrometheusBackend>),
    /// Push/in-process backend
    Memory(Metrics<MemoryBackend>),
    /// Caller-supplied recorder
    Dynamic(Arc<dyn MetricsRecorder>),
}

impl Sink {
    /// Short name for logs
    pub fn backend_name(&self) -> &'static str {
        match self {
            Sink::Prometheus(_) => "prometheus",
            Sink::Memory(_) => "memory",
            Sink::Dynamic(_) => "dynamic",
        }
    }
}

/// Recording entry point handed to the serving code
#[derive(Clone, Default)]
pub enum MetricsEngine {
    /// No backend configured; every call is a no-op
    #[default]
    NoOp,
    /// Exactly one backend
    Single(Sink),
    /// Several backends, called in configured order
    FanOut(Vec<Sink>),
}

/// Engine plus typed handles to the backends it was built with
pub struct EngineHandles {
    /// The recorder
    pub engine: MetricsEngine,
    /// Set when a Prometheus port is configured
    pub prometheus: Option<Metrics<PrometheusBackend>>,
    /// Set when a push host is configured
    pub memory: Option<Metrics<MemoryBackend>>,
}

impl MetricsEngine {
    /// Zero sinks give `NoOp`, one gives `Single`, more give `FanOut`
    pub fn from_sinks(mut sinks: Vec<Sink>) -> Self {
        if sinks.len() > 1 {
            return MetricsEngine::FanOut(sinks);
        }
        match sinks.pop() {
            Some(sink) => MetricsEngine::Single(sink),
            None => MetricsEngine::NoOp,
        }
    }

    #[allow(missing_docs)]
    pub fn noop() -> Self {
        MetricsEngine::NoOp
    }

    /// Number of sinks events are forwarded to
    pub fn backend_count(&self) -> usize {
        match self {
            MetricsEngine::NoOp => 0,
            MetricsEngine::Single(_) => 1,
            MetricsEngine::FanOut(sinks) => sinks.len(),
        }
    }

    /// Sink names in forwarding order
    pub fn backend_names(&self) -> Vec<&'static str> {
        match self {
            MetricsEngine::NoOp => Vec::new(),
            MetricsEngine::Single(sink) => vec![sink.backend_name()],
            MetricsEngine::FanOut(sinks) => sinks.iter().map(Sink::backend_name).collect(),
        }
    }

    /// Build every configured backend and the engine over them.
    ///
    /// The push backend is built when `influxdb.host` is set and the
    /// Prometheus backend when `prometheus.port` is non-zero, in that order.
    /// Any registration error aborts construction.
    pub fn from_config(config: &MetricsConfig) -> Result<EngineHandles> {
        config.validate()?;

        let registry =
            FamilyRegistry::build(&config.namespace, &config.subsystem, &config.disabled_families)?;

        let mut sinks = Vec::with_capacity(config.active_backends());

        let memory = if config.influxdb.is_enabled() {
            let metrics = Metrics::new(&registry, MemoryBackend::new())?;
            sinks.push(Sink::Memory(metrics.clone()));
            Some(metrics)
        } else {
            None
        };

        let prometheus = if config.prometheus.is_enabled() {
            let metrics = Metrics::new(&registry, PrometheusBackend::new())?;
            sinks.push(Sink::Prometheus(metrics.clone()));
            Some(metrics)
        } else {
            None
        };

        let engine = MetricsEngine::from_sinks(sinks);
        info!(backends = ?engine.backend_names(), "Metrics engine ready");

        Ok(EngineHandles {
            engine,
            prometheus,
            memory,
        })
    }
}

fn isolate(sink: &Sink, event: &'static str, record: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(record)) {
        error!(
            backend = sink.backend_name(),
            event,
            reason = panic_reason(payload.as_ref()),
            "Metrics sink panicked, continuing with remaining sinks"
        );
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

macro_rules! forward_recorder {
    ($( fn $method:ident($($arg:ident: $ty:ty),*); )+) => {
        impl MetricsRecorder for Sink {
            $(
                fn $method(&self, $($arg: $ty),*) {
                    match self {
                        Sink::Prometheus(metrics) => metrics.$method($($arg),*),
                        Sink::Memory(metrics) => metrics.$method($($arg),*),
                        Sink::Dynamic(recorder) => recorder.$method($($arg),*),
                    }
                }
            )+
        }

        impl MetricsRecorder for MetricsEngine {
            $(
                fn $method(&self, $($arg: $ty),*) {
                    match self {
                        MetricsEngine::NoOp => {}
                        MetricsEngine::Single(sink) => sink.$method($($arg),*),
                        MetricsEngine::FanOut(sinks) => {
                            for sink in sinks {
                                isolate(sink, stringify!($method), || sink.$method($($arg),*));
                            }
                        }
                    }
                }
            )+
        }
    };
}

forward_recorder! {
    fn record_connection_accept(success: bool);
    fn record_connection_close(success: bool);
    fn record_request(labels: &Labels);
    fn record_imps(labels: ImpLabels);
    fn record_legacy_imps(labels: &Labels, num_imps: usize);
    fn record_request_time(labels: &Labels, length: Duration);
    fn record_adapter_request(labels: &AdapterLabels);
    fn record_adapter_panic(labels: &AdapterLabels);
    fn record_adapter_bid_received(labels: &AdapterLabels, bid_type: BidType, has_adm: bool);
    fn record_adapter_price(labels: &AdapterLabels, cpm: f64);
    fn record_adapter_time(labels: &AdapterLabels, length: Duration);
    fn record_adapter_connections(adapter: Bidder, reused: bool, wait: Duration);
    fn record_dns_time(length: Duration);
    fn record_cookie_sync();
    fn record_adapter_cookie_sync(adapter: Bidder, gdpr_blocked: bool);
    fn record_user_id_set(labels: UserLabels);
    fn record_stored_req_cache_result(result: CacheResult, inc: usize);
    fn record_stored_imp_cache_result(result: CacheResult, inc: usize);
    fn record_prebid_cache_request_time(success: bool, length: Duration);
    fn record_request_queue_time(success: bool, request_type: RequestType, length: Duration);
    fn record_timeout_notice(success: bool);
    fn record_tcf_req(version: TcfVersion);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn memory_sink() -> (Sink, MemoryBackend) {
        let registry = FamilyRegistry::build("", "", &BTreeSet::new()).unwrap();
        let backend = MemoryBackend::new();
        let metrics = Metrics::new(&registry, backend.clone()).unwrap();
        (Sink::Memory(metrics), backend)
    }

    #[test]
    fn test_variant_follows_sink_count() {
        assert!(matches!(MetricsEngine::from_sinks(vec![]), MetricsEngine::NoOp));

        let (one, _) = memory_sink();
        assert!(matches!(
            MetricsEngine::from_sinks(vec![one.clone()]),
            MetricsEngine::Single(_)
        ));

        let engine = MetricsEngine::from_sinks(vec![one.clone(), one]);
        assert!(matches!(engine, MetricsEngine::FanOut(_)));
        assert_eq!(engine.backend_count(), 2);
    }

    #[test]
    fn test_from_config_without_backends_is_noop() {
        let handles = MetricsEngine::from_config(&MetricsConfig::default()).unwrap();
        assert!(matches!(handles.engine, MetricsEngine::NoOp));
        assert!(handles.prometheus.is_none());
        assert!(handles.memory.is_none());
    }

    #[test]
    fn test_from_config_orders_push_before_pull() {
        let mut config = MetricsConfig::default();
        config.prometheus.port = 9100;
        config.influxdb.host = "http://influx:8086".to_string();
        config.influxdb.database = "pbs".to_string();

        let handles = MetricsEngine::from_config(&config).unwrap();
        assert_eq!(handles.engine.backend_names(), vec!["memory", "prometheus"]);
        assert!(handles.prometheus.is_some());
        assert!(handles.memory.is_some());
    }

    #[test]
    fn test_from_config_rejects_invalid_config() {
        let mut config = MetricsConfig::default();
        config.namespace = "not valid".to_string();
        assert!(MetricsEngine::from_config(&config).is_err());
    }

    #[test]
    fn test_single_forwards() {
        let (sink, backend) = memory_sink();
        let engine = MetricsEngine::from_sinks(vec![sink]);
        engine.record_cookie_sync();
        assert_eq!(backend.value("cookie_sync_requests_total", &[]), Some(1.0));
    }

    #[test]
    fn test_panic_reason() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_reason(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_reason(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_reason(payload.as_ref()), "unknown panic");
    }
}
