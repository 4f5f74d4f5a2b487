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
//! Benchmark recording overhead
//!
//! Measures the hot path of each engine shape, plus the one-off cost of
//! building a registry and pre-materializing every series.

use bidgate_metrics::labels::{AdapterBid, BidType, Bidder, LabelValue, RequestStatus};
use bidgate_metrics::{
    AdapterLabels, FamilyRegistry, Labels, MemoryBackend, Metrics, MetricsEngine, MetricsRecorder,
    PrometheusBackend, Sink,
};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::BTreeSet;
use std::hint::black_box;
use std::time::Duration;

fn registry() -> FamilyRegistry {
    FamilyRegistry::build("pbs", "", &BTreeSet::new()).unwrap()
}

fn engine(backends: usize) -> MetricsEngine {
    let registry = registry();
    let sinks = (0..backends)
        .map(|i| {
            if i % 2 == 0 {
                Sink::Prometheus(Metrics::new(&registry, PrometheusBackend::new()).unwrap())
            } else {
                Sink::Memory(Metrics::new(&registry, MemoryBackend::new()).unwrap())
            }
        })
        .collect();
    MetricsEngine::from_sinks(sinks)
}

/// Mixed auction traffic: one request, one bidder call, one bid
fn record_auction(engine: &MetricsEngine, i: u64) {
    let bidders = Bidder::ALL;
    let statuses = RequestStatus::ALL;

    let labels = Labels {
        status: statuses[(i as usize) % statuses.len()],
        ..Default::default()
    };
    let adapter = AdapterLabels {
        adapter: bidders[(i as usize) % bidders.len()],
        adapter_bids: if i % 3 == 0 {
            AdapterBid::NoBid
        } else {
            AdapterBid::Present
        },
        ..Default::default()
    };

    engine.record_request(&labels);
    engine.record_request_time(&labels, Duration::from_micros(i % 2_000_000));
    engine.record_adapter_request(&adapter);
    engine.record_adapter_bid_received(&adapter, BidType::Banner, i % 2 == 0);
    engine.record_adapter_price(&adapter, (i % 2_000) as f64 / 100.0);
}

fn bench_engine_shapes(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_shapes");

    for backends in [0usize, 1, 2] {
        let engine = engine(backends);
        group.bench_with_input(
            BenchmarkId::new("auction", backends),
            &backends,
            |b, _| {
                let mut i = 0u64;
                b.iter(|| {
                    record_auction(black_box(&engine), i);
                    i = i.wrapping_add(1);
                });
            },
        );
    }

    group.finish();
}

fn bench_counter_increment(c: &mut Criterion) {
    let engine = engine(1);

    c.bench_function("cookie_sync_increment", |b| {
        b.iter(|| engine.record_cookie_sync());
    });
}

fn bench_startup(c: &mut Criterion) {
    let mut group = c.benchmark_group("startup");
    group.sample_size(10);

    group.bench_function("registry_build", |b| {
        b.iter(|| black_box(registry()));
    });

    let registry = registry();
    group.bench_function("materialize_prometheus", |b| {
        b.iter(|| black_box(Metrics::new(&registry, PrometheusBackend::new()).unwrap()));
    });
    group.bench_function("materialize_memory", |b| {
        b.iter(|| black_box(Metrics::new(&registry, MemoryBackend::new()).unwrap()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_engine_shapes,
    bench_counter_increment,
    bench_startup
);
criterion_main!(benches);
