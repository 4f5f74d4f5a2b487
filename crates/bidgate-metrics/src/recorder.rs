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
//! Event recording
//!
//! [`MetricsRecorder`] is the surface the serving code calls on the hot
//! path. [`Metrics`] implements it over one backend: every series is created
//! up front, so recording is a table lookup followed by an atomic update.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::backend::SeriesBackend;
use crate::cartesian::Materializer;
use crate::error::{MetricsError, Result};
use crate::family::{FamilyId, FamilyRegistry};
use crate::labels::{
    AdapterError, BidType, Bidder, CacheResult, ConnectionError, ConnectionKind, Flag, LabelDimension,
    LabelValue, MarkupType, NoticeOutcome, QueueOutcome, RequestType, TcfVersion,
};
use crate::types::{AdapterLabels, ImpLabels, Labels, UserLabels};

/// One operation per event kind.
///
/// Recording never fails and never blocks; implementations drop what they
/// cannot record.
pub trait MetricsRecorder: Send + Sync {
    /// Connection accepted, or failed to accept
    fn record_connection_accept(&self, success: bool);

    /// Connection closed, or failed to close
    fn record_connection_close(&self, success: bool);

    /// Auction request received
    fn record_request(&self, labels: &Labels);

    /// Impression types present in one request
    fn record_imps(&self, labels: ImpLabels);

    /// Impressions requested through the legacy endpoint
    fn record_legacy_imps(&self, labels: &Labels, num_imps: usize);

    /// End to end request latency
    fn record_request_time(&self, labels: &Labels, length: Duration);

    /// Request sent to a bidder, plus one error count per distinct error kind
    fn record_adapter_request(&self, labels: &AdapterLabels);

    /// Panic recovered while calling a bidder
    fn record_adapter_panic(&self, labels: &AdapterLabels);

    /// Bid returned by a bidder
    fn record_adapter_bid_received(&self, labels: &AdapterLabels, bid_type: BidType, has_adm: bool);

    /// CPM of a returned bid
    fn record_adapter_price(&self, labels: &AdapterLabels, cpm: f64);

    /// Bidder response latency
    fn record_adapter_time(&self, labels: &AdapterLabels, length: Duration);

    /// Connection obtained for a bidder call
    fn record_adapter_connections(&self, adapter: Bidder, reused: bool, wait: Duration);

    /// Host name resolution latency
    fn record_dns_time(&self, length: Duration);

    /// Cookie sync request received
    fn record_cookie_sync(&self);

    /// Cookie sync returned for one bidder
    fn record_adapter_cookie_sync(&self, adapter: Bidder, gdpr_blocked: bool);

    /// User id sync call
    fn record_user_id_set(&self, labels: UserLabels);

    /// Stored request cache lookups
    fn record_stored_req_cache_result(&self, result: CacheResult, inc: usize);

    /// Stored impression cache lookups
    fn record_stored_imp_cache_result(&self, result: CacheResult, inc: usize);

    /// Round trip to the external bid cache
    fn record_prebid_cache_request_time(&self, success: bool, length: Duration);

    /// Time spent waiting for admission
    fn record_request_queue_time(&self, success: bool, request_type: RequestType, length: Duration);

    /// Timeout notification sent to a bidder
    fn record_timeout_notice(&self, success: bool);

    /// Consent string version seen on a request
    fn record_tcf_req(&self, version: TcfVersion);
}

/// Series of one family, stored in cartesian order
struct FamilySeries<S> {
    radices: Vec<usize>,
    series: Vec<S>,
}

impl<S> FamilySeries<S> {
    /// Mixed-radix index of `positions`; `None` when any position is out of range
    fn get(&self, positions: &[usize]) -> Option<&S> {
        if positions.len() != self.radices.len() {
            return None;
        }
        let index = positions
            .iter()
            .zip(&self.radices)
            .try_fold(0usize, |acc, (&position, &radix)| {
                if position < radix {
                    Some(acc * radix + position)
                } else {
                    None
                }
            })?;
        self.series.get(index)
    }
}

struct MetricsInner<B: SeriesBackend> {
    backend: B,
    tables: Vec<FamilySeries<B::Series>>,
    slots: [Option<usize>; FamilyId::COUNT],
}

/// Recorder over one backend, with every series pre-materialized
///
/// Cheap to clone and safe to share across tasks.
pub struct Metrics<B: SeriesBackend> {
    inner: Arc<MetricsInner<B>>,
}

impl<B: SeriesBackend> Clone for Metrics<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: SeriesBackend> Metrics<B> {
    /// Register every family of `registry` with `backend` and touch every
    /// series.
    ///
    /// A family whose name matches a known event but whose kind or dimensions
    /// differ from the canonical declaration is rejected, since its events
    /// could not be resolved.
    pub fn new(registry: &FamilyRegistry, mut backend: B) -> Result<Self> {
        let mut materializer = Materializer::new();
        let mut tables = Vec::with_capacity(registry.len());
        let mut slots = [None; FamilyId::COUNT];

        for family in registry.families() {
            if let Some(id) = FamilyId::from_name(family.name()) {
                let declared = id.declare()?;
                if declared.kind() != family.kind() || declared.dimensions() != family.dimensions()
                {
                    return Err(MetricsError::SchemaMismatch {
                        family: family.exported_name(),
                        reason: format!(
                            "expected {:?} over {:?}, found {:?} over {:?}",
                            declared.kind(),
                            declared.label_names(),
                            family.kind(),
                            family.label_names()
                        ),
                    });
                }
                slots[id.index()] = Some(tables.len());
            }

            backend.register(family)?;
            let assignments = materializer.expand(family.dimensions());
            let series = assignments
                .iter()
                .map(|labels| backend.touch(family, labels))
                .collect::<Result<Vec<_>>>()?;

            tables.push(FamilySeries {
                radices: family.dimensions().iter().map(LabelDimension::len).collect(),
                series,
            });
        }

        let series: usize = tables.iter().map(|table| table.series.len()).sum();
        info!(
            backend = backend.name(),
            families = tables.len(),
            series,
            reused_prefixes = materializer.reused(),
            "Pre-materialized metric series"
        );

        Ok(Self {
            inner: Arc::new(MetricsInner {
                backend,
                tables,
                slots,
            }),
        })
    }

    /// Backend the series live in
    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    /// Number of series touched at construction
    pub fn series_count(&self) -> usize {
        self.inner.tables.iter().map(|table| table.series.len()).sum()
    }

    /// Whether events for `id` are recorded
    pub fn is_enabled(&self, id: FamilyId) -> bool {
        self.inner.slots[id.index()].is_some()
    }

    fn series(&self, id: FamilyId, positions: &[usize]) -> Option<&B::Series> {
        // Disabled families are skipped without noise
        let slot = self.inner.slots[id.index()]?;
        let found = self
            .inner
            .tables
            .get(slot)
            .and_then(|table| table.get(positions));
        if found.is_none() {
            resolution_miss(id, positions);
        }
        found
    }

    fn inc(&self, id: FamilyId, positions: &[usize]) {
        self.add(id, positions, 1.0);
    }

    fn add(&self, id: FamilyId, positions: &[usize], delta: f64) {
        if let Some(series) = self.series(id, positions) {
            self.inner.backend.increment(series, delta);
        }
    }

    fn observe(&self, id: FamilyId, positions: &[usize], value: f64) {
        if let Some(series) = self.series(id, positions) {
            self.inner.backend.observe(series, value);
        }
    }

    fn adjust(&self, id: FamilyId, delta: f64) {
        if let Some(series) = self.series(id, &[]) {
            self.inner.backend.adjust_gauge(series, delta);
        }
    }
}

#[cold]
#[inline(never)]
fn resolution_miss(id: FamilyId, positions: &[usize]) {
    error!(
        family = id.name(),
        ?positions,
        "Event labels fell outside the pre-materialized series"
    );
    if cfg!(debug_assertions) {
        panic!("label resolution missed for {}: {positions:?}", id.name());
    }
}

fn standard(labels: &Labels) -> [usize; 5] {
    [
        labels.source.ordinal(),
        labels.request_type.ordinal(),
        labels.browser.ordinal(),
        labels.cookie.ordinal(),
        labels.status.ordinal(),
    ]
}

fn adapter(labels: &AdapterLabels) -> [usize; 6] {
    [
        labels.source.ordinal(),
        labels.request_type.ordinal(),
        labels.browser.ordinal(),
        labels.cookie.ordinal(),
        labels.adapter.ordinal(),
        labels.adapter_bids.ordinal(),
    ]
}

fn bid_received(labels: &AdapterLabels, bid_type: BidType, has_adm: bool) -> [usize; 8] {
    let [source, request_type, browser, cookie, bidder, bid] = adapter(labels);
    [
        source,
        request_type,
        browser,
        cookie,
        bidder,
        bid,
        bid_type.ordinal(),
        MarkupType::from_adm(has_adm).ordinal(),
    ]
}

fn adapter_error(labels: &AdapterLabels, error: AdapterError) -> [usize; 6] {
    [
        labels.source.ordinal(),
        labels.request_type.ordinal(),
        labels.browser.ordinal(),
        labels.cookie.ordinal(),
        labels.adapter.ordinal(),
        error.ordinal(),
    ]
}

fn imps(labels: ImpLabels) -> [usize; 4] {
    labels.presence().map(|presence| presence.ordinal())
}

impl<B: SeriesBackend> MetricsRecorder for Metrics<B> {
    fn record_connection_accept(&self, success: bool) {
        if success {
            self.adjust(FamilyId::ActiveConnections, 1.0);
        } else {
            self.inc(
                FamilyId::ConnectionErrors,
                &[ConnectionError::Accept.ordinal()],
            );
        }
    }

    fn record_connection_close(&self, success: bool) {
        if success {
            self.adjust(FamilyId::ActiveConnections, -1.0);
        } else {
            self.inc(
                FamilyId::ConnectionErrors,
                &[ConnectionError::Close.ordinal()],
            );
        }
    }

    fn record_request(&self, labels: &Labels) {
        self.inc(FamilyId::Requests, &standard(labels));
    }

    fn record_imps(&self, labels: ImpLabels) {
        self.inc(FamilyId::ImpsRequested, &imps(labels));
    }

    fn record_legacy_imps(&self, labels: &Labels, num_imps: usize) {
        self.add(
            FamilyId::LegacyImpsRequested,
            &standard(labels),
            num_imps as f64,
        );
    }

    fn record_request_time(&self, labels: &Labels, length: Duration) {
        self.observe(FamilyId::RequestTime, &standard(labels), length.as_secs_f64());
    }

    fn record_adapter_request(&self, labels: &AdapterLabels) {
        self.inc(FamilyId::AdapterRequests, &adapter(labels));
        for error in labels.adapter_errors.iter() {
            self.inc(FamilyId::AdapterErrors, &adapter_error(labels, error));
        }
    }

    fn record_adapter_panic(&self, labels: &AdapterLabels) {
        self.inc(FamilyId::AdapterPanics, &adapter(labels));
    }

    fn record_adapter_bid_received(&self, labels: &AdapterLabels, bid_type: BidType, has_adm: bool) {
        self.inc(
            FamilyId::AdapterBidsReceived,
            &bid_received(labels, bid_type, has_adm),
        );
    }

    fn record_adapter_price(&self, labels: &AdapterLabels, cpm: f64) {
        self.observe(FamilyId::AdapterPrices, &adapter(labels), cpm);
    }

    fn record_adapter_time(&self, labels: &AdapterLabels, length: Duration) {
        self.observe(FamilyId::AdapterTime, &adapter(labels), length.as_secs_f64());
    }

    fn record_adapter_connections(&self, adapter: Bidder, reused: bool, wait: Duration) {
        self.inc(
            FamilyId::AdapterConnections,
            &[
                adapter.ordinal(),
                ConnectionKind::from_reused(reused).ordinal(),
            ],
        );
        self.observe(
            FamilyId::AdapterConnectionWait,
            &[adapter.ordinal()],
            wait.as_secs_f64(),
        );
    }

    fn record_dns_time(&self, length: Duration) {
        self.observe(FamilyId::DnsLookupTime, &[], length.as_secs_f64());
    }

    fn record_cookie_sync(&self) {
        self.inc(FamilyId::CookieSyncRequests, &[]);
    }

    fn record_adapter_cookie_sync(&self, adapter: Bidder, gdpr_blocked: bool) {
        self.inc(
            FamilyId::CookieSyncReturns,
            &[adapter.ordinal(), Flag::from(gdpr_blocked).ordinal()],
        );
    }

    fn record_user_id_set(&self, labels: UserLabels) {
        self.inc(
            FamilyId::SetUidCalls,
            &[labels.action.ordinal(), labels.bidder.ordinal()],
        );
    }

    fn record_stored_req_cache_result(&self, result: CacheResult, inc: usize) {
        self.add(FamilyId::StoredRequestCache, &[result.ordinal()], inc as f64);
    }

    fn record_stored_imp_cache_result(&self, result: CacheResult, inc: usize) {
        self.add(FamilyId::StoredImpCache, &[result.ordinal()], inc as f64);
    }

    fn record_prebid_cache_request_time(&self, success: bool, length: Duration) {
        self.observe(
            FamilyId::PrebidCacheRequestTime,
            &[Flag::from(success).ordinal()],
            length.as_secs_f64(),
        );
    }

    fn record_request_queue_time(&self, success: bool, request_type: RequestType, length: Duration) {
        self.observe(
            FamilyId::RequestQueueTime,
            &[
                request_type.ordinal(),
                QueueOutcome::from_success(success).ordinal(),
            ],
            length.as_secs_f64(),
        );
    }

    fn record_timeout_notice(&self, success: bool) {
        self.inc(
            FamilyId::TimeoutNotification,
            &[NoticeOutcome::from_success(success).ordinal()],
        );
    }

    fn record_tcf_req(&self, version: TcfVersion) {
        self.inc(FamilyId::PrivacyTcf, &[version.ordinal()]);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::family::MetricFamily;
    use crate::labels::{Browser, CookieFlag, DemandSource, ImpPresence};
    use crate::types::AdapterErrorSet;
    use std::collections::BTreeSet;

    fn build() -> (Metrics<MemoryBackend>, MemoryBackend) {
        let registry = FamilyRegistry::build("", "", &BTreeSet::new()).unwrap();
        let backend = MemoryBackend::new();
        let metrics = Metrics::new(&registry, backend.clone()).unwrap();
        (metrics, backend)
    }

    #[test]
    fn test_every_series_is_touched() {
        let registry = FamilyRegistry::build("", "", &BTreeSet::new()).unwrap();
        let backend = MemoryBackend::new();
        let metrics = Metrics::new(&registry, backend.clone()).unwrap();

        assert_eq!(metrics.series_count(), registry.total_cardinality());
        assert_eq!(backend.series_count(), registry.total_cardinality());
        assert_eq!(backend.mutation_count(), 0);
    }

    #[test]
    fn test_mixed_radix_index_follows_cartesian_order() {
        let table = FamilySeries {
            radices: vec![2, 3],
            series: (0..6).collect::<Vec<usize>>(),
        };
        assert_eq!(table.get(&[0, 0]), Some(&0));
        assert_eq!(table.get(&[0, 2]), Some(&2));
        assert_eq!(table.get(&[1, 0]), Some(&3));
        assert_eq!(table.get(&[1, 2]), Some(&5));
        assert_eq!(table.get(&[2, 0]), None);
        assert_eq!(table.get(&[0]), None);
    }

    #[test]
    fn test_connection_gauge_and_errors() {
        let (metrics, backend) = build();
        metrics.record_connection_accept(true);
        metrics.record_connection_accept(true);
        metrics.record_connection_close(true);
        metrics.record_connection_close(false);

        assert_eq!(backend.value("active_connections", &[]), Some(1.0));
        assert_eq!(
            backend.value("active_connections_total", &[("ErrorType", "close_error")]),
            Some(1.0)
        );
        assert_eq!(
            backend.value("active_connections_total", &[("ErrorType", "accept_error")]),
            Some(0.0)
        );
    }

    #[test]
    fn test_adapter_request_counts_each_error_kind_once() {
        let (metrics, backend) = build();
        let labels = AdapterLabels {
            source: DemandSource::Web,
            request_type: RequestType::Amp,
            browser: Browser::Safari,
            cookie: CookieFlag::Exists,
            adapter: Bidder::Rubicon,
            adapter_errors: AdapterErrorSet::new()
                .with(AdapterError::Timeout)
                .with(AdapterError::BadInput)
                .with(AdapterError::Timeout),
            ..Default::default()
        };

        metrics.record_adapter_request(&labels);
        assert_eq!(backend.mutation_count(), 3);
        assert_eq!(backend.family_total("adapter_errors_total"), 2.0);

        let timeout = [
            ("demand_source", "web"),
            ("request_type", "amp"),
            ("browser", "safari"),
            ("cookie", "exists"),
            ("adapter", "rubicon"),
            ("adapter_error", "timeout"),
        ];
        assert_eq!(backend.value("adapter_errors_total", &timeout), Some(1.0));
    }

    #[test]
    fn test_imps_resolve_to_yes_no_tokens() {
        let all = ImpLabels {
            banner: true,
            video: true,
            audio: true,
            native: true,
        };
        assert_eq!(imps(all), [ImpPresence::Yes.ordinal(); 4]);

        let (metrics, backend) = build();
        metrics.record_imps(all);
        let yes = [
            ("banner", "yes"),
            ("video", "yes"),
            ("audio", "yes"),
            ("native", "yes"),
        ];
        assert_eq!(backend.value("imps_requested", &yes), Some(1.0));
    }

    #[test]
    fn test_markup_type_follows_payload() {
        let labels = AdapterLabels::default();
        assert_eq!(
            bid_received(&labels, BidType::Video, true)[7],
            MarkupType::Adm.ordinal()
        );
        assert_eq!(
            bid_received(&labels, BidType::Video, false)[7],
            MarkupType::Unknown.ordinal()
        );
    }

    #[test]
    fn test_durations_observed_in_seconds() {
        let (metrics, backend) = build();
        metrics.record_dns_time(Duration::from_millis(250));
        metrics.record_request_queue_time(false, RequestType::Video, Duration::from_millis(40));

        assert_eq!(backend.value("dns_lookup_time_seconds", &[]), Some(0.25));
        assert_eq!(
            backend.histogram_count(
                "request_queue_time_seconds",
                &[("request_type", "video"), ("request_status", "rejected")]
            ),
            Some(1)
        );
    }

    #[test]
    fn test_disabled_family_is_silently_skipped() {
        let disabled = BTreeSet::from(["privacy_tcf".to_string()]);
        let registry = FamilyRegistry::build("", "", &disabled).unwrap();
        let backend = MemoryBackend::new();
        let metrics = Metrics::new(&registry, backend.clone()).unwrap();

        assert!(!metrics.is_enabled(FamilyId::PrivacyTcf));
        metrics.record_tcf_req(TcfVersion::V2);
        assert_eq!(backend.mutation_count(), 0);
        assert!(!backend.has_family("privacy_tcf"));
    }

    #[test]
    fn test_schema_drift_is_rejected() {
        let families = vec![MetricFamily::counter("privacy_tcf", "drifted", vec![])];
        let registry = FamilyRegistry::from_families("", "", families, &BTreeSet::new()).unwrap();
        let result = Metrics::new(&registry, MemoryBackend::new());
        assert!(matches!(result, Err(MetricsError::SchemaMismatch { .. })));
    }

    #[test]
    fn test_unknown_families_are_materialized_but_not_recorded() {
        let families = vec![MetricFamily::counter(
            "custom_total",
            "c",
            vec![LabelDimension::of::<ImpPresence>("present")],
        )];
        let registry = FamilyRegistry::from_families("", "", families, &BTreeSet::new()).unwrap();
        let backend = MemoryBackend::new();
        let metrics = Metrics::new(&registry, backend.clone()).unwrap();

        assert_eq!(backend.series_count(), 2);
        metrics.record_request(&Labels::default());
        assert_eq!(backend.mutation_count(), 0);
    }
}
