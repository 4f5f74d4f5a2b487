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
//! Metric family declarations and the validated registry built from them

use bidgate_config::is_metric_identifier;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::error::{MetricsError, Result};
use crate::labels::{
    keys, AdapterBid, AdapterError, BidType, Bidder, Browser, CacheResult, ConnectionError,
    ConnectionKind, CookieFlag, DemandSource, Flag, ImpPresence, LabelDimension, MarkupType,
    NoticeOutcome, QueueOutcome, RequestStatus, RequestType, SyncAction, TcfVersion,
};

/// Accumulator kind of a family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Monotonic sum
    Counter,
    /// Value that moves both ways
    Gauge,
    /// Bucketed observations
    Histogram,
}

impl MetricKind {
    /// Lowercase name, as serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

/// One named metric with its label schema
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    name: &'static str,
    help: &'static str,
    kind: MetricKind,
    dimensions: Vec<LabelDimension>,
    buckets: Vec<f64>,
    namespace: String,
    subsystem: String,
}

impl MetricFamily {
    #[allow(missing_docs)]
    pub fn counter(name: &'static str, help: &'static str, dimensions: Vec<LabelDimension>) -> Self {
        Self::new(name, help, MetricKind::Counter, dimensions, Vec::new())
    }

    #[allow(missing_docs)]
    pub fn gauge(name: &'static str, help: &'static str, dimensions: Vec<LabelDimension>) -> Self {
        Self::new(name, help, MetricKind::Gauge, dimensions, Vec::new())
    }

    #[allow(missing_docs)]
    pub fn histogram(
        name: &'static str,
        help: &'static str,
        dimensions: Vec<LabelDimension>,
        buckets: Vec<f64>,
    ) -> Self {
        Self::new(name, help, MetricKind::Histogram, dimensions, buckets)
    }

    /// Any kind, including combinations the registry will reject
    pub fn new(
        name: &'static str,
        help: &'static str,
        kind: MetricKind,
        dimensions: Vec<LabelDimension>,
        buckets: Vec<f64>,
    ) -> Self {
        Self {
            name,
            help,
            kind,
            dimensions,
            buckets,
            namespace: String::new(),
            subsystem: String::new(),
        }
    }

    /// Apply the registry-wide name prefix
    pub fn with_prefix(mut self, namespace: &str, subsystem: &str) -> Self {
        self.namespace = namespace.to_string();
        self.subsystem = subsystem.to_string();
        self
    }

    /// Base name, as used in configuration
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[allow(missing_docs)]
    pub fn help(&self) -> &'static str {
        self.help
    }

    #[allow(missing_docs)]
    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// Dimensions in declared order
    pub fn dimensions(&self) -> &[LabelDimension] {
        &self.dimensions
    }

    /// Upper bucket bounds; empty unless histogram
    pub fn buckets(&self) -> &[f64] {
        &self.buckets
    }

    #[allow(missing_docs)]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[allow(missing_docs)]
    pub fn subsystem(&self) -> &str {
        &self.subsystem
    }

    /// `{namespace}_{subsystem}_{name}`, skipping empty segments
    pub fn exported_name(&self) -> String {
        [self.namespace.as_str(), self.subsystem.as_str(), self.name]
            .iter()
            .filter(|segment| !segment.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Label keys in declared order
    pub fn label_names(&self) -> Vec<&'static str> {
        self.dimensions.iter().map(LabelDimension::name).collect()
    }

    /// Number of series the family can produce
    pub fn cardinality(&self) -> usize {
        self.dimensions.iter().map(LabelDimension::len).product()
    }

    /// Check name, dimensions and buckets
    pub fn validate(&self) -> Result<()> {
        let exported = self.exported_name();
        if !is_metric_identifier(&exported) {
            return Err(MetricsError::InvalidName(exported));
        }

        let mut seen = HashSet::new();
        for dimension in &self.dimensions {
            dimension.validate(&exported)?;
            if !seen.insert(dimension.name()) {
                return Err(MetricsError::invalid_dimension(
                    &exported,
                    dimension.name(),
                    "dimension declared twice",
                ));
            }
        }

        match self.kind {
            MetricKind::Histogram => {
                if self.buckets.is_empty() {
                    return Err(MetricsError::EmptyBuckets(exported));
                }
                if let Some(edge) = self.buckets.iter().find(|edge| !edge.is_finite()) {
                    return Err(MetricsError::invalid_buckets(
                        exported,
                        format!("non-finite edge {edge}"),
                    ));
                }
                if let Some(pair) = self.buckets.windows(2).find(|pair| pair[0] >= pair[1]) {
                    return Err(MetricsError::invalid_buckets(
                        exported,
                        format!("edges must strictly increase ({} then {})", pair[0], pair[1]),
                    ));
                }
            }
            MetricKind::Counter | MetricKind::Gauge => {
                if !self.buckets.is_empty() {
                    return Err(MetricsError::invalid_buckets(
                        exported,
                        "only histograms take buckets",
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Families the recorder knows how to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FamilyId {
    #[allow(missing_docs)]
    ActiveConnections,
    #[allow(missing_docs)]
    ConnectionErrors,
    #[allow(missing_docs)]
    ImpsRequested,
    #[allow(missing_docs)]
    LegacyImpsRequested,
    #[allow(missing_docs)]
    Requests,
    #[allow(missing_docs)]
    RequestTime,
    #[allow(missing_docs)]
    AdapterRequests,
    #[allow(missing_docs)]
    AdapterPanics,
    #[allow(missing_docs)]
    AdapterTime,
    #[allow(missing_docs)]
    AdapterPrices,
    #[allow(missing_docs)]
    AdapterBidsReceived,
    #[allow(missing_docs)]
    AdapterErrors,
    #[allow(missing_docs)]
    StoredRequestCache,
    #[allow(missing_docs)]
    StoredImpCache,
    #[allow(missing_docs)]
    CookieSyncRequests,
    #[allow(missing_docs)]
    CookieSyncReturns,
    #[allow(missing_docs)]
    SetUidCalls,
    #[allow(missing_docs)]
    PrebidCacheRequestTime,
    #[allow(missing_docs)]
    RequestQueueTime,
    #[allow(missing_docs)]
    TimeoutNotification,
    #[allow(missing_docs)]
    PrivacyTcf,
    #[allow(missing_docs)]
    AdapterConnections,
    #[allow(missing_docs)]
    AdapterConnectionWait,
    #[allow(missing_docs)]
    DnsLookupTime,
}

impl FamilyId {
    /// Number of known families
    pub const COUNT: usize = 24;

    /// Every known family in declaration order
    pub const ALL: [FamilyId; FamilyId::COUNT] = [
        FamilyId::ActiveConnections,
        FamilyId::ConnectionErrors,
        FamilyId::ImpsRequested,
        FamilyId::LegacyImpsRequested,
        FamilyId::Requests,
        FamilyId::RequestTime,
        FamilyId::AdapterRequests,
        FamilyId::AdapterPanics,
        FamilyId::AdapterTime,
        FamilyId::AdapterPrices,
        FamilyId::AdapterBidsReceived,
        FamilyId::AdapterErrors,
        FamilyId::StoredRequestCache,
        FamilyId::StoredImpCache,
        FamilyId::CookieSyncRequests,
        FamilyId::CookieSyncReturns,
        FamilyId::SetUidCalls,
        FamilyId::PrebidCacheRequestTime,
        FamilyId::RequestQueueTime,
        FamilyId::TimeoutNotification,
        FamilyId::PrivacyTcf,
        FamilyId::AdapterConnections,
        FamilyId::AdapterConnectionWait,
        FamilyId::DnsLookupTime,
    ];

    /// Base family name
    pub fn name(&self) -> &'static str {
        match self {
            FamilyId::ActiveConnections => "active_connections",
            FamilyId::ConnectionErrors => "active_connections_total",
            FamilyId::ImpsRequested => "imps_requested",
            FamilyId::LegacyImpsRequested => "legacy_imps_requested",
            FamilyId::Requests => "requests_total",
            FamilyId::RequestTime => "request_time_seconds",
            FamilyId::AdapterRequests => "adapter_requests_total",
            FamilyId::AdapterPanics => "adapter_panics_total",
            FamilyId::AdapterTime => "adapter_time_seconds",
            FamilyId::AdapterPrices => "adapter_prices",
            FamilyId::AdapterBidsReceived => "adapter_bids_received_total",
            FamilyId::AdapterErrors => "adapter_errors_total",
            FamilyId::StoredRequestCache => "stored_request_cache_performance",
            FamilyId::StoredImpCache => "stored_imp_cache_performance",
            FamilyId::CookieSyncRequests => "cookie_sync_requests_total",
            FamilyId::CookieSyncReturns => "cookie_sync_returns",
            FamilyId::SetUidCalls => "setuid_calls",
            FamilyId::PrebidCacheRequestTime => "prebid_cache_request_time_seconds",
            FamilyId::RequestQueueTime => "request_queue_time_seconds",
            FamilyId::TimeoutNotification => "timeout_notification",
            FamilyId::PrivacyTcf => "privacy_tcf",
            FamilyId::AdapterConnections => "adapter_connections_total",
            FamilyId::AdapterConnectionWait => "adapter_connection_wait_seconds",
            FamilyId::DnsLookupTime => "dns_lookup_time_seconds",
        }
    }

    /// Look up by base name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.name() == name)
    }

    /// Position in [`FamilyId::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Canonical declaration, unprefixed
    pub fn declare(&self) -> Result<MetricFamily> {
        let name = self.name();
        let family = match self {
            FamilyId::ActiveConnections => {
                MetricFamily::gauge(name, "Count of active connections.", vec![])
            }
            FamilyId::ConnectionErrors => MetricFamily::counter(
                name,
                "Count of errors while accepting or closing connections.",
                vec![LabelDimension::of::<ConnectionError>(keys::CONNECTION_ERROR)],
            ),
            FamilyId::ImpsRequested => MetricFamily::counter(
                name,
                "Count of requested impressions by media type.",
                vec![
                    LabelDimension::of::<ImpPresence>(keys::BANNER),
                    LabelDimension::of::<ImpPresence>(keys::VIDEO),
                    LabelDimension::of::<ImpPresence>(keys::AUDIO),
                    LabelDimension::of::<ImpPresence>(keys::NATIVE),
                ],
            ),
            FamilyId::LegacyImpsRequested => MetricFamily::counter(
                name,
                "Count of impressions requested through the legacy endpoint.",
                standard_dimensions(),
            ),
            FamilyId::Requests => MetricFamily::counter(
                name,
                "Count of total requests to the server.",
                standard_dimensions(),
            ),
            FamilyId::RequestTime => MetricFamily::histogram(
                name,
                "Seconds to resolve successful requests.",
                standard_dimensions(),
                latency_buckets()?,
            ),
            FamilyId::AdapterRequests => MetricFamily::counter(
                name,
                "Number of requests sent out to each bidder.",
                adapter_dimensions(),
            ),
            FamilyId::AdapterPanics => MetricFamily::counter(
                name,
                "Number of panics recovered while calling each bidder.",
                adapter_dimensions(),
            ),
            FamilyId::AdapterTime => MetricFamily::histogram(
                name,
                "Seconds taken by each bidder to respond.",
                adapter_dimensions(),
                latency_buckets()?,
            ),
            FamilyId::AdapterPrices => MetricFamily::histogram(
                name,
                "Monetary value of the bids received by each bidder.",
                adapter_dimensions(),
                price_buckets()?,
            ),
            FamilyId::AdapterBidsReceived => {
                let mut dimensions = adapter_dimensions();
                dimensions.push(LabelDimension::of::<BidType>(keys::BID_TYPE));
                dimensions.push(LabelDimension::of::<MarkupType>(keys::MARKUP_TYPE));
                MetricFamily::counter(name, "Number of bids received from each bidder.", dimensions)
            }
            FamilyId::AdapterErrors => MetricFamily::counter(
                name,
                "Number of unique error types seen in each request to a bidder.",
                vec![
                    LabelDimension::of::<DemandSource>(keys::DEMAND_SOURCE),
                    LabelDimension::of::<RequestType>(keys::REQUEST_TYPE),
                    LabelDimension::of::<Browser>(keys::BROWSER),
                    LabelDimension::of::<CookieFlag>(keys::COOKIE),
                    LabelDimension::of::<Bidder>(keys::ADAPTER),
                    LabelDimension::of::<AdapterError>(keys::ADAPTER_ERROR),
                ],
            ),
            FamilyId::StoredRequestCache => MetricFamily::counter(
                name,
                "Count of stored request cache lookups by result.",
                vec![LabelDimension::of::<CacheResult>(keys::CACHE_RESULT)],
            ),
            FamilyId::StoredImpCache => MetricFamily::counter(
                name,
                "Count of stored impression cache lookups by result.",
                vec![LabelDimension::of::<CacheResult>(keys::CACHE_RESULT)],
            ),
            FamilyId::CookieSyncRequests => {
                MetricFamily::counter(name, "Count of cookie sync requests.", vec![])
            }
            FamilyId::CookieSyncReturns => MetricFamily::counter(
                name,
                "Count of cookie syncs returned per bidder.",
                vec![
                    LabelDimension::of::<Bidder>(keys::ADAPTER),
                    LabelDimension::of::<Flag>(keys::GDPR_BLOCKED),
                ],
            ),
            FamilyId::SetUidCalls => MetricFamily::counter(
                name,
                "Count of user id sync calls by action and bidder.",
                vec![
                    LabelDimension::of::<SyncAction>(keys::ACTION),
                    LabelDimension::of::<Bidder>(keys::BIDDER),
                ],
            ),
            FamilyId::PrebidCacheRequestTime => MetricFamily::histogram(
                name,
                "Seconds to write bids to the external cache.",
                vec![LabelDimension::of::<Flag>(keys::SUCCESS)],
                latency_buckets()?,
            ),
            FamilyId::RequestQueueTime => MetricFamily::histogram(
                name,
                "Seconds requests spent waiting in the queue.",
                vec![
                    LabelDimension::of::<RequestType>(keys::REQUEST_TYPE),
                    LabelDimension::of::<QueueOutcome>(keys::REQUEST_STATUS),
                ],
                latency_buckets()?,
            ),
            FamilyId::TimeoutNotification => MetricFamily::counter(
                name,
                "Count of timeout notifications sent to bidders.",
                vec![LabelDimension::of::<NoticeOutcome>(keys::OUTCOME)],
            ),
            FamilyId::PrivacyTcf => MetricFamily::counter(
                name,
                "Count of requests carrying each consent string version.",
                vec![LabelDimension::of::<TcfVersion>(keys::VERSION)],
            ),
            FamilyId::AdapterConnections => MetricFamily::counter(
                name,
                "Count of bidder connections by reuse.",
                vec![
                    LabelDimension::of::<Bidder>(keys::ADAPTER),
                    LabelDimension::of::<ConnectionKind>(keys::CONNECTION),
                ],
            ),
            FamilyId::AdapterConnectionWait => MetricFamily::histogram(
                name,
                "Seconds spent waiting for a connection to each bidder.",
                vec![LabelDimension::of::<Bidder>(keys::ADAPTER)],
                latency_buckets()?,
            ),
            FamilyId::DnsLookupTime => MetricFamily::histogram(
                name,
                "Seconds spent resolving bidder host names.",
                vec![],
                latency_buckets()?,
            ),
        };
        Ok(family)
    }
}

fn standard_dimensions() -> Vec<LabelDimension> {
    vec![
        LabelDimension::of::<DemandSource>(keys::DEMAND_SOURCE),
        LabelDimension::of::<RequestType>(keys::REQUEST_TYPE),
        LabelDimension::of::<Browser>(keys::BROWSER),
        LabelDimension::of::<CookieFlag>(keys::COOKIE),
        LabelDimension::of::<RequestStatus>(keys::RESPONSE_STATUS),
    ]
}

fn adapter_dimensions() -> Vec<LabelDimension> {
    vec![
        LabelDimension::of::<DemandSource>(keys::DEMAND_SOURCE),
        LabelDimension::of::<RequestType>(keys::REQUEST_TYPE),
        LabelDimension::of::<Browser>(keys::BROWSER),
        LabelDimension::of::<CookieFlag>(keys::COOKIE),
        LabelDimension::of::<Bidder>(keys::ADAPTER),
        LabelDimension::of::<AdapterBid>(keys::ADAPTER_BID),
    ]
}

/// 50ms steps up to one second, then a long tail
pub fn latency_buckets() -> Result<Vec<f64>> {
    let mut buckets = prometheus::linear_buckets(0.05, 0.05, 20)?;
    buckets.extend_from_slice(&[1.5, 2.0, 3.0, 5.0, 20.0, 50.0]);
    Ok(buckets)
}

/// 10 cent steps up to 20.0 CPM
pub fn price_buckets() -> Result<Vec<f64>> {
    Ok(prometheus::linear_buckets(0.1, 0.1, 200)?)
}

/// Every known family, unprefixed
pub fn declared_families() -> Result<Vec<MetricFamily>> {
    FamilyId::ALL.iter().map(FamilyId::declare).collect()
}

/// Validated, prefixed set of families to register
#[derive(Debug, Clone)]
pub struct FamilyRegistry {
    namespace: String,
    subsystem: String,
    families: Vec<MetricFamily>,
    by_name: HashMap<&'static str, usize>,
}

impl FamilyRegistry {
    /// Every declared family minus `disabled`
    pub fn build(namespace: &str, subsystem: &str, disabled: &BTreeSet<String>) -> Result<Self> {
        Self::from_families(namespace, subsystem, declared_families()?, disabled)
    }

    /// Arbitrary families minus `disabled`.
    ///
    /// Fails on the first invalid or duplicate family; nothing is registered
    /// with any backend until this succeeds.
    pub fn from_families(
        namespace: &str,
        subsystem: &str,
        families: Vec<MetricFamily>,
        disabled: &BTreeSet<String>,
    ) -> Result<Self> {
        for name in disabled {
            if !families.iter().any(|family| family.name() == name.as_str()) {
                warn!(family = %name, "Disabled metric family is not declared");
            }
        }

        let mut kept = Vec::with_capacity(families.len());
        let mut exported = HashSet::new();
        let mut by_name = HashMap::new();

        for family in families {
            if disabled.contains(family.name()) {
                debug!(family = family.name(), "Skipping disabled metric family");
                continue;
            }

            let family = family.with_prefix(namespace, subsystem);
            family.validate()?;

            if !exported.insert(family.exported_name()) {
                return Err(MetricsError::DuplicateFamily(family.exported_name()));
            }

            by_name.insert(family.name(), kept.len());
            kept.push(family);
        }

        let registry = Self {
            namespace: namespace.to_string(),
            subsystem: subsystem.to_string(),
            families: kept,
            by_name,
        };

        info!(
            families = registry.len(),
            series = registry.total_cardinality(),
            "Metric family registry built"
        );

        Ok(registry)
    }

    /// Family by base name
    pub fn get(&self, name: &str) -> Option<&MetricFamily> {
        self.position(name).map(|index| &self.families[index])
    }

    /// Position of a family in registration order
    pub fn position(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Families in registration order
    pub fn families(&self) -> &[MetricFamily] {
        &self.families
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.families.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Series count once every family is materialized
    pub fn total_cardinality(&self) -> usize {
        self.families.iter().map(MetricFamily::cardinality).sum()
    }

    #[allow(missing_docs)]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[allow(missing_docs)]
    pub fn subsystem(&self) -> &str {
        &self.subsystem
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn none() -> BTreeSet<String> {
        BTreeSet::new()
    }

    #[test]
    fn test_exported_name_skips_empty_segments() {
        let family = MetricFamily::counter("requests_total", "h", vec![]);
        assert_eq!(family.exported_name(), "requests_total");
        assert_eq!(
            family.clone().with_prefix("pbs", "").exported_name(),
            "pbs_requests_total"
        );
        assert_eq!(
            family.with_prefix("pbs", "auction").exported_name(),
            "pbs_auction_requests_total"
        );
    }

    #[test]
    fn test_declared_families_build() {
        let registry = FamilyRegistry::build("pbs", "", &none()).unwrap();
        assert_eq!(registry.len(), FamilyId::COUNT);
        for id in FamilyId::ALL {
            assert_eq!(registry.position(id.name()), Some(id.index()));
            assert_eq!(FamilyId::from_name(id.name()), Some(id));
        }
        assert_eq!(registry.get("imps_requested").unwrap().cardinality(), 16);
    }

    #[test]
    fn test_duplicate_rejected() {
        let families = vec![
            MetricFamily::counter("dup", "a", vec![]),
            MetricFamily::gauge("dup", "b", vec![]),
        ];
        let result = FamilyRegistry::from_families("", "", families, &none());
        assert!(matches!(result, Err(MetricsError::DuplicateFamily(name)) if name == "dup"));
    }

    #[test]
    fn test_bucket_rules() {
        let empty = MetricFamily::histogram("h", "h", vec![], vec![]);
        assert!(matches!(empty.validate(), Err(MetricsError::EmptyBuckets(_))));

        let unsorted = MetricFamily::histogram("h", "h", vec![], vec![1.0, 1.0]);
        assert!(matches!(unsorted.validate(), Err(MetricsError::InvalidBuckets { .. })));

        let infinite = MetricFamily::histogram("h", "h", vec![], vec![1.0, f64::INFINITY]);
        assert!(matches!(infinite.validate(), Err(MetricsError::InvalidBuckets { .. })));

        let counter = MetricFamily::new("c", "c", MetricKind::Counter, vec![], vec![1.0]);
        assert!(matches!(counter.validate(), Err(MetricsError::InvalidBuckets { .. })));
    }

    #[test]
    fn test_dimension_rules() {
        let repeated = MetricFamily::counter(
            "c",
            "c",
            vec![
                LabelDimension::new("a", vec!["x"]),
                LabelDimension::new("a", vec!["y"]),
            ],
        );
        assert!(matches!(repeated.validate(), Err(MetricsError::InvalidDimension { .. })));

        let bad_name = MetricFamily::counter("bad-name", "c", vec![]);
        assert!(matches!(bad_name.validate(), Err(MetricsError::InvalidName(_))));
    }

    #[test]
    fn test_disabled_families_are_dropped() {
        let disabled: BTreeSet<String> = ["adapter_prices", "not_a_family"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let registry = FamilyRegistry::build("", "", &disabled).unwrap();
        assert_eq!(registry.len(), FamilyId::COUNT - 1);
        assert!(registry.get("adapter_prices").is_none());
        assert!(registry.get("adapter_time_seconds").is_some());
    }

    #[test]
    fn test_bucket_contracts() {
        let latency = latency_buckets().unwrap();
        assert_eq!(latency.len(), 26);
        assert!((latency[0] - 0.05).abs() < 1e-9);
        assert!((latency[19] - 1.0).abs() < 1e-9);
        assert_eq!(&latency[20..], &[1.5, 2.0, 3.0, 5.0, 20.0, 50.0]);

        let price = price_buckets().unwrap();
        assert_eq!(price.len(), 200);
        assert!((price[0] - 0.1).abs() < 1e-9);
        assert!((price[199] - 20.0).abs() < 1e-9);
    }
}
