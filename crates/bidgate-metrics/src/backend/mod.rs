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
//! Metrics backends
//!
//! A backend owns the accumulators. It sees families once at startup
//! (`register`, then `touch` for every label assignment) and afterwards only
//! receives mutations on the handles it handed out.

pub mod memory;
pub mod prometheus;

pub use self::memory::{MemoryBackend, MemorySeries, SeriesSnapshot, Snapshot};
pub use self::prometheus::{PrometheusBackend, PromSeries};

use crate::cartesian::LabelAssignment;
use crate::error::Result;
use crate::family::MetricFamily;

/// Storage for labeled time series
pub trait SeriesBackend: Send + Sync + 'static {
    /// Handle to one pre-materialized series
    type Series: Send + Sync;

    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Declare a family. Called once per family, before any `touch`.
    fn register(&mut self, family: &MetricFamily) -> Result<()>;

    /// Create (or fetch) the series for one assignment
    fn touch(&self, family: &MetricFamily, labels: &LabelAssignment) -> Result<Self::Series>;

    /// Add to a counter
    fn increment(&self, series: &Self::Series, delta: f64);

    /// Record one histogram observation
    fn observe(&self, series: &Self::Series, value: f64);

    /// Move a gauge by `delta` (either sign)
    fn adjust_gauge(&self, series: &Self::Series, delta: f64);
}
