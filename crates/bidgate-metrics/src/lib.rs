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
//! Metrics instrumentation for the bidgate auction server
//!
//! Every label is a closed enum, so the full label space of every family is
//! known at startup. [`Metrics`] creates every series before traffic arrives,
//! which leaves only an atomic update on the recording path.
//!
//! - Label domains ([`labels`])
//! - Family declarations and the validated registry ([`family`])
//! - Cartesian pre-materialization ([`cartesian`])
//! - Recording interface ([`MetricsRecorder`]) and its per-backend
//!   implementation ([`Metrics`])
//! - Backend-count dispatch ([`MetricsEngine`])
//! - Prometheus scrape endpoint ([`MetricsServer`]) and push reporting
//!   ([`PushReporter`])
//!
//! # Example
//!
//! ```ignore
//! use bidgate_metrics::{MetricsEngine, MetricsRecorder, MetricsServer, Labels};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = bidgate_config::MetricsConfig::default();
//!     let handles = MetricsEngine::from_config(&config)?;
//!
//!     if let Some(metrics) = handles.prometheus {
//!         let server = MetricsServer::new(metrics, config.prometheus.clone());
//!         tokio::spawn(async move { server.serve().await });
//!     }
//!
//!     handles.engine.record_request(&Labels::default());
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod cartesian;
pub mod engine;
pub mod error;
pub mod family;
pub mod labels;
pub mod recorder;
pub mod reporter;
pub mod server;
pub mod types;

pub use backend::{MemoryBackend, PrometheusBackend, SeriesBackend, Snapshot};
pub use cartesian::{cartesian, LabelAssignment, Materializer};
pub use engine::{EngineHandles, MetricsEngine, Sink};
pub use error::{MetricsError, Result};
pub use family::{FamilyId, FamilyRegistry, MetricFamily, MetricKind};
pub use labels::LabelDimension;
pub use recorder::{Metrics, MetricsRecorder};
pub use reporter::{PushReporter, PushSink, TracingSink};
pub use server::MetricsServer;
pub use types::{AdapterErrorSet, AdapterLabels, ImpLabels, Labels, UserLabels};

// Re-export prometheus types for convenience
pub use prometheus::{Encoder, TextEncoder};
