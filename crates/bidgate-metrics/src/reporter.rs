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
//! Periodic push of in-memory series

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::backend::{MemoryBackend, Snapshot};

/// Destination of pushed snapshots
#[async_trait]
pub trait PushSink: Send + Sync {
    /// Deliver one snapshot. Errors are logged and the next tick retries.
    async fn push(&self, snapshot: &Snapshot) -> anyhow::Result<()>;
}

/// Sink that writes a summary of each snapshot to the log
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    database: String,
}

impl TracingSink {
    /// Sink labelled with the target database name
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
        }
    }
}

#[async_trait]
impl PushSink for TracingSink {
    async fn push(&self, snapshot: &Snapshot) -> anyhow::Result<()> {
        let active = snapshot
            .series
            .iter()
            .filter(|series| series.value != 0.0 || series.count != 0)
            .count();
        info!(
            database = %self.database,
            taken_at = %snapshot.taken_at,
            series = snapshot.series.len(),
            active,
            "Metrics snapshot"
        );
        Ok(())
    }
}

/// Pushes a [`MemoryBackend`] snapshot on a fixed interval
pub struct PushReporter {
    backend: MemoryBackend,
    sink: Arc<dyn PushSink>,
    interval: Duration,
}

impl PushReporter {
    #[allow(missing_docs)]
    pub fn new(backend: MemoryBackend, sink: Arc<dyn PushSink>, interval: Duration) -> Self {
        Self {
            backend,
            sink,
            interval,
        }
    }

    /// Run on the current tokio runtime until the handle is aborted
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Push forever; the first push happens one interval after start
    pub async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "Starting metrics push reporter");

        let mut ticker = time::interval_at(time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = self.push_once().await {
                warn!("Metrics push failed: {:#}", e);
            }
        }
    }

    /// Take one snapshot and hand it to the sink
    pub async fn push_once(&self) -> anyhow::Result<()> {
        let snapshot = self.backend.snapshot();
        debug!(series = snapshot.series.len(), "Pushing metrics snapshot");
        self.sink.push(&snapshot).await
    }
}
