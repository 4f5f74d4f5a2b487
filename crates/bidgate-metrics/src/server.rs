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
//! HTTP server for the Prometheus scrape endpoint
//!
//! Provides an Axum-based HTTP server that exposes `/metrics` in the
//! Prometheus text exposition format, plus a `/health` probe.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use bidgate_config::PrometheusConfig;
use prometheus::{Encoder, TextEncoder};
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::backend::PrometheusBackend;
use crate::recorder::Metrics;

/// HTTP server for Prometheus metrics
#[derive(Clone)]
pub struct MetricsServer {
    metrics: Metrics<PrometheusBackend>,
    config: PrometheusConfig,
}

impl MetricsServer {
    /// Create a server for `metrics` on the configured address
    pub fn new(metrics: Metrics<PrometheusBackend>, config: PrometheusConfig) -> Self {
        Self { metrics, config }
    }

    /// Get the bind address for the server
    pub fn bind_address(&self) -> String {
        self.config.socket_addr()
    }

    /// Bind the configured address and serve until the task is dropped.
    ///
    /// Returns immediately when the port is 0.
    ///
    /// # Example
    /// ```ignore
    /// let server = MetricsServer::new(metrics, config.prometheus.clone());
    /// tokio::spawn(async move {
    ///     server.serve().await
    /// });
    /// ```
    pub async fn serve(self) -> anyhow::Result<()> {
        if !self.config.is_enabled() {
            info!("Metrics server disabled");
            return Ok(());
        }

        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(&addr).await?;
        self.serve_on(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve_on(self, listener: TcpListener) -> anyhow::Result<()> {
        let addr = listener.local_addr()?;
        info!("Metrics server listening on http://{}/metrics", addr);

        let app = Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .with_state(self.metrics);

        axum::serve(listener, app)
            .await
            .map_err(|e| anyhow::anyhow!("Metrics server error: {}", e))
    }
}

/// Handler for `/metrics`
async fn metrics_handler(State(metrics): State<Metrics<PrometheusBackend>>) -> Response {
    let metric_families = metrics.backend().registry().gather();

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => {
            debug!("Encoded {} metric families", metric_families.len());
            (
                StatusCode::OK,
                [("content-type", encoder.format_type().to_string())],
                buffer,
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
                .into_response()
        }
    }
}

/// Handler for `/health`
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::family::FamilyRegistry;
    use crate::labels::{Bidder, CacheResult};
    use crate::recorder::MetricsRecorder;
    use std::collections::BTreeSet;
    use std::net::SocketAddr;

    fn metrics() -> Metrics<PrometheusBackend> {
        let registry = FamilyRegistry::build("pbs", "", &BTreeSet::new()).unwrap();
        Metrics::new(&registry, PrometheusBackend::new()).unwrap()
    }

    async fn spawn(server: MetricsServer) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = server.serve_on(listener).await;
        });
        addr
    }

    #[test]
    fn test_bind_address() {
        let config = PrometheusConfig {
            port: 9191,
            bind_address: "127.0.0.1".to_string(),
        };
        let server = MetricsServer::new(metrics(), config);
        assert_eq!(server.bind_address(), "127.0.0.1:9191");
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let metrics = metrics();
        metrics.record_stored_req_cache_result(CacheResult::Hit, 4);
        metrics.record_adapter_cookie_sync(Bidder::Openx, true);

        let addr = spawn(MetricsServer::new(metrics, PrometheusConfig::default())).await;

        let response = reqwest::get(format!("http://{}/metrics", addr)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.text().await.unwrap();
        assert!(body.contains("pbs_stored_request_cache_performance{cache_result=\"hit\"} 4"));
        assert!(body.contains("pbs_stored_request_cache_performance{cache_result=\"miss\"} 0"));
        assert!(body.contains("pbs_cookie_sync_returns{adapter=\"openx\",gdpr_blocked=\"true\"} 1"));
        assert!(body.contains("pbs_request_time_seconds_bucket"));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let addr = spawn(MetricsServer::new(metrics(), PrometheusConfig::default())).await;

        let response = reqwest::get(format!("http://{}/health", addr)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "OK");
    }

    #[tokio::test]
    async fn test_disabled_server() {
        let server = MetricsServer::new(metrics(), PrometheusConfig::default());

        // Port 0 in configuration means disabled
        let result = server.serve().await;
        assert!(result.is_ok());
    }
}
