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
use bidgate_observability::LogConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Top-level configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Metrics backends and family selection
    pub metrics: MetricsConfig,

    /// Logging output
    pub logging: LogConfig,
}

/// Metrics configuration
///
/// A backend is active iff its connection parameters are present:
/// Prometheus when `port != 0`, InfluxDB when `host` is non-empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    /// Pull backend
    pub prometheus: PrometheusConfig,

    /// Push backend
    pub influxdb: InfluxConfig,

    /// Metric name namespace prefix, shared by every backend
    pub namespace: String,

    /// Metric name subsystem prefix, shared by every backend
    pub subsystem: String,

    /// Family names that are never registered
    pub disabled_families: BTreeSet<String>,
}

impl MetricsConfig {
    /// Number of backends that will be built from this configuration
    pub fn active_backends(&self) -> usize {
        usize::from(self.influxdb.is_enabled()) + usize::from(self.prometheus.is_enabled())
    }
}

/// Prometheus scrape endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrometheusConfig {
    /// Listen port; 0 disables the backend
    #[serde(default)]
    pub port: u16,

    /// Listen address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            port: 0,
            bind_address: default_bind_address(),
        }
    }
}

impl PrometheusConfig {
    /// Whether the Prometheus backend should be built
    pub fn is_enabled(&self) -> bool {
        self.port != 0
    }

    /// Bind address with port
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// InfluxDB push configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InfluxConfig {
    /// Endpoint URL; empty disables the backend
    #[serde(default)]
    pub host: String,

    /// Target database
    #[serde(default)]
    pub database: String,

    /// Credentials
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Seconds between pushes
    #[serde(default = "default_send_interval")]
    pub metric_send_interval_secs: u64,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            database: String::new(),
            username: String::new(),
            password: String::new(),
            metric_send_interval_secs: default_send_interval(),
        }
    }
}

impl InfluxConfig {
    /// Whether the push backend should be built
    pub fn is_enabled(&self) -> bool {
        !self.host.is_empty()
    }

    /// Push interval as a [`Duration`]
    pub fn send_interval(&self) -> Duration {
        Duration::from_secs(self.metric_send_interval_secs)
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_send_interval() -> u64 {
    20
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_no_backends() {
        let config = MetricsConfig::default();
        assert!(!config.prometheus.is_enabled());
        assert!(!config.influxdb.is_enabled());
        assert_eq!(config.active_backends(), 0);
        assert_eq!(config.influxdb.send_interval(), Duration::from_secs(20));
    }

    #[test]
    fn test_backend_activation() {
        let mut config = MetricsConfig::default();
        config.prometheus.port = 9100;
        assert_eq!(config.active_backends(), 1);
        assert_eq!(config.prometheus.socket_addr(), "0.0.0.0:9100");

        config.influxdb.host = "http://influx:8086".to_string();
        assert_eq!(config.active_backends(), 2);
    }
}
