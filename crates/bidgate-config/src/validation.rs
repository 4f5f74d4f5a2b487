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
use crate::error::{ConfigError, ConfigResult};
use crate::schema::*;

/// Validator for configuration settings
pub trait Validator {
    fn validate(&self) -> ConfigResult<()>;
}

impl Validator for Config {
    fn validate(&self) -> ConfigResult<()> {
        self.metrics.validate()
    }
}

impl Validator for MetricsConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.prometheus.validate()?;
        self.influxdb.validate()?;

        if !self.namespace.is_empty() && !is_metric_identifier(&self.namespace) {
            return Err(ConfigError::invalid_value(
                "metrics.namespace",
                format!("must match [a-zA-Z_:][a-zA-Z0-9_:]*, got '{}'", self.namespace),
            ));
        }

        if !self.subsystem.is_empty() && !is_metric_identifier(&self.subsystem) {
            return Err(ConfigError::invalid_value(
                "metrics.subsystem",
                format!("must match [a-zA-Z_:][a-zA-Z0-9_:]*, got '{}'", self.subsystem),
            ));
        }

        if self.disabled_families.iter().any(|name| name.trim().is_empty()) {
            return Err(ConfigError::invalid_value(
                "metrics.disabled_families",
                "family names must not be empty",
            ));
        }

        Ok(())
    }
}

impl Validator for PrometheusConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.is_enabled() && self.bind_address.is_empty() {
            return Err(ConfigError::MissingRequired(
                "metrics.prometheus.bind_address".to_string(),
            ));
        }

        Ok(())
    }
}

impl Validator for InfluxConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        if self.database.is_empty() {
            return Err(ConfigError::MissingRequired(
                "metrics.influxdb.database".to_string(),
            ));
        }

        if self.metric_send_interval_secs == 0 {
            return Err(ConfigError::invalid_value(
                "metrics.influxdb.metric_send_interval_secs",
                "push interval must be at least one second",
            ));
        }

        Ok(())
    }
}

/// Prometheus metric name grammar
pub fn is_metric_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_metric_identifier() {
        assert!(is_metric_identifier("bidgate"));
        assert!(is_metric_identifier("_auction:v2"));
        assert!(!is_metric_identifier("2fast"));
        assert!(!is_metric_identifier("has-dash"));
        assert!(!is_metric_identifier(""));
    }

    #[test]
    fn test_invalid_namespace_rejected() {
        let mut config = MetricsConfig::default();
        config.namespace = "bid-gate".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "metrics.namespace"
        ));
    }

    #[test]
    fn test_influx_requires_database_and_interval() {
        let mut config = MetricsConfig::default();
        config.influxdb.host = "http://localhost:8086".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::MissingRequired(_))));

        config.influxdb.database = "bidgate".to_string();
        config.influxdb.metric_send_interval_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));

        config.influxdb.metric_send_interval_secs = 10;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_disabled_family_rejected() {
        let mut config = MetricsConfig::default();
        config.disabled_families.insert("  ".to_string());
        assert!(config.validate().is_err());
    }
}
