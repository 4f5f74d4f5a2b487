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
use crate::schema::Config;
use crate::validation::Validator;
use bidgate_observability::LogFormat;
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::{debug, info};

/// Prefix for every environment override
pub const ENV_PREFIX: &str = "BIDGATE_";

/// Configuration format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => Err(ConfigError::InvalidPath(path.to_path_buf())),
        }
    }

    /// Get format name as string
    pub fn name(&self) -> &'static str {
        match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Yaml => "YAML",
            ConfigFormat::Json => "JSON",
        }
    }
}

/// Configuration loader
pub struct ConfigLoader {
    validate: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        ConfigLoader { validate: true }
    }

    /// Create a loader without validation
    pub fn without_validation() -> Self {
        ConfigLoader { validate: false }
    }

    /// Load configuration from a file
    pub async fn load_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<Config> {
        let path = path.as_ref();
        debug!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let format = ConfigFormat::from_path(path)?;
        let content = fs::read_to_string(path).await?;

        info!(
            "Loaded {} configuration file: {}",
            format.name(),
            path.display()
        );

        self.load_from_string(&content, format)
    }

    /// Load configuration from a string
    pub fn load_from_string(&self, content: &str, format: ConfigFormat) -> ConfigResult<Config> {
        let config: Config = match format {
            ConfigFormat::Toml => toml::from_str(content)?,
            ConfigFormat::Yaml => serde_yaml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
        };

        if self.validate {
            config.validate()?;
            debug!("Configuration validated successfully");
        }

        Ok(config)
    }

    /// Load a file, then apply `BIDGATE_*` environment overrides
    pub async fn load_with_overrides<P: AsRef<Path>>(&self, path: P) -> ConfigResult<Config> {
        let mut config = self.load_file(path).await?;
        self.apply_env_overrides(&mut config)?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&self, config: &mut Config) -> ConfigResult<()> {
        self.apply_overrides_from(config, |key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup.
    ///
    /// `lookup` receives the full variable name (including [`ENV_PREFIX`]).
    pub fn apply_overrides_from<F>(&self, config: &mut Config, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| {
            let key = format!("{ENV_PREFIX}{suffix}");
            lookup(&key).map(|value| (key, value))
        };

        let metrics = &mut config.metrics;

        if let Some((key, value)) = var("PROMETHEUS_PORT") {
            metrics.prometheus.port = value.parse().map_err(|_| {
                ConfigError::env_var_parsing_error(key, &value, "expected port number (0-65535)")
            })?;
        }
        if let Some((_, value)) = var("PROMETHEUS_BIND_ADDRESS") {
            metrics.prometheus.bind_address = value;
        }
        if let Some((_, value)) = var("METRICS_NAMESPACE") {
            metrics.namespace = value;
        }
        if let Some((_, value)) = var("METRICS_SUBSYSTEM") {
            metrics.subsystem = value;
        }

        if let Some((_, value)) = var("INFLUXDB_HOST") {
            metrics.influxdb.host = value;
        }
        if let Some((_, value)) = var("INFLUXDB_DATABASE") {
            metrics.influxdb.database = value;
        }
        if let Some((_, value)) = var("INFLUXDB_USERNAME") {
            metrics.influxdb.username = value;
        }
        if let Some((_, value)) = var("INFLUXDB_PASSWORD") {
            metrics.influxdb.password = value;
        }
        if let Some((key, value)) = var("INFLUXDB_SEND_INTERVAL") {
            metrics.influxdb.metric_send_interval_secs = value.parse().map_err(|_| {
                ConfigError::env_var_parsing_error(key, &value, "expected whole seconds")
            })?;
        }

        // Comma separated; replaces the file's list
        if let Some((_, value)) = var("DISABLED_FAMILIES") {
            metrics.disabled_families = value
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some((_, value)) = var("LOG_LEVEL") {
            config.logging.level = Some(value);
        }
        if let Some((key, value)) = var("LOG_FORMAT") {
            config.logging.format = LogFormat::from_str(&value)
                .map_err(|e| ConfigError::env_var_parsing_error(key, &value, e.to_string()))?;
        }

        if self.validate {
            config.validate()?;
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_format_detection() {
        assert_eq!(ConfigFormat::from_path("metrics.toml").unwrap(), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path("metrics.yaml").unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path("metrics.yml").unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path("metrics.json").unwrap(), ConfigFormat::Json);
    }

    #[test]
    fn test_format_detection_error() {
        assert!(matches!(
            ConfigFormat::from_path("metrics.ini"),
            Err(ConfigError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            ConfigFormat::from_path("metrics"),
            Err(ConfigError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_load_toml() {
        let content = r#"
            [metrics]
            namespace = "bidgate"
            subsystem = "auction"
            disabled_families = ["adapter_prices"]

            [metrics.prometheus]
            port = 9100
        "#;

        let config = ConfigLoader::new()
            .load_from_string(content, ConfigFormat::Toml)
            .unwrap();
        assert_eq!(config.metrics.prometheus.port, 9100);
        assert_eq!(config.metrics.prometheus.bind_address, "0.0.0.0");
        assert_eq!(config.metrics.namespace, "bidgate");
        assert!(config.metrics.disabled_families.contains("adapter_prices"));
        assert!(!config.metrics.influxdb.is_enabled());
    }

    #[test]
    fn test_load_yaml_and_json_agree() {
        let yaml = "metrics:\n  influxdb:\n    host: http://influx:8086\n    database: pbs\n";
        let json = r#"{"metrics":{"influxdb":{"host":"http://influx:8086","database":"pbs"}}}"#;

        let loader = ConfigLoader::new();
        let from_yaml = loader.load_from_string(yaml, ConfigFormat::Yaml).unwrap();
        let from_json = loader.load_from_string(json, ConfigFormat::Json).unwrap();
        assert_eq!(from_yaml, from_json);
        assert_eq!(from_yaml.metrics.influxdb.metric_send_interval_secs, 20);
    }

    #[test]
    fn test_validation_applied_on_load() {
        let content = "[metrics]\nnamespace = \"9bad\"\n";
        assert!(ConfigLoader::new()
            .load_from_string(content, ConfigFormat::Toml)
            .is_err());
        assert!(ConfigLoader::without_validation()
            .load_from_string(content, ConfigFormat::Toml)
            .is_ok());
    }

    #[test]
    fn test_overrides_from_lookup() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("BIDGATE_PROMETHEUS_PORT", "9200"),
            ("BIDGATE_METRICS_NAMESPACE", "pbs"),
            ("BIDGATE_DISABLED_FAMILIES", "adapter_prices, setuid_calls,,"),
            ("BIDGATE_LOG_FORMAT", "json"),
        ]);

        let mut config = Config::default();
        ConfigLoader::new()
            .apply_overrides_from(&mut config, |key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.metrics.prometheus.port, 9200);
        assert_eq!(config.metrics.namespace, "pbs");
        assert_eq!(config.metrics.disabled_families.len(), 2);
        assert!(config.metrics.disabled_families.contains("setuid_calls"));
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_bad_override_reports_variable() {
        let mut config = Config::default();
        let result = ConfigLoader::new().apply_overrides_from(&mut config, |key| {
            (key == "BIDGATE_PROMETHEUS_PORT").then(|| "ninety".to_string())
        });

        match result {
            Err(ConfigError::EnvVarParsingError { variable_name, .. }) => {
                assert_eq!(variable_name, "BIDGATE_PROMETHEUS_PORT");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
