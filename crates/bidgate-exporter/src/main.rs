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
//! Standalone exporter: loads the metrics config, builds the configured
//! backends and serves them until interrupted.

use anyhow::{Context, Result};
use bidgate_config::{Config, ConfigLoader};
use bidgate_metrics::{FamilyRegistry, MetricsEngine, MetricsServer, PushReporter, TracingSink};
use bidgate_observability::{init_tracing_with_config, LogFormat};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "bidgate-exporter")]
#[command(version, about = "Serve the bidgate auction metric families")]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log format (pretty|compact|json)
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<LogFormat>,

    /// Log filter directive, e.g. "info" or "bidgate_metrics=debug"
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,

    /// Print the families that would be registered and exit
    #[arg(long)]
    list_families: bool,
}

async fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let loader = ConfigLoader::new();
    match path {
        Some(path) => loader
            .load_with_overrides(path)
            .await
            .with_context(|| format!("Failed to load {}", path.display())),
        None => {
            let mut config = Config::default();
            loader.apply_env_overrides(&mut config)?;
            Ok(config)
        }
    }
}

fn list_families(config: &Config) -> Result<()> {
    let metrics = &config.metrics;
    let registry =
        FamilyRegistry::build(&metrics.namespace, &metrics.subsystem, &metrics.disabled_families)?;

    for family in registry.families() {
        println!(
            "{:<52} {:<10} {:>8}",
            family.exported_name(),
            family.kind().as_str(),
            family.cardinality()
        );
    }
    println!(
        "{} families, {} series",
        registry.len(),
        registry.total_cardinality()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_ref()).await?;
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = Some(level);
    }

    if cli.list_families {
        return list_families(&config);
    }

    init_tracing_with_config(&config.logging)?;

    let handles = MetricsEngine::from_config(&config.metrics)?;
    info!(
        backends = handles.engine.backend_count(),
        "bidgate exporter starting"
    );

    let reporter = handles.memory.map(|metrics| {
        let influx = &config.metrics.influxdb;
        PushReporter::new(
            metrics.backend().clone(),
            Arc::new(TracingSink::new(influx.database.clone())),
            influx.send_interval(),
        )
        .spawn()
    });

    match handles.prometheus {
        Some(metrics) => {
            let server = MetricsServer::new(metrics, config.metrics.prometheus.clone());
            tokio::select! {
                result = server.serve() => result?,
                _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
            }
        }
        None => {
            tokio::signal::ctrl_c().await?;
            info!("Interrupted, shutting down");
        }
    }

    if let Some(reporter) = reporter {
        reporter.abort();
    }

    Ok(())
}
