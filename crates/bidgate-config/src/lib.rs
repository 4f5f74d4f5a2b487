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
//! Configuration for the bidgate metrics core
//!
//! Loads the metrics backend settings (Prometheus scrape endpoint, InfluxDB
//! push target), the namespace/subsystem prefixes, the set of disabled
//! families and the logging setup.
//!
//! - TOML, YAML and JSON files
//! - `BIDGATE_*` environment overrides
//! - Validation before anything is built from the config
//!
//! # Example
//!
//! ```no_run
//! use bidgate_config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new().load_with_overrides("bidgate.toml").await?;
//!     println!("active metrics backends: {}", config.metrics.active_backends());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigFormat, ConfigLoader, ENV_PREFIX};
pub use schema::*;
pub use validation::{is_metric_identifier, Validator};
