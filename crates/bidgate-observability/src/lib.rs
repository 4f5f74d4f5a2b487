//! Bidgate Observability
//!
//! Structured logging for the bidgate metrics core and its exporter.
//!
//! - Pretty, compact and JSON output
//! - `RUST_LOG`-style filter directives
//! - Deserializable [`LogConfig`] so logging lives in the same config file
//!
//! # Example
//!
//! ```ignore
//! use bidgate_observability::{init_tracing, LogFormat};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_tracing(LogFormat::Json, None)?;
//!     tracing::info!("metrics exporter started");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod initialization;

pub use config::{LogConfig, LogError, LogFormat, LogOutput};
pub use initialization::{build_env_filter, init_tracing, init_tracing_with_config};
