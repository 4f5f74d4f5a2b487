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
//! Construction-time errors.
//!
//! Every variant is raised while the registry, backends or engine are being
//! built. Recording has no error channel.

use thiserror::Error;

/// Fatal configuration and registration errors
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Two families share an exported name
    #[error("Duplicate metric family: {0}")]
    DuplicateFamily(String),

    /// Histogram declared without bucket edges
    #[error("Histogram '{0}' declares no buckets")]
    EmptyBuckets(String),

    /// Bucket edges unsorted, non-finite, or declared on a non-histogram
    #[error("Family '{family}' has invalid buckets: {reason}")]
    InvalidBuckets {
        /// Exported family name
        family: String,
        /// What is wrong with the edges
        reason: String,
    },

    /// Empty domain, repeated value, or repeated dimension name
    #[error("Family '{family}' has invalid label dimension '{dimension}': {reason}")]
    InvalidDimension {
        /// Exported family name
        family: String,
        /// Dimension name
        dimension: String,
        /// What is wrong with the dimension
        reason: String,
    },

    /// Exported name or label key outside the metric name grammar
    #[error("Invalid metric identifier: {0}")]
    InvalidName(String),

    /// A known family was registered with dimensions its recorder cannot resolve
    #[error("Family '{family}' does not match its declared schema: {reason}")]
    SchemaMismatch {
        /// Exported family name
        family: String,
        /// Expected vs. found
        reason: String,
    },

    /// `touch` called for a family the backend never registered
    #[error("Family '{0}' was not registered with the backend")]
    UnregisteredFamily(String),

    /// Error from the prometheus client
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] bidgate_config::ConfigError),
}

impl MetricsError {
    pub(crate) fn invalid_dimension(
        family: impl Into<String>,
        dimension: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        MetricsError::InvalidDimension {
            family: family.into(),
            dimension: dimension.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_buckets(family: impl Into<String>, reason: impl Into<String>) -> Self {
        MetricsError::InvalidBuckets {
            family: family.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for construction-time operations
pub type Result<T> = std::result::Result<T, MetricsError>;
