//! Neighborhood-size values and their resolution against the dataset catalog
//!
//! ## Notation
//!
//! | Axis value | Meaning | Resolved size |
//! |------------|---------|---------------|
//! | `k1pni`    | 1% of the number of instances | `floor(instances / 100)` |
//! | `k5pni`    | 5% of the number of instances | `floor(5 * instances / 100)` |
//! | `kna`      | number of input attributes | `attributes` |
//! | `5`, `k5`  | literal | `5` |
//!
//! Every resolved size is clamped to at least 1.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::dataset::DatasetCatalog;
use crate::{Error, Result};

/// A (possibly symbolic) neighborhood size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborhoodSize {
    /// A literal number of neighbors.
    Fixed(u64),
    /// A percentage of the dataset's instance count.
    PercentOfInstances(u64),
    /// The dataset's number of input attributes.
    Attributes,
}

impl NeighborhoodSize {
    /// True if resolving this size needs a catalog entry.
    #[must_use]
    pub const fn needs_lookup(self) -> bool {
        !matches!(self, Self::Fixed(_))
    }

    /// Resolve against the catalog entry of `dataset`.
    ///
    /// Integer arithmetic is used for percentages so that
    /// `k1pni` over 1503 instances gives exactly 15.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Lookup`] if the size is symbolic and `dataset` is not
    /// in the catalog.
    pub fn resolve(self, dataset: &str, catalog: &DatasetCatalog) -> Result<u64> {
        let size = match self {
            Self::Fixed(n) => n,
            Self::PercentOfInstances(percent) => {
                let info = catalog.lookup(dataset, &self.to_string())?;
                info.instances().saturating_mul(percent) / 100
            }
            Self::Attributes => catalog.lookup(dataset, &self.to_string())?.attributes(),
        };
        Ok(size.max(1))
    }
}

impl FromStr for NeighborhoodSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            Error::Config(format!(
                "'{s}' is not a neighborhood size (expected kna, k<p>pni, k<n> or <n>)"
            ))
        };
        if s == "kna" {
            return Ok(Self::Attributes);
        }
        let body = s.strip_prefix('k').unwrap_or(s);
        if let Some(percent) = body.strip_suffix("pni") {
            return percent
                .parse()
                .map(Self::PercentOfInstances)
                .map_err(|_| invalid());
        }
        body.parse().map(Self::Fixed).map_err(|_| invalid())
    }
}

impl fmt::Display for NeighborhoodSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "{n}"),
            Self::PercentOfInstances(p) => write!(f, "k{p}pni"),
            Self::Attributes => f.write_str("kna"),
        }
    }
}

/// Which axes carry the neighborhood size and the dataset it is resolved against.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NeighborhoodBinding {
    /// Axis whose values are neighborhood sizes
    pub axis: String,
    /// Axis whose value names the dataset
    #[serde(default = "default_dataset_axis")]
    pub dataset_axis: String,
    /// Replace the axis label in identifiers with the resolved size
    #[serde(default)]
    pub in_identifier: bool,
    /// Prefix for the resolved size inside identifiers
    #[serde(default = "default_identifier_prefix")]
    pub identifier_prefix: String,
    /// Record key that receives the resolved size
    #[serde(default)]
    pub key: Option<String>,
}

fn default_dataset_axis() -> String {
    "dataset".to_string()
}

fn default_identifier_prefix() -> String {
    "k".to_string()
}

impl NeighborhoodBinding {
    /// Bind the sizes on `axis` to datasets named on the `dataset` axis.
    #[must_use]
    pub fn new(axis: impl Into<String>) -> Self {
        Self {
            axis: axis.into(),
            dataset_axis: default_dataset_axis(),
            in_identifier: false,
            identifier_prefix: default_identifier_prefix(),
            key: None,
        }
    }

    /// Use a different dataset axis.
    #[must_use]
    pub fn dataset_axis(mut self, axis: impl Into<String>) -> Self {
        self.dataset_axis = axis.into();
        self
    }

    /// Put the resolved size into the identifier.
    #[must_use]
    pub const fn in_identifier(mut self, enabled: bool) -> Self {
        self.in_identifier = enabled;
        self
    }

    /// Write the resolved size into each record under `key`.
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}
