//! Dataset catalog - immutable per-dataset instance/attribute counts

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{Dataset, FoldSet};
use crate::{Error, Result};

/// Size information for one dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetInfo {
    instances: u64,
    attributes: u64,
}

impl DatasetInfo {
    /// Create a new entry.
    #[must_use]
    pub const fn new(instances: u64, attributes: u64) -> Self {
        Self {
            instances,
            attributes,
        }
    }

    /// Number of instances (rows).
    #[must_use]
    pub const fn instances(&self) -> u64 {
        self.instances
    }

    /// Number of input attributes (columns, target excluded).
    #[must_use]
    pub const fn attributes(&self) -> u64 {
        self.attributes
    }
}

/// Lookup table from dataset name to [`DatasetInfo`].
///
/// The catalog is built once and then only read; the generator receives it
/// as an explicit dependency so tests can substitute fixtures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetCatalog {
    entries: BTreeMap<String, DatasetInfo>,
}

impl DatasetCatalog {
    /// Build a catalog from `(name, info)` pairs.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, DatasetInfo)>,
        S: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(name, info)| (name.into(), info))
                .collect(),
        }
    }

    /// Build a catalog by reading the first training fold
    /// (`<name>-train-0.csv`) of every dataset in `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Filesystem`] if the directory cannot be listed and
    /// a dataset error if a fold cannot be parsed.
    pub fn scan_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let listing = std::fs::read_dir(dir).map_err(|e| Error::filesystem(dir, e))?;

        let mut names = Vec::new();
        for entry in listing {
            let entry = entry.map_err(|e| Error::filesystem(dir, e))?;
            let file_name = entry.file_name();
            if let Some(name) = file_name
                .to_str()
                .and_then(|f| f.strip_suffix(&FoldSet::fold_file_name("", "train", 0)))
            {
                names.push(name.to_string());
            }
        }

        let mut entries = BTreeMap::new();
        for name in names {
            let path = dir.join(FoldSet::fold_file_name(&name, "train", 0));
            let dataset = Dataset::load_csv(&path)?;
            tracing::debug!(
                dataset = %name,
                instances = dataset.num_instances(),
                attributes = dataset.num_attributes(),
                "Cataloged dataset"
            );
            entries.insert(
                name,
                DatasetInfo::new(dataset.num_instances() as u64, dataset.num_attributes() as u64),
            );
        }
        Ok(Self { entries })
    }

    /// Get the entry for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DatasetInfo> {
        self.entries.get(name)
    }

    /// Get the entry for `name`, failing with a lookup error naming `what`
    /// was being resolved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Lookup`] if `name` is not cataloged.
    pub fn lookup(&self, name: &str, what: &str) -> Result<&DatasetInfo> {
        self.get(name).ok_or_else(|| Error::Lookup {
            dataset: name.to_string(),
            what: what.to_string(),
        })
    }

    /// Number of datasets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DatasetInfo)> {
        self.entries.iter().map(|(name, info)| (name.as_str(), info))
    }

    /// Merge `other` into this catalog; entries in `other` win.
    pub fn extend(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    /// Render the catalog as a `[datasets]` table for a grid file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Other`] if TOML serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        #[derive(Serialize)]
        struct Wrapper<'a> {
            datasets: &'a DatasetCatalog,
        }
        toml::to_string(&Wrapper { datasets: self })
            .map_err(|e| Error::Other(format!("cannot render catalog: {e}")))
    }
}
