//! Grid files: a TOML description of one generation run
//!
//! ```toml
//! [experiment]
//! output_dir = "~/isr/experiments"
//! numbered = true
//! datasets_dir = "~/isr/datasets"
//!
//! [vars]
//! root = "/srv/isr"
//!
//! [[axes]]
//! name = "dataset"
//! values = ["airfoil", "yacht"]
//!
//! [[axes]]
//! name = "scheme"
//! values = [{ value = "proximity-x", alias = "pro_x" }, { value = "surrounding-x", alias = "sur_x" }]
//!
//! [baseline]
//! "pop.size" = 1000
//!
//! [derived]
//! "experiment.data" = "{root}/datasets/{dataset}"
//!
//! [[exclude]]
//! name = "surrounding needs the original space"
//! when = [{ axis = "scheme", in = ["surrounding-x"] }, { axis = "dataset", not_in = ["airfoil"] }]
//!
//! [batch]
//! engine = "java -jar ISR.jar"
//! ```
//!
//! Table key order is preserved, so records list keys in file order.
//! Dotted keys (`pop.size = 1000`) become nested TOML tables; they are
//! flattened back to `pop.size`, grouped by their first segment. Quote the
//! key to keep an exact interleaved order.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::dataset::DatasetCatalog;
use crate::experiment::{
    Axis, ConfigRecord, ExclusionSpec, Generator, Inheritance, JobSpec, JobSpecConfig,
    NeighborhoodBinding,
};
use crate::{Error, Result};

/// Default master file name in parent mode.
pub const DEFAULT_MASTER_FILE: &str = "master.txt";

/// A parsed grid file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridConfig {
    /// Identifier style and output layout
    pub experiment: ExperimentSection,
    /// User template variables
    #[serde(default)]
    pub vars: toml::Table,
    /// Parameter axes in expansion order
    pub axes: Vec<Axis>,
    /// Keys shared by every record
    #[serde(default)]
    pub baseline: toml::Table,
    /// Per-record keys rendered from templates
    #[serde(default)]
    pub derived: toml::Table,
    /// How records inherit the baseline
    #[serde(default)]
    pub inheritance: InheritanceSection,
    /// Neighborhood size binding
    #[serde(default)]
    pub neighborhood: Option<NeighborhoodBinding>,
    /// Dataset lookup table entries
    #[serde(default)]
    pub datasets: DatasetCatalog,
    /// Exclusion rules
    #[serde(default)]
    pub exclude: Vec<ExclusionSpec>,
    /// Job line and script framing
    pub batch: JobSpecConfig,
}

/// `[experiment]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentSection {
    /// Root output directory
    pub output_dir: String,
    /// Separator between identifier parts
    #[serde(default = "default_separator")]
    pub separator: String,
    /// Constant identifier prefix
    #[serde(default)]
    pub prefix: Option<String>,
    /// Put a running number into identifiers
    #[serde(default)]
    pub numbered: bool,
    /// First running number
    #[serde(default = "default_first_number")]
    pub first_number: u64,
    /// Record file extension
    #[serde(default)]
    pub extension: Option<String>,
    /// Subdirectory for records
    #[serde(default)]
    pub config_dir: Option<String>,
    /// Batch script name
    #[serde(default)]
    pub batch_file: Option<String>,
    /// Manifest file name
    #[serde(default)]
    pub manifest: Option<String>,
    /// Axes that split the output into groups
    #[serde(default)]
    pub group_by: Vec<String>,
    /// Directory of `<name>-train-0.csv` folds to catalog
    #[serde(default)]
    pub datasets_dir: Option<String>,
}

fn default_separator() -> String {
    "-".to_string()
}

const fn default_first_number() -> u64 {
    1
}

/// `[inheritance]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InheritanceSection {
    /// `inline` or `parent`
    #[serde(default)]
    pub mode: InheritanceMode,
    /// Master file name (parent mode)
    #[serde(default)]
    pub file_name: Option<String>,
    /// Template for the `parent = ...` path (parent mode)
    #[serde(default)]
    pub reference: Option<String>,
}

/// Inheritance mode names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InheritanceMode {
    /// Baseline merged into every record
    #[default]
    Inline,
    /// Baseline written once and referenced
    Parent,
}

impl GridConfig {
    /// Parse grid text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Toml`] for malformed TOML or unknown keys.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a grid file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Filesystem`] if the file cannot be read and
    /// [`Error::Toml`] if it does not parse.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::filesystem(path, e))?;
        tracing::debug!(path = %path.display(), "Loaded grid file");
        Self::parse(&text)
    }

    /// Replace the output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<String>) -> Self {
        self.experiment.output_dir = dir.into();
        self
    }

    /// Build the generator this grid describes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for non-scalar values, an unset `HOME`
    /// when `~` is used, and any error from [`crate::experiment::GeneratorBuilder::build`].
    /// Scanning `datasets_dir` can fail with filesystem or dataset errors.
    pub fn into_generator(self) -> Result<Generator> {
        let experiment = self.experiment;
        let mut builder =
            Generator::builder(expand_home(&experiment.output_dir)?).separator(experiment.separator);
        if let Some(prefix) = experiment.prefix {
            builder = builder.prefix(prefix);
        }
        if experiment.numbered {
            builder = builder.numbered(experiment.first_number);
        }
        if let Some(extension) = experiment.extension {
            builder = builder.extension(extension);
        }
        if let Some(dir) = experiment.config_dir {
            builder = builder.config_dir(dir);
        }
        if let Some(name) = experiment.batch_file {
            builder = builder.batch_file(name);
        }
        if let Some(name) = experiment.manifest {
            builder = builder.manifest(name);
        }
        for axis in experiment.group_by {
            builder = builder.group_by(axis);
        }

        for (name, value) in flatten("vars", &self.vars)? {
            builder = builder.var(name, expand_home(&value)?.display().to_string());
        }
        for axis in self.axes {
            builder = builder.axis(axis);
        }
        builder = builder.baseline(ConfigRecord::from_pairs(flatten("baseline", &self.baseline)?)?);
        for (key, template) in flatten("derived", &self.derived)? {
            builder = builder.derive(key, template);
        }
        for rule in self.exclude {
            builder = builder.exclude(rule.into());
        }

        builder = builder.inheritance(match self.inheritance.mode {
            InheritanceMode::Inline => Inheritance::Inline,
            InheritanceMode::Parent => Inheritance::ParentFile {
                file_name: self
                    .inheritance
                    .file_name
                    .unwrap_or_else(|| DEFAULT_MASTER_FILE.to_string()),
                reference: self.inheritance.reference,
            },
        });

        if let Some(binding) = self.neighborhood {
            let mut catalog = match &experiment.datasets_dir {
                Some(dir) => DatasetCatalog::scan_dir(expand_home(dir)?)?,
                None => DatasetCatalog::default(),
            };
            catalog.extend(self.datasets);
            builder = builder.neighborhood(binding, catalog);
        }

        builder.job(JobSpec::try_from(self.batch)?).build()
    }
}

/// Expand a leading `~` to `$HOME`.
///
/// # Errors
///
/// Returns [`Error::Config`] if `~` is used and `HOME` is not set.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return Ok(PathBuf::from(path)),
    };
    let home = std::env::var_os("HOME")
        .ok_or_else(|| Error::Config(format!("cannot expand '{path}': HOME is not set")))?;
    let home = PathBuf::from(home);
    Ok(if rest.is_empty() { home } else { home.join(rest) })
}

/// Flatten a table into `(dotted.key, value)` pairs in table order.
fn flatten(section: &str, table: &toml::Table) -> Result<Vec<(String, String)>> {
    let mut out = Vec::with_capacity(table.len());
    flatten_into(section, "", table, &mut out)?;
    Ok(out)
}

fn flatten_into(
    section: &str,
    prefix: &str,
    table: &toml::Table,
    out: &mut Vec<(String, String)>,
) -> Result<()> {
    for (key, value) in table {
        let key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::Table(nested) => flatten_into(section, &key, nested, out)?,
            toml::Value::Array(_) => {
                return Err(Error::Config(format!(
                    "[{section}] '{key}' is an array; write it as a single string"
                )))
            }
            scalar => out.push((key, render_scalar(scalar))),
        }
    }
    Ok(())
}

fn render_scalar(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => format!("{f:?}"),
        toml::Value::Boolean(b) => b.to_string(),
        toml::Value::Datetime(d) => d.to_string(),
        toml::Value::Array(_) | toml::Value::Table(_) => String::new(),
    }
}
