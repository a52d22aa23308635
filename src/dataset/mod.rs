//! Dataset preparation (CSV folds, catalog, normalization, synthetic data)
//!
//! Datasets are headerless, comma-separated numeric CSV files. The last
//! column is the target; all other columns are input attributes.
//!
//! ## Fold Layout
//!
//! ```text
//! <dir>/<name>-train-0.csv   <dir>/<name>-test-0.csv
//! <dir>/<name>-train-1.csv   <dir>/<name>-test-1.csv
//! ...
//! ```
//!
//! Discovery stops at the first missing training fold, so datasets with
//! fewer folds than the maximum are handled transparently.

mod catalog;
mod normalize;
mod synthetic;

use std::fs::File;
use std::path::{Path, PathBuf};

pub use catalog::{DatasetCatalog, DatasetInfo};
pub use normalize::{drop_zero_columns, normalize_fold, MinMaxScaler};
pub use synthetic::{Sampling, SyntheticFunction, DEFAULT_SEED};

use crate::{Error, Result};

/// Default number of folds per dataset.
pub const DEFAULT_MAX_FOLDS: usize = 5;

/// An in-memory numeric dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    rows: Vec<Vec<f64>>,
    num_columns: usize,
}

impl Dataset {
    /// Build a dataset from rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dataset`] if rows have different lengths.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let num_columns = rows.first().map_or(0, Vec::len);
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != num_columns)
        {
            return Err(Error::Dataset(format!(
                "row {i} has {} columns, expected {num_columns}",
                row.len()
            )));
        }
        Ok(Self { rows, num_columns })
    }

    /// Load a headerless CSV file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, a field is empty or
    /// not numeric, or rows are ragged. Only a single trailing empty field
    /// (a line ending in a comma) is ignored.
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::filesystem(path, e))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            let line = record.position().map_or(index as u64 + 1, csv::Position::line);
            let mut fields: Vec<&str> = record.iter().collect();
            // a trailing comma leaves one empty field behind
            if fields.last().is_some_and(|f| f.is_empty()) {
                fields.pop();
            }
            if fields.is_empty() {
                continue;
            }
            let row = fields
                .iter()
                .enumerate()
                .map(|(column, field)| {
                    if field.is_empty() {
                        return Err(Error::Dataset(format!(
                            "{}:{line}: column {} is empty",
                            path.display(),
                            column + 1
                        )));
                    }
                    field.parse::<f64>().map_err(|_| {
                        Error::Dataset(format!(
                            "{}:{line}: '{field}' is not a number",
                            path.display()
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            rows.push(row);
        }
        Self::from_rows(rows).map_err(|e| match e {
            Error::Dataset(msg) => Error::Dataset(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    /// Write the dataset as headerless CSV, values in [`format_value`] form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Filesystem`] if the file cannot be created or written.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| Error::filesystem(path, e))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        for row in &self.rows {
            writer.write_record(row.iter().map(|v| format_value(*v)))?;
        }
        writer.flush().map_err(|e| Error::filesystem(path, e))
    }

    /// All rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Number of instances (rows).
    #[must_use]
    pub fn num_instances(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns, target included.
    #[must_use]
    pub const fn num_columns(&self) -> usize {
        self.num_columns
    }

    /// Number of input attributes (target excluded).
    #[must_use]
    pub const fn num_attributes(&self) -> usize {
        self.num_columns.saturating_sub(1)
    }

    /// Iterate the values of one column.
    pub fn column(&self, index: usize) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(move |row| row[index])
    }

    /// Target values (last column).
    #[must_use]
    pub fn targets(&self) -> Vec<f64> {
        match self.num_columns {
            0 => Vec::new(),
            n => self.column(n - 1).collect(),
        }
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [Vec<f64>] {
        &mut self.rows
    }

    pub(crate) fn retain_columns(&mut self, keep: &[bool]) {
        for row in &mut self.rows {
            let mut index = 0;
            row.retain(|_| {
                let kept = keep[index];
                index += 1;
                kept
            });
        }
        self.num_columns = keep.iter().filter(|k| **k).count();
    }
}

/// Shortest decimal form of a value, without trailing zeros (`1.0` → `1`).
#[must_use]
pub fn format_value(value: f64) -> String {
    if value == 0.0 {
        // also normalizes -0.0
        return "0".to_string();
    }
    value.to_string()
}

/// Training/test fold files of one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldSet {
    name: String,
    folds: Vec<(PathBuf, PathBuf)>,
}

impl FoldSet {
    /// File name of a fold: `<name>-<kind>-<index>.csv`.
    #[must_use]
    pub fn fold_file_name(name: &str, kind: &str, index: usize) -> String {
        format!("{name}-{kind}-{index}.csv")
    }

    /// Discover up to `max_folds` folds of `name` in `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dataset`] if no training fold exists, or if a
    /// training fold has no matching test fold.
    pub fn discover(dir: impl AsRef<Path>, name: &str, max_folds: usize) -> Result<Self> {
        let dir = dir.as_ref();
        let mut folds = Vec::new();
        for index in 0..max_folds {
            let train = dir.join(Self::fold_file_name(name, "train", index));
            if !train.is_file() {
                break;
            }
            let test = dir.join(Self::fold_file_name(name, "test", index));
            if !test.is_file() {
                return Err(Error::Dataset(format!(
                    "{} has no matching test fold {}",
                    train.display(),
                    test.display()
                )));
            }
            folds.push((train, test));
        }
        if folds.is_empty() {
            return Err(Error::Dataset(format!(
                "no folds of '{name}' found in {}",
                dir.display()
            )));
        }
        Ok(Self {
            name: name.to_string(),
            folds,
        })
    }

    /// Dataset name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `(train, test)` paths per fold.
    #[must_use]
    pub fn folds(&self) -> &[(PathBuf, PathBuf)] {
        &self.folds
    }

    /// Every fold file, training then test per fold.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.folds
            .iter()
            .flat_map(|(train, test)| [train.as_path(), test.as_path()])
    }
}
