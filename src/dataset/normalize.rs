//! Min-max normalization and zero-column removal
//!
//! Both training and test folds are scaled with the minimum and range of
//! the *training* fold only: test-set statistics are unknown at
//! pre-processing time.

use super::Dataset;
use crate::{Error, Result};

/// Per-column minimum and range fitted on a training fold.
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaler {
    min: Vec<f64>,
    range: Vec<f64>,
}

impl MinMaxScaler {
    /// Fit on every column of `train`, target included.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dataset`] if `train` is empty or a column is
    /// constant (zero range).
    pub fn fit(train: &Dataset) -> Result<Self> {
        if train.num_instances() == 0 {
            return Err(Error::Dataset("cannot fit a scaler on an empty dataset".into()));
        }
        let mut min = Vec::with_capacity(train.num_columns());
        let mut range = Vec::with_capacity(train.num_columns());
        for column in 0..train.num_columns() {
            let (lo, hi) = train
                .column(column)
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
            let span = hi - lo;
            if span == 0.0 {
                return Err(Error::Dataset(format!(
                    "column {column} is constant ({lo}); remove it before normalizing"
                )));
            }
            min.push(lo);
            range.push(span);
        }
        Ok(Self { min, range })
    }

    /// Per-column minimum.
    #[must_use]
    pub fn min(&self) -> &[f64] {
        &self.min
    }

    /// Per-column range.
    #[must_use]
    pub fn range(&self) -> &[f64] {
        &self.range
    }

    /// Scale `data` in place: `(v - min) / range`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dataset`] if the column count differs from the fit.
    pub fn transform(&self, data: &mut Dataset) -> Result<()> {
        if data.num_columns() != self.min.len() {
            return Err(Error::Dataset(format!(
                "scaler fitted on {} columns, dataset has {}",
                self.min.len(),
                data.num_columns()
            )));
        }
        for row in data.rows_mut() {
            for ((value, min), range) in row.iter_mut().zip(&self.min).zip(&self.range) {
                *value = (*value - min) / range;
            }
        }
        Ok(())
    }
}

/// Normalize a train/test fold pair with statistics of the training fold.
///
/// # Errors
///
/// See [`MinMaxScaler::fit`] and [`MinMaxScaler::transform`].
pub fn normalize_fold(train: &mut Dataset, test: &mut Dataset) -> Result<MinMaxScaler> {
    let scaler = MinMaxScaler::fit(train)?;
    scaler.transform(train)?;
    scaler.transform(test)?;
    Ok(scaler)
}

/// Remove columns that are zero in every row of *any* of `datasets`.
///
/// The mask is shared: a column empty in one fold is removed from all
/// folds so every file keeps the same column count. Returns the indices of
/// the removed columns.
///
/// # Errors
///
/// Returns [`Error::Dataset`] if the datasets disagree on column count.
pub fn drop_zero_columns(datasets: &mut [Dataset]) -> Result<Vec<usize>> {
    let Some(num_columns) = datasets.first().map(Dataset::num_columns) else {
        return Ok(Vec::new());
    };
    if let Some(other) = datasets.iter().find(|d| d.num_columns() != num_columns) {
        return Err(Error::Dataset(format!(
            "inconsistent column counts: {num_columns} and {}",
            other.num_columns()
        )));
    }

    let keep: Vec<bool> = (0..num_columns)
        .map(|column| {
            !datasets
                .iter()
                .any(|d| d.num_instances() > 0 && d.column(column).all(|v| v == 0.0))
        })
        .collect();
    let removed: Vec<usize> = keep
        .iter()
        .enumerate()
        .filter_map(|(i, kept)| (!kept).then_some(i))
        .collect();

    if !removed.is_empty() {
        for dataset in datasets.iter_mut() {
            dataset.retain_columns(&keep);
        }
    }
    Ok(removed)
}
