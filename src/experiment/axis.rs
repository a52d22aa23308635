//! Parameter axes and their Cartesian product

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One value on an axis, optionally with a short alias used in identifiers.
///
/// In a grid file a value is either a bare string or a table:
///
/// ```toml
/// values = ["euclidean", { value = "fractional", alias = "fra" }]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawAxisValue", into = "RawAxisValue")]
pub struct AxisValue {
    value: String,
    alias: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawAxisValue {
    Plain(String),
    Aliased { value: String, alias: String },
}

impl From<RawAxisValue> for AxisValue {
    fn from(raw: RawAxisValue) -> Self {
        match raw {
            RawAxisValue::Plain(value) => Self::new(value),
            RawAxisValue::Aliased { value, alias } => Self::aliased(value, alias),
        }
    }
}

impl From<AxisValue> for RawAxisValue {
    fn from(value: AxisValue) -> Self {
        match value.alias {
            Some(alias) => Self::Aliased {
                value: value.value,
                alias,
            },
            None => Self::Plain(value.value),
        }
    }
}

impl AxisValue {
    /// Create a value without alias.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            alias: None,
        }
    }

    /// Create a value with an identifier alias.
    #[must_use]
    pub fn aliased(value: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            alias: Some(alias.into()),
        }
    }

    /// The full value, as written into configuration records.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The label used in identifiers: the alias if set, else the value.
    #[must_use]
    pub fn label(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.value)
    }
}

impl From<&str> for AxisValue {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AxisValue {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A named, ordered set of allowed values along one experiment dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Axis {
    name: String,
    values: Vec<AxisValue>,
}

impl Axis {
    /// Create an axis from anything convertible into axis values.
    ///
    /// ```rust
    /// use isr_expgen::experiment::Axis;
    ///
    /// let axis = Axis::new("embedding", ["original", "isomap", "pca"]);
    /// assert_eq!(axis.len(), 3);
    /// ```
    pub fn new<I, V>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<AxisValue>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Axis name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Allowed values in declaration order.
    #[must_use]
    pub fn values(&self) -> &[AxisValue] {
        &self.values
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the axis has no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Check the axis is usable: non-empty name, at least one value, no duplicate values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("axis name must not be empty".into()));
        }
        if self.values.is_empty() {
            return Err(Error::Config(format!("axis '{}' has no values", self.name)));
        }
        let mut seen = HashSet::new();
        for value in &self.values {
            if value.value().is_empty() {
                return Err(Error::Config(format!(
                    "axis '{}' contains an empty value",
                    self.name
                )));
            }
            if !seen.insert(value.value()) {
                return Err(Error::Config(format!(
                    "axis '{}' lists value '{}' more than once",
                    self.name,
                    value.value()
                )));
            }
        }
        Ok(())
    }
}

/// One selection of a value from every axis, in axis order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combination {
    entries: Vec<(String, AxisValue)>,
}

impl Combination {
    /// Build a combination from `(axis, value)` pairs.
    pub fn new<I, N, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<AxisValue>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }

    /// Value chosen on `axis`, if the axis exists.
    #[must_use]
    pub fn value(&self, axis: &str) -> Option<&str> {
        self.get(axis).map(AxisValue::value)
    }

    /// Identifier label chosen on `axis`, if the axis exists.
    #[must_use]
    pub fn label(&self, axis: &str) -> Option<&str> {
        self.get(axis).map(AxisValue::label)
    }

    /// Full axis value chosen on `axis`.
    #[must_use]
    pub fn get(&self, axis: &str) -> Option<&AxisValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == axis)
            .map(|(_, value)| value)
    }

    /// Iterate `(axis, value)` pairs in axis order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AxisValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of axes in the combination.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True for the empty combination.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={}", value.value())?;
        }
        Ok(())
    }
}

/// Odometer iterator over the Cartesian product of a list of axes.
///
/// The last axis varies fastest, matching a nest of `for` loops written
/// in axis order.
#[derive(Debug, Clone)]
pub struct CartesianProduct<'a> {
    axes: &'a [Axis],
    indices: Vec<usize>,
    done: bool,
}

impl<'a> CartesianProduct<'a> {
    /// Start iterating the product of `axes`.
    ///
    /// An empty axis list yields nothing, as does any empty axis.
    #[must_use]
    pub fn new(axes: &'a [Axis]) -> Self {
        Self {
            axes,
            indices: vec![0; axes.len()],
            done: axes.is_empty() || axes.iter().any(Axis::is_empty),
        }
    }

    /// Total number of combinations.
    #[must_use]
    pub fn total(axes: &[Axis]) -> usize {
        if axes.is_empty() {
            return 0;
        }
        axes.iter().map(Axis::len).product()
    }

    fn advance(&mut self) {
        for pos in (0..self.indices.len()).rev() {
            self.indices[pos] += 1;
            if self.indices[pos] < self.axes[pos].len() {
                return;
            }
            self.indices[pos] = 0;
        }
        self.done = true;
    }
}

impl Iterator for CartesianProduct<'_> {
    type Item = Combination;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let combination = Combination {
            entries: self
                .axes
                .iter()
                .zip(&self.indices)
                .map(|(axis, &i)| (axis.name.clone(), axis.values[i].clone()))
                .collect(),
        };
        self.advance();
        Some(combination)
    }
}
