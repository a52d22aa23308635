//! Exclusion rules - predicates that remove combinations from a grid

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use super::{Axis, Combination};
use crate::{Error, Result};

/// One clause of a declarative rule: the value chosen on `axis` must be in
/// `any_of` (when non-empty) and must not be in `not_in`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Condition {
    axis: String,
    #[serde(default, rename = "in")]
    any_of: Vec<String>,
    #[serde(default)]
    not_in: Vec<String>,
}

impl Condition {
    /// Clause matching when `axis` takes one of `values`.
    pub fn is_in<I, S>(axis: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            axis: axis.into(),
            any_of: values.into_iter().map(Into::into).collect(),
            not_in: Vec::new(),
        }
    }

    /// Clause matching when `axis` takes none of `values`.
    pub fn not_in<I, S>(axis: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            axis: axis.into(),
            any_of: Vec::new(),
            not_in: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Axis the clause inspects.
    #[must_use]
    pub fn axis(&self) -> &str {
        &self.axis
    }

    fn matches(&self, combination: &Combination) -> bool {
        let Some(value) = combination.value(&self.axis) else {
            return false;
        };
        let included = self.any_of.is_empty() || self.any_of.iter().any(|v| v == value);
        included && !self.not_in.iter().any(|v| v == value)
    }
}

type Predicate = Arc<dyn Fn(&Combination) -> bool + Send + Sync>;

#[derive(Clone)]
enum RuleKind {
    AllOf(Vec<Condition>),
    Custom(Predicate),
}

/// A named predicate that skips matching combinations.
///
/// ```rust
/// use isr_expgen::experiment::{Combination, Condition, ExclusionRule};
///
/// // embeddings were never computed for the synthetic datasets
/// let rule = ExclusionRule::all_of(
///     "synthetic-original-only",
///     [
///         Condition::is_in("dataset", ["keijzer-6", "keijzer-7"]),
///         Condition::not_in("embedding", ["original"]),
///     ],
/// );
/// let skipped = Combination::new([("embedding", "pca"), ("dataset", "keijzer-6")]);
/// let kept = Combination::new([("embedding", "original"), ("dataset", "keijzer-6")]);
/// assert!(rule.excludes(&skipped));
/// assert!(!rule.excludes(&kept));
/// ```
#[derive(Clone)]
pub struct ExclusionRule {
    name: String,
    kind: RuleKind,
}

impl ExclusionRule {
    /// Rule firing when every condition matches.
    pub fn all_of(name: impl Into<String>, conditions: impl IntoIterator<Item = Condition>) -> Self {
        Self {
            name: name.into(),
            kind: RuleKind::AllOf(conditions.into_iter().collect()),
        }
    }

    /// Rule backed by an arbitrary predicate.
    pub fn custom<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Combination) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: RuleKind::Custom(Arc::new(predicate)),
        }
    }

    /// Rule name, used in logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if this rule removes `combination`.
    #[must_use]
    pub fn excludes(&self, combination: &Combination) -> bool {
        match &self.kind {
            RuleKind::AllOf(conditions) => {
                !conditions.is_empty() && conditions.iter().all(|c| c.matches(combination))
            }
            RuleKind::Custom(predicate) => predicate(combination),
        }
    }

    /// Check that every declarative clause names an existing axis and an
    /// existing value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for unknown axes or values, for a
    /// declarative rule without conditions, or for a condition listing no
    /// values (it would match every value of its axis).
    pub fn validate(&self, axes: &[Axis]) -> Result<()> {
        let RuleKind::AllOf(conditions) = &self.kind else {
            return Ok(());
        };
        if conditions.is_empty() {
            return Err(Error::Config(format!(
                "exclusion rule '{}' has no conditions",
                self.name
            )));
        }
        for condition in conditions {
            let axis = axes
                .iter()
                .find(|a| a.name() == condition.axis)
                .ok_or_else(|| {
                    Error::Config(format!(
                        "exclusion rule '{}' references unknown axis '{}'",
                        self.name, condition.axis
                    ))
                })?;
            if condition.any_of.is_empty() && condition.not_in.is_empty() {
                return Err(Error::Config(format!(
                    "exclusion rule '{}' has a condition on '{}' without 'in' or 'not_in' values",
                    self.name, condition.axis
                )));
            }
            for value in condition.any_of.iter().chain(&condition.not_in) {
                if !axis.values().iter().any(|v| v.value() == value) {
                    return Err(Error::Config(format!(
                        "exclusion rule '{}' references value '{value}' not on axis '{}'",
                        self.name, condition.axis
                    )));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ExclusionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ExclusionRule");
        s.field("name", &self.name);
        match &self.kind {
            RuleKind::AllOf(conditions) => s.field("all_of", conditions),
            RuleKind::Custom(_) => s.field("custom", &"<fn>"),
        };
        s.finish()
    }
}

/// Declarative rule as written in a grid file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExclusionSpec {
    /// Rule name
    pub name: String,
    /// Conditions that must all hold
    pub when: Vec<Condition>,
}

impl From<ExclusionSpec> for ExclusionRule {
    fn from(spec: ExclusionSpec) -> Self {
        Self::all_of(spec.name, spec.when)
    }
}
