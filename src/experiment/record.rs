//! Configuration Record - ordered `key = value` options for one engine run

use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;

use crate::{Error, Result};

/// Separator between key and value on each line.
pub const ASSIGNMENT: &str = " = ";

/// Key that points a record at its baseline file.
pub const PARENT_KEY: &str = "parent";

/// Ordered mapping from option name to value.
///
/// Insertion order is preserved so rendered files are byte-stable.
/// Setting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigRecord {
    entries: Vec<(String, String)>,
}

impl ConfigRecord {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from `(key, value)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] if a pair cannot be written verbatim.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut record = Self::new();
        for (key, value) in pairs {
            record.set(key, value)?;
        }
        Ok(record)
    }

    /// Set `key` to `value`, replacing any previous value in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] if the key is empty or if the key or
    /// value contains a newline or the ` = ` separator.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let key = key.into();
        let value = value.into();
        validate(&key, &value)?;
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        Ok(())
    }

    /// Value of `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// The `parent` reference, if declared.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.get(PARENT_KEY)
    }

    /// Iterate entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Baseline merged with `overrides`: keys of `self` keep their position,
    /// overridden values are replaced, new keys are appended in order.
    #[must_use]
    pub fn merged(&self, overrides: &Self) -> Self {
        let mut merged = self.clone();
        for (key, value) in &overrides.entries {
            match merged.entries.iter_mut().find(|(k, _)| k == key) {
                Some(entry) => entry.1.clone_from(value),
                None => merged.entries.push((key.clone(), value.clone())),
            }
        }
        merged
    }

    /// Render as newline-terminated `key = value` lines.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            let _ = writeln!(out, "{key}{ASSIGNMENT}{value}");
        }
        out
    }

    /// Parse `key = value` text. Blank lines and `#` comments are skipped;
    /// each line is split at the first ` = `.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a line without separator.
    pub fn parse(text: &str) -> Result<Self> {
        let mut record = Self::new();
        for (number, line) in text.lines().enumerate() {
            let line = line.trim_end();
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }
            let (key, value) = line
                .split_once(ASSIGNMENT)
                .or_else(|| line.strip_suffix(" =").map(|k| (k, "")))
                .ok_or_else(|| {
                    Error::Config(format!("line {}: expected 'key = value', got '{line}'", number + 1))
                })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(Error::Config(format!("line {}: empty key", number + 1)));
            }
            // last assignment wins, matching properties-file semantics
            match record.entries.iter_mut().find(|(k, _)| k == key) {
                Some(entry) => entry.1 = value.to_string(),
                None => record.entries.push((key.to_string(), value.to_string())),
            }
        }
        Ok(record)
    }

    /// Read and parse a record file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Filesystem`] if the file cannot be read and
    /// [`Error::Config`] if it cannot be parsed.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::filesystem(path, e))?;
        Self::parse(&text).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }
}

fn validate(key: &str, value: &str) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    };
    if key.trim().is_empty() {
        return Err(invalid("key must not be empty"));
    }
    if key.contains('\n') || value.contains('\n') {
        return Err(invalid("keys and values must not contain newlines"));
    }
    if key.contains(ASSIGNMENT) || value.contains(ASSIGNMENT) {
        return Err(invalid("keys and values must not contain ' = '"));
    }
    Ok(())
}

/// Load a record file and resolve its single-level `parent` reference.
///
/// The child's keys override the parent's; the `parent` key itself is
/// dropped. Relative parent paths are resolved against the child's
/// directory.
///
/// # Errors
///
/// Returns [`Error::Config`] if the parent declares a parent of its own,
/// and any error from [`ConfigRecord::read`].
pub fn resolve_config_file(path: impl AsRef<Path>) -> Result<ConfigRecord> {
    let path = path.as_ref();
    let mut child = ConfigRecord::read(path)?;
    let Some(parent_ref) = child.remove(PARENT_KEY) else {
        return Ok(child);
    };

    let parent_path = path
        .parent()
        .map_or_else(|| Path::new(&parent_ref).to_path_buf(), |dir| dir.join(&parent_ref));
    let parent = ConfigRecord::read(&parent_path)?;
    if parent.parent().is_some() {
        return Err(Error::Config(format!(
            "{} declares a parent itself; only single-level inheritance is supported",
            parent_path.display()
        )));
    }
    tracing::debug!(child = %path.display(), parent = %parent_path.display(), "Resolved parent");
    Ok(parent.merged(&child))
}
