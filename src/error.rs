//! Error types for isr-expgen
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)
//!
//! Every variant belongs to one of three kinds (see [`ErrorKind`]):
//! configuration problems (fix the grid and rerun), filesystem problems
//! (fix permissions/paths and rerun) and dataset problems.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The grid, a template or a lookup could not be resolved.
    Configuration,
    /// A directory or file could not be created or written.
    Filesystem,
    /// A dataset could not be read, parsed or transformed.
    Data,
}

/// isr-expgen error types
#[derive(Error, Debug)]
pub enum Error {
    /// A derived value needs a dataset the catalog does not know
    #[error("Lookup error: dataset '{dataset}' is not in the dataset catalog (needed to resolve {what})")]
    Lookup {
        /// Dataset name that was looked up
        dataset: String,
        /// What was being resolved (e.g. `k1pni`)
        what: String,
    },

    /// Invalid grid definition
    #[error("Configuration error: {0}")]
    Config(String),

    /// Two combinations map to the same identifier (Poka-Yoke: never overwrite silently)
    #[error("Identifier collision: '{identifier}' is produced by both [{first}] and [{second}]")]
    IdentifierCollision {
        /// The duplicated identifier
        identifier: String,
        /// Combination that produced it first
        first: String,
        /// Combination that produced it again
        second: String,
    },

    /// Key or value that cannot be written as a `key = value` line
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue {
        /// Offending key
        key: String,
        /// Why it was rejected
        reason: String,
    },

    /// Template could not be rendered
    #[error("Template error in '{template}': {reason}")]
    Template {
        /// Template source text
        template: String,
        /// Why rendering failed
        reason: String,
    },

    /// Filesystem failure with the path that caused it
    #[error("Filesystem error at {}: {source}\nCheck permissions and free space, then rerun", path.display())]
    Filesystem {
        /// Path being created or written
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Dataset content error
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Error raised while processing one combination of the grid
    #[error("Combination [{combination}] failed")]
    Combination {
        /// Human-readable combination (`axis=value, ...`)
        combination: String,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Grid file parse error
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Manifest serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap an IO error with the path it occurred on.
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Attach the failing combination to an error.
    #[must_use]
    pub fn in_combination(self, combination: impl Into<String>) -> Self {
        Self::Combination {
            combination: combination.into(),
            source: Box::new(self),
        }
    }

    /// Classify the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Lookup { .. }
            | Self::Config(_)
            | Self::IdentifierCollision { .. }
            | Self::InvalidValue { .. }
            | Self::Template { .. }
            | Self::Toml(_)
            | Self::Other(_) => ErrorKind::Configuration,
            Self::Filesystem { .. } | Self::Io(_) => ErrorKind::Filesystem,
            Self::Dataset(_) | Self::Csv(_) | Self::Json(_) => ErrorKind::Data,
            Self::Combination { source, .. } => source.kind(),
        }
    }
}
