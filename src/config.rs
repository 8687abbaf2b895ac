use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::kind::DatabaseKind;

/// File suffix identifying statement files.
pub const DEFAULT_SUFFIX: &str = ".sql";

/// Marker separating statement blocks inside a file.
pub const DEFAULT_DELIMITER: &str = "--";

/// Directory loaded when no configuration is supplied.
pub const DEFAULT_POSTGRES_DIR: &str = "data/postgres";

/// A directory of statement files registered under one database kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySource {
    pub kind: DatabaseKind,
    pub dir: PathBuf,
}

impl QuerySource {
    pub fn new(kind: DatabaseKind, dir: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            dir: dir.into(),
        }
    }
}

/// Query registry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Directories to load, in order. Later sources overwrite earlier ones
    /// when they share a kind and a query name.
    #[serde(default)]
    pub sources: Vec<QuerySource>,
    /// Only files whose name ends with this suffix are read
    #[serde(default = "default_suffix")]
    pub suffix: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

fn default_suffix() -> String {
    DEFAULT_SUFFIX.to_string()
}

fn default_delimiter() -> String {
    DEFAULT_DELIMITER.to_string()
}

impl RegistryConfig {
    /// Create a config with no sources.
    pub fn empty() -> Self {
        Self {
            sources: Vec::new(),
            suffix: default_suffix(),
            delimiter: default_delimiter(),
        }
    }

    /// One source per supported kind, each at `root/<kind>`.
    pub fn per_kind(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        DatabaseKind::ALL
            .into_iter()
            .fold(Self::empty(), |config, kind| {
                config.with_source(kind, root.join(kind.as_str()))
            })
    }

    /// Add a source directory for `kind`
    pub fn with_source(mut self, kind: DatabaseKind, dir: impl Into<PathBuf>) -> Self {
        self.sources.push(QuerySource::new(kind, dir));
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }
}

impl Default for RegistryConfig {
    /// Postgres statements from `data/postgres`, relative to the working directory.
    fn default() -> Self {
        Self::empty().with_source(DatabaseKind::Postgres, DEFAULT_POSTGRES_DIR)
    }
}
