use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical database types a query set can be registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    Postgres,
    Mysql,
    Sqlite,
}

impl DatabaseKind {
    /// All supported kinds, in inference priority order.
    pub const ALL: [DatabaseKind; 3] = [
        DatabaseKind::Mysql,
        DatabaseKind::Postgres,
        DatabaseKind::Sqlite,
    ];

    /// The registry key for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseKind::Postgres => "postgres",
            DatabaseKind::Mysql => "mysql",
            DatabaseKind::Sqlite => "sqlite",
        }
    }

    /// Infer a kind from a free-form driver identifier.
    ///
    /// Matching is case-insensitive and by substring. When several names
    /// appear, mysql wins over postgres, and postgres over sqlite.
    pub fn infer(identifier: &str) -> Option<Self> {
        let identifier = identifier.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| identifier.contains(kind.as_str()))
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown database kind: {0}")]
pub struct ParseKindError(pub String);

impl FromStr for DatabaseKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" => Ok(DatabaseKind::Postgres),
            "mysql" => Ok(DatabaseKind::Mysql),
            "sqlite" => Ok(DatabaseKind::Sqlite),
            _ => Err(ParseKindError(s.to_string())),
        }
    }
}
