use std::error::Error as StdError;

/// Errors returned by query lookups.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// No query set was loaded for the requested database type.
    #[error("no queries found for database type: {0}")]
    UnknownDatabaseType(String),

    /// The database type is known but has no query with this name.
    #[error("query not found: {name} (database type: {db_type})")]
    QueryNotFound { db_type: String, name: String },

    /// The introspection connection could not be opened.
    #[error("failed to open driver connection")]
    DriverOpen {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// The connection's driver maps to none of the supported database types.
    #[error("unsupported database type: {0}")]
    UnsupportedDatabaseType(String),
}

impl QueryError {
    pub(crate) fn driver_open(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::DriverOpen {
            source: source.into(),
        }
    }
}

/// Result alias for query lookups.
pub type QueryResult<T> = Result<T, QueryError>;
