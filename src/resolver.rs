//! Resolving the database type of a live connection.
//!
//! A [`ConnectionSource`] is anything that can open a short-lived
//! [`DriverConnection`]. The opened connection only reports which kind of
//! database it talks to and is dropped before the lookup runs.

use std::error::Error as StdError;

use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::kind::DatabaseKind;
use crate::registry::QueryRegistry;

/// A raw driver connection that can describe its database.
pub trait DriverConnection {
    /// The database kind, when the driver declares it.
    fn database_kind(&self) -> Option<DatabaseKind> {
        None
    }

    /// A free-form driver identifier, used to infer the kind when none is declared.
    fn driver_identifier(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

/// A handle that can open throwaway driver connections.
pub trait ConnectionSource {
    type Connection: DriverConnection;
    type Error: Into<Box<dyn StdError + Send + Sync>>;

    fn open_driver_connection(&self) -> Result<Self::Connection, Self::Error>;
}

/// Determine the database kind behind `conn`.
pub fn resolve_kind<C: DriverConnection + ?Sized>(conn: &C) -> QueryResult<DatabaseKind> {
    if let Some(kind) = conn.database_kind() {
        return Ok(kind);
    }
    let identifier = conn.driver_identifier();
    DatabaseKind::infer(&identifier)
        .ok_or_else(|| QueryError::UnsupportedDatabaseType(identifier.to_lowercase()))
}

impl QueryRegistry {
    /// Look up `name` for whatever database `source` connects to.
    ///
    /// Opens one connection through `source` to find the database kind and
    /// drops it before the lookup, whether or not the kind is supported.
    pub fn get_query_for_db<S>(&self, source: &S, name: &str) -> QueryResult<&str>
    where
        S: ConnectionSource + ?Sized,
    {
        let kind = {
            let conn = source
                .open_driver_connection()
                .map_err(QueryError::driver_open)?;
            resolve_kind(&conn)?
        };
        debug!(kind = %kind, query = name, "resolved database kind from connection");
        self.get_query(kind.as_str(), name)
    }
}
