use std::path::PathBuf;

use rusqlite::{Connection, OpenFlags};

use crate::kind::DatabaseKind;
use crate::resolver::{ConnectionSource, DriverConnection};

impl DriverConnection for Connection {
    fn database_kind(&self) -> Option<DatabaseKind> {
        Some(DatabaseKind::Sqlite)
    }
}

/// Opens SQLite connections for kind resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct SqliteSource {
    /// Path to the SQLite database file; `None` for an in-memory database
    pub db_path: Option<PathBuf>,
    pub flags: OpenFlags,
}

impl SqliteSource {
    /// Create a source for the database file at `db_path`
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: Some(db_path.into()),
            flags: OpenFlags::default(),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            db_path: None,
            flags: OpenFlags::default(),
        }
    }

    pub fn with_flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }
}

impl ConnectionSource for SqliteSource {
    type Connection = Connection;
    type Error = rusqlite::Error;

    fn open_driver_connection(&self) -> Result<Connection, rusqlite::Error> {
        match &self.db_path {
            Some(path) => Connection::open_with_flags(path, self.flags),
            None => Connection::open_in_memory_with_flags(self.flags),
        }
    }
}

/// A live connection opens a read-only sibling against the same database
/// file, so a file removed underneath it is an error rather than recreated.
impl ConnectionSource for Connection {
    type Connection = Connection;
    type Error = rusqlite::Error;

    fn open_driver_connection(&self) -> Result<Connection, rusqlite::Error> {
        match self.path().filter(|p| !p.is_empty()) {
            Some(path) => Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            ),
            None => Connection::open_in_memory(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::resolve_kind;

    #[test]
    fn rusqlite_connection_declares_sqlite() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(resolve_kind(&conn).unwrap(), DatabaseKind::Sqlite);
    }

    #[test]
    fn sibling_of_deleted_database_is_not_recreated() {
        let dir = tempfile::TempDir::new().unwrap();
        let db_path = dir.path().join("app.db");
        let conn = Connection::open(&db_path).unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER);").unwrap();

        assert!(conn.open_driver_connection().is_ok());

        std::fs::remove_file(&db_path).unwrap();
        assert!(conn.open_driver_connection().is_err());
        assert!(!db_path.exists());

        let registry = crate::registry::QueryRegistry::new(crate::config::RegistryConfig::empty());
        assert!(matches!(
            registry.get_query_for_db(&conn, "anything"),
            Err(crate::error::QueryError::DriverOpen { .. })
        ));
    }

    #[test]
    fn in_memory_connection_opens_in_memory_sibling() {
        let conn = Connection::open_in_memory().unwrap();
        let sibling = conn.open_driver_connection().unwrap();
        assert_eq!(resolve_kind(&sibling).unwrap(), DatabaseKind::Sqlite);
    }

    #[test]
    fn read_only_open_of_missing_file_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = SqliteSource::new(dir.path().join("absent.db"))
            .with_flags(OpenFlags::SQLITE_OPEN_READ_ONLY);
        assert!(source.open_driver_connection().is_err());
    }
}
