//! Named SQL statement registry for the Runar ecosystem.
//!
//! # Intention
//!
//! - Load named SQL statements from flat `.sql` files once per process.
//! - Serve them by database type and name, or by inspecting a live connection.
//!
//! # Architectural Boundaries
//!
//! - Only statement loading and lookup belong here.
//! - No SQL validation, parameter binding, or query composition.
//! - Files are read once; there is no reloading.
//!
//! Most code should construct a [`QueryRegistry`] and share it. The free
//! functions [`get_query`] and [`get_query_for_db`] serve a process-wide
//! registry loaded from `data/postgres` unless [`install_global`] ran first.

pub mod config;
pub mod error;
pub mod kind;
pub mod parser;
pub mod registry;
pub mod resolver;
pub mod sqlite;

use std::sync::OnceLock;

pub use config::{QuerySource, RegistryConfig};
pub use error::{QueryError, QueryResult};
pub use kind::DatabaseKind;
pub use parser::{parse_statements, Statement};
pub use registry::{LoadIssue, LoadReport, LoadStage, QueryRegistry, QuerySet, QueryStore};
pub use resolver::{resolve_kind, ConnectionSource, DriverConnection};
pub use sqlite::SqliteSource;

static GLOBAL: OnceLock<QueryRegistry> = OnceLock::new();

/// Configure the process-wide registry.
///
/// Fails, handing the config back, if the registry was already installed or
/// used.
pub fn install_global(config: RegistryConfig) -> Result<&'static QueryRegistry, RegistryConfig> {
    GLOBAL
        .set(QueryRegistry::new(config))
        .map_err(QueryRegistry::into_config)?;
    Ok(global())
}

/// The process-wide registry, created with the default config on first use.
pub fn global() -> &'static QueryRegistry {
    GLOBAL.get_or_init(QueryRegistry::default)
}

/// Look up a statement in the process-wide registry.
pub fn get_query(db_type: &str, name: &str) -> QueryResult<&'static str> {
    global().get_query(db_type, name)
}

/// Look up a statement in the process-wide registry for the database behind `source`.
pub fn get_query_for_db<S>(source: &S, name: &str) -> QueryResult<&'static str>
where
    S: ConnectionSource + ?Sized,
{
    global().get_query_for_db(source, name)
}
