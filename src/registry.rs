//! The query registry: a named-statement store loaded once from disk.
//!
//! Loading is lazy and happens at most once per registry, on the first call
//! to [`QueryRegistry::load`] or any lookup. After that the store is
//! immutable and shared readers need no locking.
//!
//! Loading never fails. Unreadable directories and files are recorded as
//! [`LoadIssue`]s in the [`LoadReport`] and logged, and the affected query
//! sets keep whatever was read before the problem.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use tracing::{debug, info, warn};

use crate::config::{QuerySource, RegistryConfig};
use crate::error::{QueryError, QueryResult};
use crate::parser::parse_statements;

/// Query name to query text, for one database type.
pub type QuerySet = HashMap<String, String>;

/// Database type identifier to its [`QuerySet`].
pub type QueryStore = HashMap<String, QuerySet>;

/// Where a suppressed load problem happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    ReadDir,
    ReadFile,
}

/// A problem that was absorbed during loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadIssue {
    pub path: PathBuf,
    pub stage: LoadStage,
    pub message: String,
}

impl LoadIssue {
    fn new(path: &Path, stage: LoadStage, err: &io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            stage,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for LoadIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self.stage {
            LoadStage::ReadDir => "read directory",
            LoadStage::ReadFile => "read file",
        };
        write!(f, "failed to {} {}: {}", stage, self.path.display(), self.message)
    }
}

/// Outcome of the one load pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub files_loaded: usize,
    /// Parsed statements, counting ones later overwritten by a duplicate name.
    pub statements_loaded: usize,
    pub issues: Vec<LoadIssue>,
}

impl LoadReport {
    /// True when nothing was suppressed.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

struct Loaded {
    store: QueryStore,
    report: LoadReport,
}

/// Named SQL statements grouped by database type.
pub struct QueryRegistry {
    config: RegistryConfig,
    loaded: OnceLock<Loaded>,
    passes: AtomicUsize,
}

impl QueryRegistry {
    /// Create a registry that will load from `config` on first use.
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            loaded: OnceLock::new(),
            passes: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn into_config(self) -> RegistryConfig {
        self.config
    }

    /// Run the load pass if it has not run yet, and return its report.
    ///
    /// Concurrent callers block until the single pass completes and then all
    /// observe the same store.
    pub fn load(&self) -> &LoadReport {
        &self.loaded().report
    }

    /// Whether the load pass has completed.
    pub fn is_loaded(&self) -> bool {
        self.loaded.get().is_some()
    }

    /// Number of load passes executed. Never more than one.
    pub fn load_passes(&self) -> usize {
        self.passes.load(Ordering::Acquire)
    }

    /// Look up a statement by database type and name.
    pub fn get_query(&self, db_type: &str, name: &str) -> QueryResult<&str> {
        let set = self
            .query_set(db_type)
            .ok_or_else(|| QueryError::UnknownDatabaseType(db_type.to_string()))?;
        set.get(name)
            .map(String::as_str)
            .ok_or_else(|| QueryError::QueryNotFound {
                db_type: db_type.to_string(),
                name: name.to_string(),
            })
    }

    /// The query set for `db_type`, if one was created during loading.
    pub fn query_set(&self, db_type: &str) -> Option<&QuerySet> {
        self.loaded().store.get(db_type)
    }

    /// Loaded database types, sorted.
    pub fn database_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.loaded().store.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Query names registered for `db_type`, sorted.
    pub fn query_names(&self, db_type: &str) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .query_set(db_type)
            .map(|set| set.keys().map(String::as_str).collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    fn loaded(&self) -> &Loaded {
        self.loaded.get_or_init(|| {
            self.passes.fetch_add(1, Ordering::AcqRel);
            load_sources(&self.config)
        })
    }
}

impl Default for QueryRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl fmt::Debug for QueryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryRegistry")
            .field("config", &self.config)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

fn load_sources(config: &RegistryConfig) -> Loaded {
    let mut store = QueryStore::new();
    let mut report = LoadReport::default();

    for source in &config.sources {
        // The set exists even if its directory is unreadable.
        let set = store.entry(source.kind.as_str().to_string()).or_default();
        load_source(source, config, set, &mut report);
    }

    info!(
        databases = store.len(),
        files = report.files_loaded,
        statements = report.statements_loaded,
        issues = report.issues.len(),
        "loaded sql queries"
    );
    Loaded { store, report }
}

fn load_source(
    source: &QuerySource,
    config: &RegistryConfig,
    set: &mut QuerySet,
    report: &mut LoadReport,
) {
    let files = match statement_files(&source.dir, &config.suffix, report) {
        Ok(files) => files,
        Err(err) => {
            warn!(dir = %source.dir.display(), error = %err, "skipping unreadable query directory");
            report
                .issues
                .push(LoadIssue::new(&source.dir, LoadStage::ReadDir, &err));
            return;
        }
    };

    for path in files {
        let content = match fs::read(&path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(err) => {
                warn!(file = %path.display(), error = %err, "skipping unreadable query file");
                report
                    .issues
                    .push(LoadIssue::new(&path, LoadStage::ReadFile, &err));
                continue;
            }
        };

        let statements = parse_statements(&content, &config.delimiter);
        debug!(
            file = %path.display(),
            kind = %source.kind,
            count = statements.len(),
            "parsed query file"
        );
        report.files_loaded += 1;
        report.statements_loaded += statements.len();
        for statement in statements {
            set.insert(statement.name, statement.text);
        }
    }
}

/// Non-directory entries of `dir` ending in `suffix`, sorted by file name.
fn statement_files(dir: &Path, suffix: &str, report: &mut LoadReport) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                report.issues.push(LoadIssue::new(dir, LoadStage::ReadDir, &err));
                continue;
            }
        };
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        if entry.file_name().to_string_lossy().ends_with(suffix) {
            files.push(entry.path());
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::DatabaseKind;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn postgres_registry(dir: &Path) -> QueryRegistry {
        QueryRegistry::new(RegistryConfig::empty().with_source(DatabaseKind::Postgres, dir))
    }

    #[test]
    fn loads_statements_from_suffixed_files_only() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "users.sql", "-- get_user\nSELECT * FROM users;\n");
        write(dir.path(), "notes.txt", "-- ignored\nSELECT 1;\n");
        fs::create_dir(dir.path().join("nested.sql")).unwrap();

        let registry = postgres_registry(dir.path());
        assert_eq!(
            registry.get_query("postgres", "get_user").unwrap(),
            "SELECT * FROM users;"
        );
        assert!(registry.get_query("postgres", "ignored").is_err());

        let report = registry.load();
        assert_eq!(report.files_loaded, 1);
        assert_eq!(report.statements_loaded, 1);
        assert!(report.is_clean());
    }

    #[test]
    fn later_files_overwrite_earlier_ones() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b.sql", "-- q\nSELECT 'b';\n");
        write(dir.path(), "a.sql", "-- q\nSELECT 'a1';\n-- q\nSELECT 'a2';\n");

        let registry = postgres_registry(dir.path());
        assert_eq!(registry.get_query("postgres", "q").unwrap(), "SELECT 'b';");
        assert_eq!(registry.load().statements_loaded, 3);
    }

    #[test]
    fn missing_directory_is_recorded_not_raised() {
        let dir = TempDir::new().unwrap();
        let registry = postgres_registry(&dir.path().join("absent"));

        let report = registry.load();
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].stage, LoadStage::ReadDir);
        assert_eq!(registry.database_types(), vec!["postgres"]);
        assert!(matches!(
            registry.get_query("postgres", "anything"),
            Err(QueryError::QueryNotFound { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_file_is_recorded_and_others_still_load() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.sql", "-- one\nSELECT 1;\n");
        std::os::unix::fs::symlink(dir.path().join("gone.sql.bak"), dir.path().join("b.sql"))
            .unwrap();
        write(dir.path(), "c.sql", "-- three\nSELECT 3;\n");

        let registry = postgres_registry(dir.path());
        let report = registry.load();
        assert_eq!(report.files_loaded, 2);
        assert_eq!(report.statements_loaded, 2);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].stage, LoadStage::ReadFile);
        assert_eq!(report.issues[0].path, dir.path().join("b.sql"));

        assert_eq!(registry.get_query("postgres", "one").unwrap(), "SELECT 1;");
        assert_eq!(registry.get_query("postgres", "three").unwrap(), "SELECT 3;");
    }

    #[test]
    fn unknown_type_and_missing_name_are_distinct() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "q.sql", "-- get_user\nSELECT 1;");
        let registry = postgres_registry(dir.path());

        match registry.get_query("oracle", "anything") {
            Err(QueryError::UnknownDatabaseType(db)) => assert_eq!(db, "oracle"),
            other => panic!("unexpected result: {:?}", other),
        }
        match registry.get_query("postgres", "missing_query") {
            Err(QueryError::QueryNotFound { db_type, name }) => {
                assert_eq!(db_type, "postgres");
                assert_eq!(name, "missing_query");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn load_runs_once() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "q.sql", "-- one\nSELECT 1;");
        let registry = postgres_registry(dir.path());
        assert!(!registry.is_loaded());
        assert_eq!(registry.load_passes(), 0);

        let first = registry.load() as *const LoadReport;
        write(dir.path(), "r.sql", "-- two\nSELECT 2;");
        let second = registry.load() as *const LoadReport;

        assert_eq!(first, second);
        assert_eq!(registry.load_passes(), 1);
        assert!(registry.get_query("postgres", "two").is_err());
        assert_eq!(registry.query_names("postgres"), vec!["one"]);
    }
}
