// crates/tabula-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Store Gateway
// Description: StoreGateway backed by a single SQLite connection.
// Purpose: Execute mapper statements with named parameters and auto-commit.
// Dependencies: tabula-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! [`SqliteGateway`] owns one `SQLite` connection guarded by a mutex. Each
//! write runs outside an explicit transaction, so `SQLite` commits it on
//! completion. Reads collect their rows while holding the lock and hand them
//! back as a row stream, leaving the connection free for the nested reads
//! that reference hydration issues.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::ToSql;
use rusqlite::types::Value as SqliteValue;
use rusqlite::types::ValueRef;
use serde::Deserialize;
use serde::Serialize;
use tabula_core::Params;
use tabula_core::Row;
use tabula_core::RowStream;
use tabula_core::SqlValue;
use tabula_core::StoreError;
use tabula_core::StoreGateway;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` gateway.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a config for `path` with default pragmas.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` gateway errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Invalid store data or configuration.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

impl From<rusqlite::Error> for SqliteStoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Db(error.to_string())
    }
}

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// `SQLite`-backed store gateway.
///
/// # Invariants
/// - Connection access is serialized through a mutex.
/// - No lock is held once a call returns.
#[derive(Clone)]
pub struct SqliteGateway {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteGateway {
    /// Opens the database file named by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the path is unsafe or the database
    /// cannot be opened.
    pub fn open(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let connection = open_connection(config)?;
        Ok(Self::from_connection(connection))
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Db`] when `SQLite` cannot open it.
    pub fn open_in_memory() -> Result<Self, SqliteStoreError> {
        let connection = Connection::open_in_memory()?;
        connection.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self::from_connection(connection))
    }

    /// Wraps an already configured connection.
    #[must_use]
    pub fn from_connection(connection: Connection) -> Self {
        Self {
            connection: Arc::new(Mutex::new(connection)),
        }
    }

    /// Locks the connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }

    /// Executes a write statement and returns the last insert rowid.
    fn execute_write(&self, statement: &str, params: &Params) -> Result<i64, SqliteStoreError> {
        let bound = bind_params(params);
        let named = named_params(&bound);
        let guard = self.lock()?;
        let mut prepared = guard.prepare(statement)?;
        prepared.execute(named.as_slice())?;
        drop(prepared);
        let id = guard.last_insert_rowid();
        drop(guard);
        Ok(id)
    }

    /// Executes a read statement and collects its rows.
    fn execute_read(&self, statement: &str, params: &Params) -> Result<Vec<Row>, SqliteStoreError> {
        let bound = bind_params(params);
        let named = named_params(&bound);
        let guard = self.lock()?;
        let mut prepared = guard.prepare(statement)?;
        let columns: Vec<String> =
            prepared.column_names().into_iter().map(ToString::to_string).collect();
        let mut rows = prepared.query(named.as_slice())?;
        let mut collected = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for (index, column) in columns.iter().enumerate() {
                values.push((column.clone(), column_value(column, row.get_ref(index)?)?));
            }
            collected.push(Row::new(values));
        }
        drop(rows);
        drop(prepared);
        drop(guard);
        Ok(collected)
    }
}

impl StoreGateway for SqliteGateway {
    fn run_write(&self, statement: &str, params: &Params) -> Result<i64, StoreError> {
        self.execute_write(statement, params).map_err(StoreError::from)
    }

    fn run_read(&self, statement: &str, params: &Params) -> Result<RowStream, StoreError> {
        let rows = self.execute_read(statement, params).map_err(StoreError::from)?;
        Ok(Box::new(rows.into_iter().map(Ok)))
    }
}

// ============================================================================
// SECTION: Value Conversion
// ============================================================================

/// Converts mapper parameters to `SQLite` values keyed by `:name`.
fn bind_params(params: &Params) -> Vec<(String, SqliteValue)> {
    params
        .iter()
        .map(|(name, value)| {
            let bound = match value {
                SqlValue::Null => SqliteValue::Null,
                SqlValue::Integer(value) => SqliteValue::Integer(*value),
                SqlValue::Real(value) => SqliteValue::Real(*value),
                SqlValue::Text(value) => SqliteValue::Text(value.clone()),
            };
            (format!(":{name}"), bound)
        })
        .collect()
}

/// Borrows bound values as the named-parameter slice `rusqlite` expects.
fn named_params(bound: &[(String, SqliteValue)]) -> Vec<(&str, &dyn ToSql)> {
    bound.iter().map(|(name, value)| (name.as_str(), value as &dyn ToSql)).collect()
}

/// Converts a column value read from `SQLite`.
fn column_value(column: &str, value: ValueRef<'_>) -> Result<SqlValue, SqliteStoreError> {
    match value {
        ValueRef::Null => Ok(SqlValue::Null),
        ValueRef::Integer(value) => Ok(SqlValue::Integer(value)),
        ValueRef::Real(value) => Ok(SqlValue::Real(value)),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|text| SqlValue::Text(text.to_string()))
            .map_err(|_| SqliteStoreError::Invalid(format!("column {column} is not utf-8 text"))),
        ValueRef::Blob(_) => {
            Err(SqliteStoreError::Invalid(format!("column {column} holds an unsupported blob")))
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.is_empty() {
        return Err(SqliteStoreError::Invalid("store path must be non-empty".to_string()));
    }
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with the configured pragmas.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies journal, sync, and busy-timeout pragmas.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))?;
    connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    Ok(())
}
