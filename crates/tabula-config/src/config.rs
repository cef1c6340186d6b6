// crates/tabula-config/src/config.rs
// ============================================================================
// Module: Tabula Configuration
// Description: Configuration loading and validation for Tabula.
// Purpose: Parse store and audit settings from TOML with hard limits.
// Dependencies: tabula-core, tabula-store-sqlite, serde, toml, thiserror
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file. The path comes from the caller,
//! then the `TABULA_CONFIG` environment variable, then `tabula.toml` in the
//! working directory. Files over the size limit, non-UTF-8 content, and
//! invalid values are rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use tabula_core::FileAuditSink;
use tabula_core::Mapper;
use tabula_core::NoopAuditSink;
use tabula_core::StatementAuditSink;
use tabula_core::StderrAuditSink;
use tabula_store_sqlite::SqliteGateway;
use tabula_store_sqlite::SqliteStoreConfig;
use tabula_store_sqlite::SqliteStoreError;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "tabula.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "TABULA_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of the resolved config file path in bytes.
const MAX_CONFIG_PATH_LENGTH: usize = 4096;
/// Maximum busy timeout accepted for the store (ms).
pub const MAX_BUSY_TIMEOUT_MS: u64 = 600_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Statement audit destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// Discard statement events.
    #[default]
    None,
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to `audit.path`.
    File,
}

/// Statement audit configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AuditConfig {
    /// Sink selection.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Log file path for the `file` sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AuditConfig {
    /// Validates audit settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the file sink lacks a usable path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required for the file sink".to_string()))
            }
            (_, Some(path)) => require_path("audit.path", path),
            (_, None) => Ok(()),
        }
    }

    /// Builds the configured sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the audit file cannot be opened.
    pub fn build_sink(&self) -> Result<Arc<dyn StatementAuditSink>, ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::None, _) => Ok(Arc::new(NoopAuditSink)),
            (AuditSinkKind::Stderr, _) => Ok(Arc::new(StderrAuditSink)),
            (AuditSinkKind::File, Some(path)) => {
                let sink =
                    FileAuditSink::new(path).map_err(|err| ConfigError::Io(err.to_string()))?;
                Ok(Arc::new(sink))
            }
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required for the file sink".to_string()))
            }
        }
    }
}

/// Tabula configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabulaConfig {
    /// `SQLite` store settings.
    pub store: SqliteStoreConfig,
    /// Statement audit settings.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl TabulaConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path);
        check_config_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for invalid values.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// Store path limits are enforced when the store is opened.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_path("store.path", &self.store.path)?;
        if self.store.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "store.busy_timeout_ms out of range: {} (max {MAX_BUSY_TIMEOUT_MS})",
                self.store.busy_timeout_ms
            )));
        }
        self.audit.validate()
    }

    /// Opens the configured store and wraps it in a mapper.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Store`] when the database cannot be opened and
    /// [`ConfigError::Io`] when the audit sink cannot be created.
    pub fn open_mapper(&self) -> Result<Mapper<SqliteGateway>, ConfigError> {
        let audit = self.audit.build_sink()?;
        let gateway = SqliteGateway::open(&self.store)?;
        Ok(Mapper::with_audit(gateway, audit))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// The configured store could not be opened.
    #[error("config store error: {0}")]
    Store(#[from] SqliteStoreError),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the caller or environment defaults.
fn resolve_path(path: Option<&Path>) -> PathBuf {
    if let Some(path) = path {
        return path.to_path_buf();
    }
    env::var_os(CONFIG_ENV_VAR).map_or_else(|| PathBuf::from(DEFAULT_CONFIG_NAME), PathBuf::from)
}

/// Rejects config file paths over the length limit before reading.
fn check_config_path(path: &Path) -> Result<(), ConfigError> {
    let length = path.as_os_str().len();
    if length > MAX_CONFIG_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "config path is {length} bytes (max {MAX_CONFIG_PATH_LENGTH})"
        )));
    }
    Ok(())
}

/// Rejects blank path settings.
fn require_path(field: &str, path: &Path) -> Result<(), ConfigError> {
    if path.to_string_lossy().trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    Ok(())
}
