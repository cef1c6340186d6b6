// crates/tabula-core/src/audit.rs
// ============================================================================
// Module: Statement Audit Logging
// Description: Structured events for every statement the mapper executes.
// Purpose: Emit redacted statement logs without a logging framework dependency.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The mapper reports each statement it sends to the store as a
//! [`StatementAuditEvent`]. Sinks decide where events go: stderr, an
//! append-only file, or nowhere. Parameter values are never recorded; only
//! their names are.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::value::Params;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Statement classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    /// Schema or data mutation.
    Write,
    /// Row-returning query.
    Read,
}

/// Statement execution outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementOutcome {
    /// Store accepted the statement.
    Ok,
    /// Store rejected the statement.
    Error,
}

/// Audit event for one executed statement.
#[derive(Debug, Clone, Serialize)]
pub struct StatementAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Statement classification.
    pub kind: StatementKind,
    /// Table the statement targets.
    pub table: String,
    /// Statement text with parameter placeholders.
    pub statement: String,
    /// Names of the bound parameters.
    pub param_names: Vec<String>,
    /// Execution outcome.
    pub outcome: StatementOutcome,
    /// Store error message when the statement failed.
    pub error: Option<String>,
    /// Redaction classification for parameter values.
    pub redaction: &'static str,
}

impl StatementAuditEvent {
    /// Builds an event stamped with the current time.
    #[must_use]
    pub fn new(
        kind: StatementKind,
        table: &str,
        statement: &str,
        params: &Params,
        error: Option<String>,
    ) -> Self {
        Self {
            event: "tabula_statement",
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|duration| duration.as_millis())
                .unwrap_or_default(),
            kind,
            table: table.to_string(),
            statement: statement.to_string(),
            param_names: params.keys().cloned().collect(),
            outcome: if error.is_some() { StatementOutcome::Error } else { StatementOutcome::Ok },
            error,
            redaction: "values_omitted",
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Destination for statement audit events.
pub trait StatementAuditSink: Send + Sync {
    /// Records an event.
    fn record(&self, event: &StatementAuditEvent);
}

/// Sink that writes JSON lines to stderr.
pub struct StderrAuditSink;

impl StatementAuditSink for StderrAuditSink {
    fn record(&self, event: &StatementAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl StatementAuditSink for FileAuditSink {
    fn record(&self, event: &StatementAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Sink that drops every event.
pub struct NoopAuditSink;

impl StatementAuditSink for NoopAuditSink {
    fn record(&self, _event: &StatementAuditEvent) {}
}
