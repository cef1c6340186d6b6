// crates/tabula-core/tests/support/mod.rs
// ============================================================================
// Module: Test Support
// Description: Scripted store gateway and audit capture for mapper tests.
// ============================================================================
//! ## Overview
//! Shared fixtures: a gateway that records every statement and replays queued
//! responses, an audit sink that keeps events in memory, and sample schemas.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    dead_code,
    reason = "Test-only helpers; not every test binary uses every helper."
)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use tabula_core::DeclaredType;
use tabula_core::Params;
use tabula_core::Row;
use tabula_core::RowStream;
use tabula_core::Schema;
use tabula_core::SchemaDecl;
use tabula_core::SqlValue;
use tabula_core::StatementAuditEvent;
use tabula_core::StatementAuditSink;
use tabula_core::StoreError;
use tabula_core::StoreGateway;
use tabula_core::register_schema;

// ========================================================================
// SECTION: Scripted Gateway
// ========================================================================

/// One statement seen by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    pub statement: String,
    pub params: Params,
}

/// Gateway that records statements and replays scripted results.
#[derive(Default)]
pub struct ScriptedGateway {
    executed: Mutex<Vec<Executed>>,
    write_results: Mutex<VecDeque<Result<i64, StoreError>>>,
    read_results: Mutex<VecDeque<Result<Vec<Row>, StoreError>>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the result of the next unscripted write.
    pub fn push_write(&self, result: Result<i64, StoreError>) {
        self.write_results.lock().unwrap().push_back(result);
    }

    /// Queues the rows returned by the next read.
    pub fn push_rows(&self, rows: Vec<Row>) {
        self.read_results.lock().unwrap().push_back(Ok(rows));
    }

    /// Queues a failure for the next read.
    pub fn push_read_error(&self, error: StoreError) {
        self.read_results.lock().unwrap().push_back(Err(error));
    }

    pub fn executed(&self) -> Vec<Executed> {
        self.executed.lock().unwrap().clone()
    }

    pub fn statements(&self) -> Vec<String> {
        self.executed().into_iter().map(|entry| entry.statement).collect()
    }

    pub fn last(&self) -> Executed {
        self.executed().last().cloned().expect("no statement executed")
    }

    fn log(&self, statement: &str, params: &Params) {
        self.executed.lock().unwrap().push(Executed {
            statement: statement.to_string(),
            params: params.clone(),
        });
    }
}

impl StoreGateway for ScriptedGateway {
    fn run_write(&self, statement: &str, params: &Params) -> Result<i64, StoreError> {
        self.log(statement, params);
        self.write_results.lock().unwrap().pop_front().unwrap_or(Ok(0))
    }

    fn run_read(&self, statement: &str, params: &Params) -> Result<RowStream, StoreError> {
        self.log(statement, params);
        let rows = self.read_results.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()))?;
        Ok(Box::new(rows.into_iter().map(Ok)))
    }
}

// ========================================================================
// SECTION: Audit Capture
// ========================================================================

/// Audit sink that keeps events in memory.
#[derive(Default)]
pub struct CapturingAuditSink {
    events: Mutex<Vec<StatementAuditEvent>>,
}

impl CapturingAuditSink {
    pub fn events(&self) -> Vec<StatementAuditEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl StatementAuditSink for CapturingAuditSink {
    fn record(&self, event: &StatementAuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ========================================================================
// SECTION: Sample Schemas
// ========================================================================

pub fn speaker_schema() -> Arc<Schema> {
    register_schema(
        SchemaDecl::new("Speaker")
            .field("name", DeclaredType::Text)
            .field("company", DeclaredType::Text),
    )
    .unwrap()
}

pub fn talk_schema(speaker: &Arc<Schema>) -> Arc<Schema> {
    register_schema(
        SchemaDecl::new("Talk")
            .field("title", DeclaredType::Text)
            .field("duration", DeclaredType::Integer)
            .field("speaker", DeclaredType::Reference(Arc::clone(speaker))),
    )
    .unwrap()
}

pub fn speaker_row(id: i64, name: &str, company: &str) -> Row {
    Row::from_iter([
        ("id", SqlValue::Integer(id)),
        ("name", SqlValue::Text(name.to_string())),
        ("company", SqlValue::Text(company.to_string())),
    ])
}

pub fn talk_row(id: i64, title: &str, duration: i64, speaker_id: i64) -> Row {
    Row::from_iter([
        ("id", SqlValue::Integer(id)),
        ("title", SqlValue::Text(title.to_string())),
        ("duration", SqlValue::Integer(duration)),
        ("speaker", SqlValue::Integer(speaker_id)),
    ])
}
