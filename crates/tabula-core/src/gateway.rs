// crates/tabula-core/src/gateway.rs
// ============================================================================
// Module: Store Gateway Interface
// Description: Execution boundary between the mapper and a relational store.
// Purpose: Run write statements and stream rows from read statements.
// Dependencies: thiserror, crate::value
// ============================================================================

//! ## Overview
//! The mapper never talks to a database directly. It hands statement text and
//! named parameters to a [`StoreGateway`], which executes them and returns the
//! generated identifier or a lazy sequence of rows. Gateway errors are opaque
//! to the mapper and propagate to the caller unchanged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::value::Params;
use crate::value::Row;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Store gateway errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Store I/O error.
    #[error("store io error: {0}")]
    Io(String),
    /// Store rejected or failed to execute a statement.
    #[error("store error: {0}")]
    Store(String),
    /// Store returned data the mapper cannot represent.
    #[error("store invalid data: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// Lazy, finite, single-pass sequence of rows produced by one read.
pub type RowStream = Box<dyn Iterator<Item = Result<Row, StoreError>> + Send>;

/// Relational store execution boundary.
///
/// Implementations own their session. A session shared between threads must
/// serialize statement execution internally.
pub trait StoreGateway {
    /// Executes a statement that mutates schema or data and commits it.
    ///
    /// Returns the identifier generated by an insert. The value returned for
    /// other statements is implementation-defined.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store rejects the statement.
    fn run_write(&self, statement: &str, params: &Params) -> Result<i64, StoreError>;

    /// Executes a statement that returns rows.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store rejects the statement.
    fn run_read(&self, statement: &str, params: &Params) -> Result<RowStream, StoreError>;
}

impl<G: StoreGateway + ?Sized> StoreGateway for &G {
    fn run_write(&self, statement: &str, params: &Params) -> Result<i64, StoreError> {
        (**self).run_write(statement, params)
    }

    fn run_read(&self, statement: &str, params: &Params) -> Result<RowStream, StoreError> {
        (**self).run_read(statement, params)
    }
}

impl<G: StoreGateway + ?Sized> StoreGateway for std::sync::Arc<G> {
    fn run_write(&self, statement: &str, params: &Params) -> Result<i64, StoreError> {
        (**self).run_write(statement, params)
    }

    fn run_read(&self, statement: &str, params: &Params) -> Result<RowStream, StoreError> {
        (**self).run_read(statement, params)
    }
}
