// crates/tabula-core/src/error.rs
// ============================================================================
// Module: Tabula Errors
// Description: Error taxonomy for schema, field, condition, and CRUD failures.
// Purpose: Give every mapper failure a structured, matchable variant.
// Dependencies: thiserror, crate::gateway
// ============================================================================

//! ## Overview
//! The mapper performs no retries and no local recovery. Every failure is
//! returned to the immediate caller of the operation that triggered it.

use thiserror::Error;

use crate::gateway::StoreError;

/// Result alias used across the mapper.
pub type OrmResult<T> = Result<T, OrmError>;

/// Mapper errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrmError {
    // ============================================================================
    // SECTION: Schema Errors
    // ============================================================================
    /// A declared field type has no column mapping.
    #[error("field {field} has unsupported type {declared}")]
    UnsupportedType {
        /// Field name.
        field: String,
        /// Declared type label.
        declared: String,
    },

    /// A declaration lists the same field twice or names a field `id`.
    #[error("schema {schema} declares field {field} more than once")]
    DuplicateField {
        /// Schema name.
        schema: String,
        /// Offending field name.
        field: String,
    },

    /// A declaration is structurally invalid.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// A different declaration was registered under an existing name.
    #[error("schema {0} is already registered with a different declaration")]
    SchemaConflict(String),

    // ============================================================================
    // SECTION: Field Errors
    // ============================================================================
    /// The field is not part of the record's schema.
    #[error("schema {schema} has no field {field}")]
    UnknownField {
        /// Schema name.
        schema: String,
        /// Requested field name.
        field: String,
    },

    /// The field cannot be assigned by callers.
    #[error("field {field} is read-only")]
    ReadOnlyField {
        /// Field name.
        field: String,
    },

    /// A value does not fit the field's declared type.
    #[error("field {field} expects {expected}, got {actual}")]
    TypeMismatch {
        /// Field name.
        field: String,
        /// Expected value kind.
        expected: String,
        /// Actual value kind.
        actual: String,
    },

    // ============================================================================
    // SECTION: Reference Errors
    // ============================================================================
    /// A reference field points at a record that has not been saved.
    #[error("field {field} references an unsaved record")]
    UnresolvedReference {
        /// Field name.
        field: String,
    },

    /// Resolving a reference by id found no record.
    #[error("no {schema} record with id {id}")]
    MissingReference {
        /// Target schema name.
        schema: String,
        /// Requested identifier.
        id: i64,
    },

    /// Resolving a reference by id found several records.
    #[error("{matches} {schema} records share id {id}")]
    AmbiguousReference {
        /// Target schema name.
        schema: String,
        /// Requested identifier.
        id: i64,
        /// Number of matching rows seen (at least two).
        matches: usize,
    },

    // ============================================================================
    // SECTION: Lowering Errors
    // ============================================================================
    /// Two condition leaves lowered to the same parameter token.
    #[error("parameter token {token} allocated twice")]
    ParameterCollision {
        /// Colliding token.
        token: String,
    },

    // ============================================================================
    // SECTION: Store Errors
    // ============================================================================
    /// The store gateway rejected a statement.
    #[error(transparent)]
    Store(#[from] StoreError),
}
