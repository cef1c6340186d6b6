// crates/tabula-core/src/lib.rs
// ============================================================================
// Module: Tabula Core Library
// Description: Public API surface for the Tabula mapping engine.
// Purpose: Expose schemas, records, conditions, and the CRUD mapper.
// Dependencies: crate::{audit, condition, error, field, gateway, mapper, record, schema, value}
// ============================================================================

//! ## Overview
//! Tabula maps declared record schemas onto relational tables. Callers
//! register a [`SchemaDecl`], build [`Record`]s, persist them through a
//! [`Mapper`] and select them back with [`Condition`] filters that lower to
//! parameterized predicate text. The relational engine sits behind the
//! [`StoreGateway`] trait.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod condition;
pub mod error;
pub mod field;
pub mod gateway;
pub mod mapper;
pub mod record;
pub mod schema;
pub mod value;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StatementAuditEvent;
pub use audit::StatementAuditSink;
pub use audit::StatementKind;
pub use audit::StatementOutcome;
pub use audit::StderrAuditSink;
pub use condition::ComparisonOp;
pub use condition::Condition;
pub use condition::LoweredPredicate;
pub use condition::ParamAllocator;
pub use error::OrmError;
pub use error::OrmResult;
pub use field::DeclaredType;
pub use field::DetachedResolver;
pub use field::FieldDescriptor;
pub use field::ReferenceResolver;
pub use gateway::RowStream;
pub use gateway::StoreError;
pub use gateway::StoreGateway;
pub use mapper::Mapper;
pub use mapper::Select;
pub use record::Record;
pub use schema::ID_FIELD;
pub use schema::Schema;
pub use schema::SchemaDecl;
pub use schema::SchemaRegistry;
pub use schema::register_schema;
pub use schema::table_name;
pub use value::Params;
pub use value::Row;
pub use value::SqlValue;
pub use value::Value;
