// crates/tabula-core/src/mapper.rs
// ============================================================================
// Module: CRUD Protocol
// Description: Table lifecycle, insert-or-update, and filtered selection.
// Purpose: Translate schemas, records, and conditions into gateway statements.
// Dependencies: crate::{audit, condition, error, field, gateway, record, schema, value}
// ============================================================================

//! ## Overview
//! [`Mapper`] owns a [`StoreGateway`], the parameter token allocator and an
//! audit sink. It creates and drops backing tables, saves records and selects
//! them back, hydrating reference columns into full records.
//!
//! Save decides between insert and update on identifier nullness alone.
//! There is no dirty tracking: every save binds the full field set.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::audit::NoopAuditSink;
use crate::audit::StatementAuditEvent;
use crate::audit::StatementAuditSink;
use crate::audit::StatementKind;
use crate::condition::Condition;
use crate::condition::LoweredPredicate;
use crate::condition::ParamAllocator;
use crate::error::OrmError;
use crate::error::OrmResult;
use crate::field::ReferenceResolver;
use crate::gateway::RowStream;
use crate::gateway::StoreGateway;
use crate::record::Record;
use crate::schema::ID_COLUMN_DEFINITION;
use crate::schema::ID_FIELD;
use crate::schema::Schema;
use crate::value::Params;
use crate::value::SqlValue;
use crate::value::Value;

// ============================================================================
// SECTION: Mapper
// ============================================================================

/// CRUD front end over a store gateway.
pub struct Mapper<G> {
    /// Store execution boundary.
    gateway: G,
    /// Token allocator shared by every lowering through this mapper.
    params: ParamAllocator,
    /// Statement audit sink.
    audit: Arc<dyn StatementAuditSink>,
}

impl<G: StoreGateway> Mapper<G> {
    /// Creates a mapper that does not log statements.
    #[must_use]
    pub fn new(gateway: G) -> Self {
        Self::with_audit(gateway, Arc::new(NoopAuditSink))
    }

    /// Creates a mapper that reports every statement to `audit`.
    #[must_use]
    pub fn with_audit(gateway: G, audit: Arc<dyn StatementAuditSink>) -> Self {
        Self {
            gateway,
            params: ParamAllocator::new(),
            audit,
        }
    }

    /// Returns the underlying gateway.
    #[must_use]
    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Returns the parameter token allocator.
    #[must_use]
    pub const fn params(&self) -> &ParamAllocator {
        &self.params
    }

    /// Lowers a condition with this mapper's allocator.
    ///
    /// # Errors
    ///
    /// See [`Condition::lower`].
    pub fn lower(&self, condition: &Condition) -> OrmResult<LoweredPredicate> {
        condition.lower(&self.params)
    }

    // ============================================================================
    // SECTION: Table Lifecycle
    // ============================================================================

    /// Creates the backing table for `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::UnsupportedType`] before any statement is sent when
    /// a field has no column mapping, and a store error when the table exists.
    pub fn create_table(&self, schema: &Schema) -> OrmResult<()> {
        let mut columns = vec![ID_COLUMN_DEFINITION.to_string()];
        for (name, sql_type) in schema.column_types()? {
            columns.push(format!("{name} {sql_type}"));
        }
        let statement = format!("CREATE TABLE {} ({})", schema.table(), columns.join(", "));
        self.write(schema.table(), &statement, &Params::new())?;
        Ok(())
    }

    /// Drops the backing table for `schema` if it exists.
    ///
    /// # Errors
    ///
    /// Returns a store error when the gateway fails.
    pub fn drop_table(&self, schema: &Schema) -> OrmResult<()> {
        let statement = format!("DROP TABLE IF EXISTS {}", schema.table());
        self.write(schema.table(), &statement, &Params::new())?;
        Ok(())
    }

    // ============================================================================
    // SECTION: Records
    // ============================================================================

    /// Builds an unsaved record, resolving reference ids through this mapper.
    ///
    /// # Errors
    ///
    /// Returns the first assignment error.
    pub fn new_record<I, K, V>(&self, schema: &Arc<Schema>, values: I) -> OrmResult<Record>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        Record::with_values(schema, values, self)
    }

    /// Assigns a record field, resolving reference ids through this mapper.
    ///
    /// # Errors
    ///
    /// See [`crate::FieldDescriptor::set`].
    pub fn assign(
        &self,
        record: &mut Record,
        name: &str,
        value: impl Into<Value>,
    ) -> OrmResult<()> {
        record.set(name, value, self)
    }

    /// Inserts an unsaved record or updates a saved one.
    ///
    /// On insert the record receives the generated identifier. A failed write
    /// leaves the identifier unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::UnresolvedReference`] when a reference field points
    /// at an unsaved record, and any store error.
    pub fn save(&self, record: &mut Record) -> OrmResult<()> {
        let schema = Arc::clone(record.schema());
        let mut params = Params::new();
        for field in schema.fields() {
            params.insert(field.name().to_string(), field.to_sql(field.get(record)?)?);
        }
        let names: Vec<&str> = schema.fields().iter().map(|field| field.name()).collect();
        if let Some(id) = record.id() {
            if names.is_empty() {
                return Ok(());
            }
            let assignments: Vec<String> =
                names.iter().map(|name| format!("{name} = :{name}")).collect();
            let statement = format!(
                "UPDATE {} SET {} WHERE {ID_FIELD} = :{ID_FIELD}",
                schema.table(),
                assignments.join(", ")
            );
            params.insert(ID_FIELD.to_string(), SqlValue::Integer(id));
            self.write(schema.table(), &statement, &params)?;
            return Ok(());
        }
        let statement = if names.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", schema.table())
        } else {
            let placeholders: Vec<String> = names.iter().map(|name| format!(":{name}")).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                schema.table(),
                names.join(", "),
                placeholders.join(", ")
            )
        };
        let id = self.write(schema.table(), &statement, &params)?;
        record.assign_id(id);
        Ok(())
    }

    /// Selects records of `schema` matching `filter` (all records when `None`).
    ///
    /// The query is issued immediately; rows are hydrated lazily as the
    /// returned iterator advances. Each call re-issues the query.
    ///
    /// # Errors
    ///
    /// Returns a lowering error for the filter and any store error.
    pub fn select(
        &self,
        schema: &Arc<Schema>,
        filter: Option<&Condition>,
    ) -> OrmResult<Select<'_, G>> {
        let predicate = match filter {
            Some(condition) => self.lower(condition)?,
            None => LoweredPredicate::always(),
        };
        let statement = format!("SELECT * FROM {} WHERE {}", schema.table(), predicate.text);
        let rows = self.read(schema.table(), &statement, &predicate.params)?;
        Ok(Select {
            mapper: self,
            schema: Arc::clone(schema),
            rows,
        })
    }

    /// Loads the record of `schema` with identifier `id`.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::AmbiguousReference`] when several rows share the id,
    /// and any select error.
    pub fn find(&self, schema: &Arc<Schema>, id: i64) -> OrmResult<Option<Record>> {
        let filter = schema.id_field().equals(id);
        let mut matches = self.select(schema, Some(&filter))?;
        let Some(first) = matches.next().transpose()? else {
            return Ok(None);
        };
        let mut extra = 0usize;
        for row in matches {
            row?;
            extra += 1;
        }
        if extra > 0 {
            return Err(OrmError::AmbiguousReference {
                schema: schema.name().to_string(),
                id,
                matches: extra + 1,
            });
        }
        Ok(Some(first))
    }

    // ============================================================================
    // SECTION: Gateway Calls
    // ============================================================================

    /// Runs a write statement and reports it to the audit sink.
    fn write(&self, table: &str, statement: &str, params: &Params) -> OrmResult<i64> {
        let result = self.gateway.run_write(statement, params);
        self.audit.record(&StatementAuditEvent::new(
            StatementKind::Write,
            table,
            statement,
            params,
            result.as_ref().err().map(ToString::to_string),
        ));
        Ok(result?)
    }

    /// Runs a read statement and reports it to the audit sink.
    fn read(&self, table: &str, statement: &str, params: &Params) -> OrmResult<RowStream> {
        let result = self.gateway.run_read(statement, params);
        self.audit.record(&StatementAuditEvent::new(
            StatementKind::Read,
            table,
            statement,
            params,
            result.as_ref().err().map(ToString::to_string),
        ));
        Ok(result?)
    }
}

impl<G: StoreGateway> ReferenceResolver for Mapper<G> {
    fn resolve(&self, schema: &Arc<Schema>, id: i64) -> OrmResult<Record> {
        self.find(schema, id)?.ok_or_else(|| OrmError::MissingReference {
            schema: schema.name().to_string(),
            id,
        })
    }
}

// ============================================================================
// SECTION: Select
// ============================================================================

/// Lazy, single-pass sequence of hydrated records from one select.
pub struct Select<'m, G> {
    /// Mapper used to resolve reference columns.
    mapper: &'m Mapper<G>,
    /// Schema of the selected records.
    schema: Arc<Schema>,
    /// Raw rows from the gateway.
    rows: RowStream,
}

impl<G> Select<'_, G> {
    /// Returns the schema of the selected records.
    #[must_use]
    pub const fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}

impl<G: StoreGateway> Iterator for Select<'_, G> {
    type Item = OrmResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        Some(
            row.map_err(OrmError::from)
                .and_then(|row| Record::from_row(&self.schema, row, self.mapper)),
        )
    }
}
