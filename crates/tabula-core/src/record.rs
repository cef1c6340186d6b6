// crates/tabula-core/src/record.rs
// ============================================================================
// Module: Record Instances
// Description: In-memory rows of a registered schema.
// Purpose: Hold field values and the persisted identifier of one record.
// Dependencies: crate::{error, field, schema, value}
// ============================================================================

//! ## Overview
//! A [`Record`] belongs to one [`Schema`] and holds a value for every declared
//! field plus the identifier. A record with no identifier has not been saved;
//! the identifier is assigned once, by the first successful insert, and is
//! never removed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::OrmError;
use crate::error::OrmResult;
use crate::field::ReferenceResolver;
use crate::schema::ID_FIELD;
use crate::schema::Schema;
use crate::value::Row;
use crate::value::SqlValue;
use crate::value::Value;

// ============================================================================
// SECTION: Record
// ============================================================================

/// One in-memory row.
///
/// # Invariants
/// - `values` has exactly one entry per declared field plus `id`.
/// - The `id` entry is [`Value::Null`] or [`Value::Integer`].
#[derive(Debug, Clone)]
pub struct Record {
    /// Owning schema.
    schema: Arc<Schema>,
    /// Current values keyed by field name, including `id`.
    values: BTreeMap<String, Value>,
}

impl Record {
    /// Creates an unsaved record with every field set to null.
    #[must_use]
    pub fn new(schema: &Arc<Schema>) -> Self {
        let mut values: BTreeMap<String, Value> = schema
            .fields()
            .iter()
            .map(|field| (field.name().to_string(), Value::Null))
            .collect();
        values.insert(ID_FIELD.to_string(), Value::Null);
        Self {
            schema: Arc::clone(schema),
            values,
        }
    }

    /// Creates an unsaved record and assigns `values` through [`Record::set`].
    ///
    /// # Errors
    ///
    /// Returns the first assignment error.
    pub fn with_values<I, K, V, R>(schema: &Arc<Schema>, values: I, resolver: &R) -> OrmResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
        R: ReferenceResolver + ?Sized,
    {
        let mut record = Self::new(schema);
        for (name, value) in values {
            record.set(name.as_ref(), value, resolver)?;
        }
        Ok(record)
    }

    /// Rebuilds a record from a raw row, resolving reference columns.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::UnknownField`] for a column the schema does not
    /// declare, [`OrmError::TypeMismatch`] for a non-integer `id`, and any
    /// resolution error.
    pub fn from_row<R: ReferenceResolver + ?Sized>(
        schema: &Arc<Schema>,
        row: Row,
        resolver: &R,
    ) -> OrmResult<Self> {
        let mut record = Self::new(schema);
        for (column, value) in row {
            if column == ID_FIELD {
                match value {
                    SqlValue::Integer(id) => record.assign_id(id),
                    SqlValue::Null => {}
                    other => {
                        return Err(OrmError::TypeMismatch {
                            field: ID_FIELD.to_string(),
                            expected: "integer".to_string(),
                            actual: Value::from(other).kind().to_string(),
                        });
                    }
                }
                continue;
            }
            schema.column(&column)?.set(&mut record, Value::from(value), resolver)?;
        }
        Ok(record)
    }

    /// Returns the owning schema.
    #[must_use]
    pub const fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the persisted identifier, if any.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        self.values.get(ID_FIELD).and_then(Value::as_integer)
    }

    /// Returns true once the record has been inserted.
    #[must_use]
    pub fn is_saved(&self) -> bool {
        self.id().is_some()
    }

    /// Reads a field (or `id`) by name.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::UnknownField`] when the schema has no such field.
    pub fn get(&self, name: &str) -> OrmResult<&Value> {
        self.schema.column(name)?.get(self)
    }

    /// Assigns a field by name through its descriptor.
    ///
    /// # Errors
    ///
    /// See [`crate::FieldDescriptor::set`].
    pub fn set<R: ReferenceResolver + ?Sized>(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        resolver: &R,
    ) -> OrmResult<()> {
        let schema = Arc::clone(&self.schema);
        schema.column(name)?.set(self, value.into(), resolver)
    }

    /// Iterates declared field values in declaration order, excluding `id`.
    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.schema.fields().iter().filter_map(|field| {
            self.values.get(field.name()).map(|value| (field.name(), value))
        })
    }

    /// Returns the stored slot for `name`, if the schema has one.
    pub(crate) fn slot(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Replaces a stored slot; callers have checked membership.
    pub(crate) fn put(&mut self, name: &str, value: Value) {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
        }
    }

    /// Records the identifier assigned by the store.
    pub(crate) fn assign_id(&mut self, id: i64) {
        self.put(ID_FIELD, Value::Integer(id));
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name() == other.schema.name() && self.values == other.values
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} id=", self.schema.name())?;
        match self.id() {
            Some(id) => write!(f, "{id}")?,
            None => f.write_str("None")?,
        }
        for (name, value) in self.values() {
            write!(f, " {name}={value}")?;
        }
        f.write_str(">")
    }
}
