// crates/tabula-core/src/field.rs
// ============================================================================
// Module: Field Descriptors
// Description: Per-field metadata and accessor behavior.
// Purpose: Own get/set semantics, reference resolution, and SQL lowering.
// Dependencies: crate::{condition, error, record, schema, value}
// ============================================================================

//! ## Overview
//! A [`FieldDescriptor`] describes one attribute of a [`Schema`]. It reads and
//! writes the attribute on a [`Record`], derives the column type, lowers values
//! to [`SqlValue`] and builds condition leaves.
//!
//! Reference fields are stored as integer foreign keys. Assigning a raw
//! identifier to one resolves it to the referenced record right away, so a
//! reference field never holds a bare id after assignment.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::condition::ComparisonOp;
use crate::condition::Condition;
use crate::error::OrmError;
use crate::error::OrmResult;
use crate::record::Record;
use crate::schema::ID_FIELD;
use crate::schema::Schema;
use crate::value::SqlValue;
use crate::value::Value;

// ============================================================================
// SECTION: Declared Types
// ============================================================================

/// Declared value type of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclaredType {
    /// 64-bit signed integer column.
    Integer,
    /// UTF-8 text column.
    Text,
    /// 64-bit float column.
    Real,
    /// Foreign key to another registered schema.
    Reference(Arc<Schema>),
    /// Caller type with no column mapping.
    Custom(String),
}

impl DeclaredType {
    /// Label used in diagnostics.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Integer => "integer",
            Self::Text => "text",
            Self::Real => "real",
            Self::Reference(schema) => schema.name(),
            Self::Custom(name) => name,
        }
    }
}

// ============================================================================
// SECTION: Reference Resolution
// ============================================================================

/// Resolves a raw identifier to the referenced record.
pub trait ReferenceResolver {
    /// Loads the record of `schema` whose identifier is `id`.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::MissingReference`] when no record matches and
    /// [`OrmError::AmbiguousReference`] when several do.
    fn resolve(&self, schema: &Arc<Schema>, id: i64) -> OrmResult<Record>;
}

impl<R: ReferenceResolver + ?Sized> ReferenceResolver for &R {
    fn resolve(&self, schema: &Arc<Schema>, id: i64) -> OrmResult<Record> {
        (**self).resolve(schema, id)
    }
}

/// Resolver for records built without a store; every lookup misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedResolver;

impl ReferenceResolver for DetachedResolver {
    fn resolve(&self, schema: &Arc<Schema>, id: i64) -> OrmResult<Record> {
        Err(OrmError::MissingReference {
            schema: schema.name().to_string(),
            id,
        })
    }
}

// ============================================================================
// SECTION: Field Descriptor
// ============================================================================

/// Metadata and accessor behavior for one schema attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Field (and column) name.
    name: String,
    /// Declared value type.
    declared: DeclaredType,
}

impl FieldDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub fn new(name: impl Into<String>, declared: DeclaredType) -> Self {
        Self {
            name: name.into(),
            declared,
        }
    }

    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared type.
    #[must_use]
    pub const fn declared(&self) -> &DeclaredType {
        &self.declared
    }

    /// Returns the referenced schema for reference fields.
    #[must_use]
    pub const fn reference(&self) -> Option<&Arc<Schema>> {
        match &self.declared {
            DeclaredType::Reference(schema) => Some(schema),
            _ => None,
        }
    }

    /// Returns the value currently stored for this field on `record`.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::UnknownField`] when the field is not part of the
    /// record's schema.
    pub fn get<'r>(&self, record: &'r Record) -> OrmResult<&'r Value> {
        record.slot(&self.name).ok_or_else(|| OrmError::UnknownField {
            schema: record.schema().name().to_string(),
            field: self.name.clone(),
        })
    }

    /// Stores `value` for this field on `record`.
    ///
    /// A raw integer assigned to a reference field is resolved through
    /// `resolver` and the resolved record is stored instead.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::ReadOnlyField`] for `id`, [`OrmError::UnknownField`]
    /// when the field is not part of the record's schema,
    /// [`OrmError::TypeMismatch`] when a reference field is given text, a float
    /// or a record of another schema, and any resolution error.
    pub fn set<R: ReferenceResolver + ?Sized>(
        &self,
        record: &mut Record,
        value: Value,
        resolver: &R,
    ) -> OrmResult<()> {
        if self.name == ID_FIELD {
            return Err(OrmError::ReadOnlyField {
                field: self.name.clone(),
            });
        }
        if record.slot(&self.name).is_none() {
            return Err(OrmError::UnknownField {
                schema: record.schema().name().to_string(),
                field: self.name.clone(),
            });
        }
        let value = match (self.reference(), value) {
            (Some(target), Value::Integer(id)) => Value::from(resolver.resolve(target, id)?),
            (Some(target), Value::Record(linked)) if linked.schema().name() != target.name() => {
                return Err(self.mismatch(target.name(), &Value::Record(linked)));
            }
            (Some(target), value @ (Value::Real(_) | Value::Text(_))) => {
                return Err(self.mismatch(target.name(), &value));
            }
            (_, value) => value,
        };
        record.put(&self.name, value);
        Ok(())
    }

    /// Returns the backing column type.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::UnsupportedType`] for custom declared types.
    pub fn sql_type(&self) -> OrmResult<&'static str> {
        match &self.declared {
            DeclaredType::Integer | DeclaredType::Reference(_) => Ok("INTEGER"),
            DeclaredType::Text => Ok("TEXT"),
            DeclaredType::Real => Ok("REAL"),
            DeclaredType::Custom(name) => Err(OrmError::UnsupportedType {
                field: self.name.clone(),
                declared: name.clone(),
            }),
        }
    }

    /// Lowers a field value to the value bound in a statement.
    ///
    /// Reference fields bind the referenced record's identifier; an integer is
    /// taken as an identifier that was already extracted.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::UnresolvedReference`] when the referenced record has
    /// no identifier yet and [`OrmError::TypeMismatch`] for values that cannot
    /// be bound to this field.
    pub fn to_sql(&self, value: &Value) -> OrmResult<SqlValue> {
        if let Some(target) = self.reference() {
            return match value {
                Value::Null => Ok(SqlValue::Null),
                Value::Integer(id) => Ok(SqlValue::Integer(*id)),
                Value::Record(record) if record.schema().name() != target.name() => {
                    Err(self.mismatch(target.name(), value))
                }
                Value::Record(record) => record.id().map(SqlValue::Integer).ok_or_else(|| {
                    OrmError::UnresolvedReference {
                        field: self.name.clone(),
                    }
                }),
                other => Err(self.mismatch(target.name(), other)),
            };
        }
        match value {
            Value::Null => Ok(SqlValue::Null),
            Value::Integer(value) => Ok(SqlValue::Integer(*value)),
            Value::Real(value) => Ok(SqlValue::Real(*value)),
            Value::Text(value) => Ok(SqlValue::Text(value.clone())),
            Value::Record(_) => Err(self.mismatch(self.declared.label(), value)),
        }
    }

    /// Builds a type mismatch error for this field.
    fn mismatch(&self, expected: &str, actual: &Value) -> OrmError {
        OrmError::TypeMismatch {
            field: self.name.clone(),
            expected: expected.to_string(),
            actual: actual.kind().to_string(),
        }
    }

    // ============================================================================
    // SECTION: Condition Builders
    // ============================================================================

    /// Builds `field = value`.
    #[must_use]
    pub fn equals(&self, value: impl Into<Value>) -> Condition {
        Condition::comparison(ComparisonOp::Eq, self.clone(), value)
    }

    /// Builds `field != value`.
    #[must_use]
    pub fn not_equals(&self, value: impl Into<Value>) -> Condition {
        Condition::comparison(ComparisonOp::NotEq, self.clone(), value)
    }

    /// Builds `field < value`.
    #[must_use]
    pub fn less_than(&self, value: impl Into<Value>) -> Condition {
        Condition::comparison(ComparisonOp::Lt, self.clone(), value)
    }

    /// Builds `field <= value`.
    #[must_use]
    pub fn less_or_equal(&self, value: impl Into<Value>) -> Condition {
        Condition::comparison(ComparisonOp::LtEq, self.clone(), value)
    }

    /// Builds `field > value`.
    #[must_use]
    pub fn greater_than(&self, value: impl Into<Value>) -> Condition {
        Condition::comparison(ComparisonOp::Gt, self.clone(), value)
    }

    /// Builds `field >= value`.
    #[must_use]
    pub fn greater_or_equal(&self, value: impl Into<Value>) -> Condition {
        Condition::comparison(ComparisonOp::GtEq, self.clone(), value)
    }
}
