// crates/tabula-core/src/value.rs
// ============================================================================
// Module: Tabula Values
// Description: Column values, record values, and statement parameter maps.
// Purpose: Separate what is bound to a statement from what a record holds.
// Dependencies: crate::record
// ============================================================================

//! ## Overview
//! [`SqlValue`] is what crosses the Store Gateway boundary: bound parameters
//! and raw column values. [`Value`] is what a [`Record`] holds; it adds a
//! hydrated record variant used by reference fields.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use crate::record::Record;

// ============================================================================
// SECTION: SQL Values
// ============================================================================

/// A value bound to a statement parameter or read from a column.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL `NULL`.
    Null,
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Real(f64),
    /// UTF-8 text.
    Text(String),
}

impl SqlValue {
    /// Returns the integer payload, if any.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }
}

/// Named statement parameters, keyed without the `:` sigil.
pub type Params = BTreeMap<String, SqlValue>;

/// One raw row: column names with their values, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    /// Ordered `(column, value)` pairs.
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    /// Creates a row from ordered column/value pairs.
    #[must_use]
    pub const fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self {
            columns,
        }
    }

    /// Returns the value of `column`, if present.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns.iter().find(|(name, _)| name == column).map(|(_, value)| value)
    }

    /// Iterates columns in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of columns.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true when the row has no columns.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl IntoIterator for Row {
    type Item = (String, SqlValue);
    type IntoIter = std::vec::IntoIter<(String, SqlValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

impl<K: Into<String>> FromIterator<(K, SqlValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, SqlValue)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(name, value)| (name.into(), value)).collect())
    }
}

// ============================================================================
// SECTION: Record Values
// ============================================================================

/// A value held by a record field.
///
/// Reference fields hold [`Value::Record`] once assigned; raw identifiers are
/// resolved at assignment time and never stored.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Unset or SQL `NULL`.
    Null,
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Real(f64),
    /// UTF-8 text.
    Text(String),
    /// A hydrated referenced record.
    Record(Box<Record>),
}

impl Value {
    /// Returns the integer payload, if any.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the float payload, if any.
    #[must_use]
    pub const fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the text payload, if any.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the referenced record, if any.
    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Returns true for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short label used in type mismatch diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
            Self::Record(_) => "record",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("None"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Real(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "'{value}'"),
            Self::Record(record) => write!(f, "{record}"),
        }
    }
}

impl From<SqlValue> for Value {
    fn from(value: SqlValue) -> Self {
        match value {
            SqlValue::Null => Self::Null,
            SqlValue::Integer(value) => Self::Integer(value),
            SqlValue::Real(value) => Self::Real(value),
            SqlValue::Text(value) => Self::Text(value),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Self::Record(Box::new(record))
    }
}

impl From<&Record> for Value {
    fn from(record: &Record) -> Self {
        Self::Record(Box::new(record.clone()))
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
