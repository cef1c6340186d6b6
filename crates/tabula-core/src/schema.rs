// crates/tabula-core/src/schema.rs
// ============================================================================
// Module: Schema Registry
// Description: Derives immutable schemas from explicit declarations.
// Purpose: Fix table names and ordered field descriptors once per record type.
// Dependencies: crate::{error, field}
// ============================================================================

//! ## Overview
//! A [`SchemaDecl`] lists a record type's name and its fields in declaration
//! order. [`register_schema`] turns it into an immutable [`Schema`]: the table
//! name is the lowercased type name with an `s` appended, every declared field
//! becomes a [`FieldDescriptor`], and an implicit integer `id` descriptor is
//! appended. [`SchemaRegistry`] makes registration idempotent per name.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::RwLock;

use crate::error::OrmError;
use crate::error::OrmResult;
use crate::field::DeclaredType;
use crate::field::FieldDescriptor;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Name of the implicit identifier field (and primary key column).
pub const ID_FIELD: &str = "id";

/// Column definition used for the implicit identifier.
pub const ID_COLUMN_DEFINITION: &str = "id INTEGER PRIMARY KEY";

// ============================================================================
// SECTION: Declarations
// ============================================================================

/// Declared shape of a record type, before registration.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDecl {
    /// Declared type name (e.g. `Talk`).
    name: String,
    /// Declared fields in declaration order.
    fields: Vec<(String, DeclaredType)>,
}

impl SchemaDecl {
    /// Starts a declaration for the named record type.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Appends a declared field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, declared: DeclaredType) -> Self {
        self.fields.push((name.into(), declared));
        self
    }

    /// Returns the declared type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared fields in order.
    #[must_use]
    pub fn fields(&self) -> &[(String, DeclaredType)] {
        &self.fields
    }
}

// ============================================================================
// SECTION: Schema
// ============================================================================

/// Registered, immutable description of a record type.
///
/// # Invariants
/// - `fields` keeps declaration order and never contains `id`.
/// - Field names are unique.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// Declared type name.
    name: String,
    /// Backing table name.
    table: String,
    /// Declared field descriptors in declaration order.
    fields: Vec<FieldDescriptor>,
    /// Implicit identifier descriptor.
    id: FieldDescriptor,
}

impl Schema {
    /// Returns the declared type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the backing table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the declared field descriptors, excluding `id`.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Returns the implicit identifier descriptor.
    #[must_use]
    pub const fn id_field(&self) -> &FieldDescriptor {
        &self.id
    }

    /// Looks up a descriptor by name, including `id`.
    ///
    /// This is the schema-level accessor: the descriptor it returns is the
    /// column reference used to build conditions.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        if name == ID_FIELD {
            return Some(&self.id);
        }
        self.fields.iter().find(|field| field.name() == name)
    }

    /// Looks up a descriptor by name, failing on unknown names.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::UnknownField`] when the schema has no such field.
    pub fn column(&self, name: &str) -> OrmResult<&FieldDescriptor> {
        self.field(name).ok_or_else(|| OrmError::UnknownField {
            schema: self.name.clone(),
            field: name.to_string(),
        })
    }

    /// Derives `(name, sql type)` for every declared field, in order.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::UnsupportedType`] for the first field whose type has
    /// no column mapping.
    pub fn column_types(&self) -> OrmResult<Vec<(&str, &'static str)>> {
        self.fields.iter().map(|field| Ok((field.name(), field.sql_type()?))).collect()
    }
}

/// Derives a table name from a declared type name.
#[must_use]
pub fn table_name(type_name: &str) -> String {
    format!("{}s", type_name.to_lowercase())
}

/// Builds an immutable schema from a declaration.
///
/// Column types are not checked here; [`Schema::column_types`] reports
/// unsupported types when a table is created.
///
/// # Errors
///
/// Returns [`OrmError::InvalidSchema`] for an empty type name or field name and
/// [`OrmError::DuplicateField`] when a field is declared twice or named `id`.
pub fn register_schema(decl: SchemaDecl) -> OrmResult<Arc<Schema>> {
    let SchemaDecl {
        name,
        fields: declared,
    } = decl;
    if name.trim().is_empty() {
        return Err(OrmError::InvalidSchema("schema name must be non-empty".to_string()));
    }
    let mut fields: Vec<FieldDescriptor> = Vec::with_capacity(declared.len());
    for (field_name, declared_type) in declared {
        if field_name.trim().is_empty() {
            return Err(OrmError::InvalidSchema(format!(
                "schema {name} declares a field with an empty name"
            )));
        }
        if field_name == ID_FIELD || fields.iter().any(|field| field.name() == field_name) {
            return Err(OrmError::DuplicateField {
                schema: name,
                field: field_name,
            });
        }
        fields.push(FieldDescriptor::new(field_name, declared_type));
    }
    Ok(Arc::new(Schema {
        table: table_name(&name),
        name,
        fields,
        id: FieldDescriptor::new(ID_FIELD, DeclaredType::Integer),
    }))
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Name-keyed set of registered schemas.
///
/// Registering the same declaration twice returns the schema from the first
/// registration.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    /// Registered schemas keyed by declared type name.
    schemas: RwLock<BTreeMap<String, Arc<Schema>>>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a declaration, or returns the existing identical schema.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::SchemaConflict`] when the name is taken by a
    /// different declaration, plus any [`register_schema`] error.
    pub fn register(&self, decl: SchemaDecl) -> OrmResult<Arc<Schema>> {
        let schema = register_schema(decl)?;
        let mut guard = self
            .schemas
            .write()
            .map_err(|_| OrmError::InvalidSchema("schema registry lock poisoned".to_string()))?;
        if let Some(existing) = guard.get(schema.name()) {
            if **existing == *schema {
                return Ok(Arc::clone(existing));
            }
            return Err(OrmError::SchemaConflict(schema.name().to_string()));
        }
        guard.insert(schema.name().to_string(), Arc::clone(&schema));
        drop(guard);
        Ok(schema)
    }

    /// Returns the schema registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Schema>> {
        self.schemas.read().ok().and_then(|guard| guard.get(name).cloned())
    }

    /// Returns registered schema names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.schemas.read().map(|guard| guard.keys().cloned().collect()).unwrap_or_default()
    }
}
