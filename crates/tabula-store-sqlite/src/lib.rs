// crates/tabula-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Store Gateway
// Description: Tabula StoreGateway backend using SQLite.
// Purpose: Provide a concrete relational store for the Tabula mapper.
// Dependencies: tabula-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a `SQLite`-backed [`tabula_core::StoreGateway`]. One
//! connection serves the whole process; statements auto-commit and named
//! parameters are bound exactly as the mapper produced them.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteGateway;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
