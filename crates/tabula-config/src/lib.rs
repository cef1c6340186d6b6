// crates/tabula-config/src/lib.rs
// ============================================================================
// Module: Tabula Config Library
// Description: Canonical configuration model and validation for Tabula.
// Purpose: Load store and audit settings and build a configured mapper.
// Dependencies: crate::config
// ============================================================================

//! ## Overview
//! `tabula-config` reads a TOML file describing the `SQLite` store and the
//! statement audit sink, validates it, and opens a ready-to-use
//! [`tabula_core::Mapper`].

pub mod config;

pub use config::AuditConfig;
pub use config::AuditSinkKind;
pub use config::CONFIG_ENV_VAR;
pub use config::ConfigError;
pub use config::MAX_BUSY_TIMEOUT_MS;
pub use config::MAX_CONFIG_FILE_SIZE;
pub use config::TabulaConfig;
