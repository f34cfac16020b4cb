//! # Permission Matrix
//!
//! This crate implements a tenant-scoped role/module permission matrix: for
//! every module of the host application and every role, four capability flags
//! (`visible`, `add`, `change`, `delete`) decide what users of that role may do.
//!
//! ## Features
//!
//! - Five fixed roles, with `super_admin` immutable and always fully granted
//! - Cascade rule: a module that is not visible grants nothing else
//! - Table-driven default policy for new tenants and newly added modules
//! - Merge-on-load that never overwrites an administrator's customizations
//! - Atomic single-cell, bulk and copy-between-roles mutations
//! - Bounded audit trail with one entry per changed cell
//! - Pluggable persistence with in-memory and JSON file stores
//! - Thread-safe, one independent engine per tenant
//!
//! ## Quick Start
//!
//! ```rust
//! use permission_matrix::{Catalog, Capability, ModuleSelector, PermissionEngine, Role, flags};
//!
//! // Activate a tenant; its matrix is seeded from the default policy
//! let engine = PermissionEngine::in_memory("acme", Catalog::crm())?;
//!
//! assert!(engine.can_view("contacts", Role::StandardUser));
//! assert!(!engine.can_delete("users", Role::Admin));
//!
//! // Hide a module from standard users; the other flags are cleared with it
//! engine.set_cell("alice@acme.test", "contacts", Role::StandardUser, flags![])?;
//! assert!(!engine.can_add("contacts", Role::StandardUser));
//!
//! // Let managers delete everywhere
//! engine.bulk_set("alice@acme.test", &ModuleSelector::All, Role::Manager, Capability::Delete, true)?;
//!
//! assert!(!engine.audit_log().is_empty());
//! # Ok::<(), permission_matrix::Error>(())
//! ```
//!
//! ## Audit Logging
//!
//! When the `audit` feature is enabled, the crate logs tenant activation,
//! mutations and rejected operations through the standard Rust logging
//! framework. To enable logging:
//!
//! ```rust
//! use permission_matrix::init_audit_logger;
//!
//! // Initialize logging (must be called early in program execution)
//! init_audit_logger();
//!
//! // Configure log level through RUST_LOG environment variable:
//! // RUST_LOG=info,permission_matrix=debug
//! ```

#[cfg(feature = "audit")]
pub fn init_audit_logger() {
    let _ = env_logger::try_init();
}

pub mod audit;
pub mod batch;
pub mod catalog;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod macros;
pub mod matrix;
pub mod metrics;
pub mod permission;
pub mod property_tests;
pub mod registry;
pub mod role;
pub mod storage;

#[cfg(feature = "async")]
pub mod async_support;

// Re-export main types for convenience
pub use crate::{
    audit::{AuditAction, AuditLogEntry, AuditRecorder},
    batch::{BulkOutcome, ModuleSelector},
    catalog::{Catalog, ModuleCatalog},
    defaults::{DefaultPolicy, ModuleSet, RoleRule},
    engine::{Activation, CellChange, EngineConfig, PermissionEngine, PersistenceMode},
    error::{Error, Result},
    matrix::Matrix,
    metrics::{EngineMetrics, MetricsSummary},
    permission::{Capability, PermissionFlags, PermissionRecord},
    registry::EngineRegistry,
    role::Role,
    storage::{MemoryStore, PermissionStore},
};

#[cfg(feature = "persistence")]
pub use crate::storage::FileStore;

#[cfg(feature = "async")]
pub use crate::async_support::AsyncPermissionEngine;
