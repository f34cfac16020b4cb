//! Async support for the permission engine (requires 'async' feature).
//!
//! The engine itself is synchronous and guards its state with a blocking
//! lock, and store writes may perform I/O. This wrapper runs mutations and
//! saves on tokio's blocking pool so they never stall an async executor.
//! Queries are cheap reads and run inline.

use crate::{
    audit::AuditLogEntry,
    batch::{BulkOutcome, ModuleSelector},
    engine::{CellChange, PermissionEngine},
    error::{Error, Result},
    permission::{Capability, PermissionFlags},
    role::Role,
    storage::PermissionStore,
};
use std::sync::Arc;

/// Async wrapper around a permission engine.
pub struct AsyncPermissionEngine<S>
where
    S: PermissionStore + 'static,
{
    inner: Arc<PermissionEngine<S>>,
}

impl<S> Clone for AsyncPermissionEngine<S>
where
    S: PermissionStore + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> AsyncPermissionEngine<S>
where
    S: PermissionStore + 'static,
{
    /// Wrap an engine.
    pub fn new(engine: Arc<PermissionEngine<S>>) -> Self {
        Self { inner: engine }
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &Arc<PermissionEngine<S>> {
        &self.inner
    }

    pub fn check(&self, module: &str, role: Role, capability: Capability) -> bool {
        self.inner.check(module, role, capability)
    }

    pub fn audit_log(&self) -> Vec<AuditLogEntry> {
        self.inner.audit_log()
    }

    /// Update a single cell.
    pub async fn set_cell(
        &self,
        actor: &str,
        module: &str,
        role: Role,
        flags: PermissionFlags,
    ) -> Result<CellChange> {
        let (actor, module) = (actor.to_string(), module.to_string());
        self.run(move |engine| engine.set_cell(&actor, &module, role, flags))
            .await
    }

    /// Set one capability for `role` across the selected modules.
    pub async fn bulk_set(
        &self,
        actor: &str,
        selector: ModuleSelector,
        role: Role,
        capability: Capability,
        value: bool,
    ) -> Result<BulkOutcome> {
        let actor = actor.to_string();
        self.run(move |engine| engine.bulk_set(&actor, &selector, role, capability, value))
            .await
    }

    /// Copy every module's flags from one role to another.
    pub async fn copy_role_permissions(
        &self,
        actor: &str,
        from: Role,
        to: Role,
    ) -> Result<BulkOutcome> {
        let actor = actor.to_string();
        self.run(move |engine| engine.copy_role_permissions(&actor, from, to))
            .await
    }

    /// Persist the matrix and flush staged audit entries.
    pub async fn save(&self) -> Result<()> {
        self.run(|engine| engine.save()).await
    }

    async fn run<F, R>(&self, operation: F) -> Result<R>
    where
        F: FnOnce(&PermissionEngine<S>) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let engine = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || operation(&engine))
            .await
            .map_err(|e| Error::StoreUnavailable(format!("Blocking task failed: {e}")))?
    }
}
