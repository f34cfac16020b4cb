//! The per-tenant permission engine.
//!
//! A [`PermissionEngine`] owns the in-memory matrix of one tenant. It answers
//! capability queries, applies validated mutations and records an audit entry
//! for every changed cell.
//!
//! # Consistency
//!
//! The tenant state sits behind a single `RwLock`. Every mutation, including
//! multi-cell bulk operations, holds the write lock for its whole duration and
//! works on a staged copy of the matrix that only replaces the live one once
//! every cell has validated. Readers therefore never observe a partially
//! applied operation, and a rejected cell rolls back the whole operation.
//!
//! # Persistence
//!
//! With [`PersistenceMode::WriteThrough`] (the default) every mutation that
//! changed at least one cell is saved to the [`PermissionStore`] before the
//! call returns. With [`PersistenceMode::Deferred`] mutations stay in memory
//! until [`PermissionEngine::save`] is called. In both modes the audit entries
//! of a mutation are staged and only reach the audit log once the store has
//! confirmed the write, so the log never lists changes that were not durable.
//! A failed write leaves the in-memory change applied; retry with `save()`.
//! Staged entries beyond the audit retention are dropped oldest first, since
//! the log could not hold them anyway.
//!
//! Store writes happen while the tenant's write lock is held, so queries on
//! the same tenant wait for the write to finish. This keeps saves in
//! mutation order. Use [`PersistenceMode::Deferred`] when the store is slow
//! and queries must not wait on it; only `save()` then touches the store.

#[cfg(feature = "audit")]
use log::{debug, info, warn};

use crate::{
    audit::{AuditAction, AuditLogEntry, AuditRecorder, DEFAULT_AUDIT_RETENTION},
    catalog::Catalog,
    defaults::DefaultPolicy,
    error::{Error, Result},
    matrix::Matrix,
    metrics::EngineMetrics,
    permission::{Capability, PermissionFlags, PermissionRecord},
    role::Role,
    storage::{MemoryStore, PermissionStore},
};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// When mutations are written to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistenceMode {
    /// Save after every mutation that changed a cell.
    #[default]
    WriteThrough,
    /// Keep mutations in memory until `save()` is called.
    Deferred,
}

/// Configuration for a permission engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of audit entries retained per tenant.
    pub audit_retention: usize,
    /// When mutations are persisted.
    pub persistence: PersistenceMode,
    /// Rules used to seed new tenants and backfill new modules.
    pub policy: DefaultPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            audit_retention: DEFAULT_AUDIT_RETENTION,
            persistence: PersistenceMode::WriteThrough,
            policy: DefaultPolicy::standard(),
        }
    }
}

impl EngineConfig {
    /// Check the configuration for values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.audit_retention == 0 {
            return Err(Error::InvalidConfiguration(
                "audit_retention must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// The transition of one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellChange {
    pub module: String,
    pub role: Role,
    pub before: PermissionFlags,
    pub after: PermissionFlags,
}

impl AsRef<[CellChange]> for CellChange {
    fn as_ref(&self) -> &[CellChange] {
        std::slice::from_ref(self)
    }
}

impl CellChange {
    /// Whether the cell's value actually changed.
    pub fn is_change(&self) -> bool {
        self.before != self.after
    }

    pub fn previous(&self) -> PermissionRecord {
        PermissionRecord::new(self.module.clone(), self.role, self.before)
    }

    pub fn current(&self) -> PermissionRecord {
        PermissionRecord::new(self.module.clone(), self.role, self.after)
    }

    /// The flag transitions, e.g. `"add: false -> true"`.
    pub fn summary(&self) -> String {
        self.before.describe_change(&self.after)
    }
}

/// What happened when a tenant was activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Activation {
    /// No matrix was stored; the defaults were generated from scratch.
    pub created: bool,
    /// Cells inserted from the default policy.
    pub backfilled: usize,
    /// Stored cells rewritten because they broke an invariant.
    pub repaired: usize,
}

#[derive(Debug)]
struct EngineState {
    matrix: Matrix,
    recorder: AuditRecorder,
    // Entries of changes the store has not confirmed yet.
    pending_audit: Vec<AuditLogEntry>,
    matrix_dirty: bool,
    audit_dirty: bool,
}

/// Permission engine for a single tenant.
pub struct PermissionEngine<S = MemoryStore>
where
    S: PermissionStore,
{
    tenant_id: String,
    catalog: Catalog,
    config: EngineConfig,
    store: Arc<S>,
    state: RwLock<EngineState>,
    activation: Activation,
    metrics: EngineMetrics,
}

impl<S> PermissionEngine<S>
where
    S: PermissionStore,
{
    /// Load a tenant's matrix from the store, seeding or backfilling it from
    /// the default policy.
    ///
    /// A tenant without a stored matrix gets a complete generated one. A
    /// stored matrix only receives the cells it is missing, so existing
    /// customizations survive catalog growth. Either way the result is saved
    /// back when anything was added.
    pub fn activate(
        tenant_id: impl Into<String>,
        catalog: Catalog,
        store: Arc<S>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let tenant_id = tenant_id.into();
        let generated = config.policy.generate(&catalog);

        let mut activation = Activation::default();
        let matrix = match store.load(&tenant_id)? {
            None => {
                activation.created = true;
                activation.backfilled = generated.len();
                generated
            }
            Some(mut stored) => {
                activation.repaired = stored.repair();
                activation.backfilled = stored.merge_missing(&generated);
                stored
            }
        };

        if activation.created || activation.backfilled > 0 || activation.repaired > 0 {
            store.save(&tenant_id, &matrix)?;

            #[cfg(feature = "audit")]
            debug!(
                "Tenant '{tenant_id}' matrix saved on activation (created: {}, backfilled: {}, repaired: {})",
                activation.created, activation.backfilled, activation.repaired
            );
        }

        let recorder =
            AuditRecorder::from_entries(config.audit_retention, store.load_audit_log(&tenant_id)?);

        #[cfg(feature = "audit")]
        info!(
            "Tenant '{tenant_id}' activated with {} cells across {} modules",
            matrix.len(),
            catalog.modules().len()
        );

        Ok(Self {
            tenant_id,
            catalog,
            config,
            store,
            state: RwLock::new(EngineState {
                matrix,
                recorder,
                pending_audit: Vec::new(),
                matrix_dirty: false,
                audit_dirty: false,
            }),
            activation,
            metrics: EngineMetrics::new(),
        })
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    // Queries

    /// Whether `role` holds `capability` on `module`. Modules and roles
    /// outside the catalogs are never granted anything.
    pub fn check(&self, module: &str, role: Role, capability: Capability) -> bool {
        let granted = self.catalog.has_module(module)
            && self.catalog.has_role(role)
            && self.read_state().matrix.get(module, role).get(capability);
        self.metrics.record_query(granted);
        granted
    }

    pub fn can_view(&self, module: &str, role: Role) -> bool {
        self.check(module, role, Capability::Visible)
    }

    pub fn can_add(&self, module: &str, role: Role) -> bool {
        self.check(module, role, Capability::Add)
    }

    pub fn can_change(&self, module: &str, role: Role) -> bool {
        self.check(module, role, Capability::Change)
    }

    pub fn can_delete(&self, module: &str, role: Role) -> bool {
        self.check(module, role, Capability::Delete)
    }

    /// Read a cell. Absent cells read as no access.
    pub fn get(&self, module: &str, role: Role) -> PermissionRecord {
        self.read_state().matrix.record(module, role)
    }

    /// A copy of the whole matrix.
    pub fn snapshot(&self) -> Matrix {
        self.read_state().matrix.clone()
    }

    /// Every catalogued cell, in catalog module order then role order.
    pub fn records(&self) -> Vec<PermissionRecord> {
        let state = self.read_state();
        self.catalog
            .modules()
            .iter()
            .flat_map(|module| {
                self.catalog
                    .roles()
                    .iter()
                    .map(|role| state.matrix.record(module, *role))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Audit entries, most recent first. Only lists durably saved changes.
    pub fn audit_log(&self) -> Vec<AuditLogEntry> {
        self.read_state().recorder.list()
    }

    /// Whether there are in-memory changes the store has not confirmed.
    pub fn is_dirty(&self) -> bool {
        let state = self.read_state();
        state.matrix_dirty || state.audit_dirty
    }

    /// Number of audit entries waiting for a confirmed save.
    pub fn pending_audit_count(&self) -> usize {
        self.read_state().pending_audit.len()
    }

    // Mutations

    /// Update a single cell.
    ///
    /// The cascade rule is applied to `flags` before it is stored, so the
    /// returned `after` value may differ from the input. A no-op update
    /// returns an unchanged [`CellChange`] and records nothing.
    pub fn set_cell(
        &self,
        actor: &str,
        module: &str,
        role: Role,
        flags: PermissionFlags,
    ) -> Result<CellChange> {
        self.mutate(actor, AuditAction::SetCell, |engine, matrix| {
            engine.apply_cell(matrix, module, role, flags)
        })
    }

    /// Persist the full matrix and flush staged audit entries.
    ///
    /// This is the call that makes deferred changes survive a restart, and
    /// the retry path after a failed write-through.
    pub fn save(&self) -> Result<()> {
        let mut state = self.write_state();
        self.commit(&mut state)
    }

    /// Validate and write one cell of a staged matrix.
    ///
    /// Protected roles are rejected before catalog membership is checked.
    /// The returned change has `before == after` when the cell already held
    /// the requested value.
    pub(crate) fn apply_cell(
        &self,
        matrix: &mut Matrix,
        module: &str,
        role: Role,
        flags: PermissionFlags,
    ) -> Result<CellChange> {
        if role.is_protected() {
            return Err(Error::ProtectedRole(role));
        }
        self.catalog.require_module(module)?;
        self.catalog.require_role(role)?;

        let before = matrix.get(module, role);
        let after = matrix
            .set(module, role, flags)?
            .map_or(before, |(_, after)| after);
        Ok(CellChange {
            module: module.to_string(),
            role,
            before,
            after,
        })
    }

    /// Run a mutation against a staged copy of the matrix.
    ///
    /// `apply` returns every cell it visited. On error nothing is kept. When
    /// at least one visited cell changed, the staged matrix replaces the live
    /// one, one audit entry per changed cell is staged, and in write-through
    /// mode the result is saved.
    pub(crate) fn mutate<T, F>(&self, actor: &str, action: AuditAction, apply: F) -> Result<T>
    where
        T: AsRef<[CellChange]>,
        F: FnOnce(&Self, &mut Matrix) -> Result<T>,
    {
        let mut state = self.write_state();
        let mut staged = state.matrix.clone();

        let visited = match apply(self, &mut staged) {
            Ok(visited) => visited,
            Err(error) => {
                self.metrics.record_error(error.kind());

                #[cfg(feature = "audit")]
                warn!(
                    "Tenant '{}': {action} by '{actor}' rejected: {error}",
                    self.tenant_id
                );

                return Err(error);
            }
        };

        let entries: Vec<AuditLogEntry> = visited
            .as_ref()
            .iter()
            .filter(|cell| cell.is_change())
            .map(|change| {
                AuditLogEntry::new(
                    actor,
                    action,
                    change.module.clone(),
                    change.role,
                    change.before,
                    change.after,
                )
            })
            .collect();
        if entries.is_empty() {
            return Ok(visited);
        }

        let changed = entries.len();
        state.matrix = staged;
        state.matrix_dirty = true;
        state.pending_audit.extend(entries);

        // Only the newest `audit_retention` entries can survive a flush.
        let retention = self.config.audit_retention;
        if state.pending_audit.len() > retention {
            let overflow = state.pending_audit.len() - retention;
            state.pending_audit.drain(..overflow);
        }
        self.metrics.record_mutation(changed);

        #[cfg(feature = "audit")]
        info!(
            "Tenant '{}': {action} by '{actor}' changed {changed} cell(s)",
            self.tenant_id
        );

        if self.config.persistence == PersistenceMode::WriteThrough {
            self.commit(&mut state)?;
        }

        Ok(visited)
    }

    fn commit(&self, state: &mut EngineState) -> Result<()> {
        if let Err(error) = self.store.save(&self.tenant_id, &state.matrix) {
            self.metrics.record_error(error.kind());

            #[cfg(feature = "audit")]
            warn!(
                "Tenant '{}': matrix applied in memory but not saved: {error}",
                self.tenant_id
            );

            return Err(error);
        }
        self.metrics.record_store_write();
        state.matrix_dirty = false;

        if !state.pending_audit.is_empty() {
            let confirmed = std::mem::take(&mut state.pending_audit);
            state.recorder.extend(confirmed);
            state.audit_dirty = true;
        }

        if state.audit_dirty {
            if let Err(error) = self
                .store
                .save_audit_log(&self.tenant_id, &state.recorder.list())
            {
                self.metrics.record_error(error.kind());

                #[cfg(feature = "audit")]
                warn!(
                    "Tenant '{}': audit log not saved: {error}",
                    self.tenant_id
                );

                return Err(error);
            }
            state.audit_dirty = false;
        }

        Ok(())
    }

    fn read_state(&self) -> RwLockReadGuard<'_, EngineState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, EngineState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PermissionEngine<MemoryStore> {
    /// Activate a tenant on a fresh in-memory store with default configuration.
    pub fn in_memory(tenant_id: impl Into<String>, catalog: Catalog) -> Result<Self> {
        Self::activate(
            tenant_id,
            catalog,
            Arc::new(MemoryStore::new()),
            EngineConfig::default(),
        )
    }
}

impl<S> std::fmt::Debug for PermissionEngine<S>
where
    S: PermissionStore,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionEngine")
            .field("tenant_id", &self.tenant_id)
            .field("modules", &self.catalog.modules().len())
            .field("roles", &self.catalog.roles())
            .field("config", &self.config)
            .field("activation", &self.activation)
            .finish()
    }
}
