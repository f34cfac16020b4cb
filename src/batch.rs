//! Bulk administration operations.
//!
//! Each operation here runs as one logical mutation: every cell is validated
//! against a staged matrix and the live matrix only changes once all of them
//! pass. A single rejected cell rolls the whole operation back. Audit entries
//! are still written per changed cell so the trail can be replayed cell by
//! cell.

use crate::{
    audit::AuditAction,
    engine::{CellChange, PermissionEngine},
    error::{Error, Result},
    permission::Capability,
    role::Role,
    storage::PermissionStore,
};

/// Which modules a bulk operation applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSelector {
    /// Every module in the catalog.
    All,
    /// A single module.
    Module(String),
}

impl ModuleSelector {
    pub fn module(module: impl Into<String>) -> Self {
        ModuleSelector::Module(module.into())
    }
}

impl From<&str> for ModuleSelector {
    fn from(module: &str) -> Self {
        ModuleSelector::Module(module.to_string())
    }
}

/// Result of a bulk operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    /// Cells whose value changed, in catalog order.
    pub changes: Vec<CellChange>,
    /// Cells visited but already holding the requested value.
    pub unchanged: usize,
}

impl BulkOutcome {
    fn from_visited(visited: Vec<CellChange>) -> Self {
        let total = visited.len();
        let changes: Vec<CellChange> = visited.into_iter().filter(CellChange::is_change).collect();
        Self {
            unchanged: total - changes.len(),
            changes,
        }
    }

    /// Number of cells that changed.
    pub fn changed(&self) -> usize {
        self.changes.len()
    }

    /// Total number of cells visited.
    pub fn total(&self) -> usize {
        self.changes.len() + self.unchanged
    }

    /// Modules with at least one changed cell.
    pub fn modules(&self) -> Vec<&str> {
        self.changes.iter().map(|c| c.module.as_str()).collect()
    }
}

impl<S> PermissionEngine<S>
where
    S: PermissionStore,
{
    /// Set one capability for `role` on every module matched by `selector`.
    ///
    /// Clearing `visible` clears the whole cell; granting `add`, `change` or
    /// `delete` also grants `visible`. Modules already holding the value are
    /// left alone and produce no audit entry.
    pub fn bulk_set(
        &self,
        actor: &str,
        selector: &ModuleSelector,
        role: Role,
        capability: Capability,
        value: bool,
    ) -> Result<BulkOutcome> {
        self.reject_protected(role)?;
        let modules = self.select_modules(selector)?;

        let visited = self.mutate(actor, AuditAction::BulkSet, |engine, matrix| {
            modules
                .iter()
                .map(|module| {
                    let flags = matrix.get(module, role).with(capability, value);
                    engine.apply_cell(matrix, module, role, flags)
                })
                .collect::<Result<Vec<_>>>()
        })?;

        Ok(BulkOutcome::from_visited(visited))
    }

    /// Copy every module's flags from `from` to `to`.
    ///
    /// Fails before touching any cell when `to` is protected.
    pub fn copy_role_permissions(&self, actor: &str, from: Role, to: Role) -> Result<BulkOutcome> {
        self.reject_protected(to)?;
        self.catalog().require_role(from)?;
        self.catalog().require_role(to)?;

        let modules = self.select_modules(&ModuleSelector::All)?;

        let visited = self.mutate(actor, AuditAction::CopyRole { from }, |engine, matrix| {
            modules
                .iter()
                .map(|module| {
                    let flags = matrix.get(module, from);
                    engine.apply_cell(matrix, module, to, flags)
                })
                .collect::<Result<Vec<_>>>()
        })?;

        Ok(BulkOutcome::from_visited(visited))
    }

    /// Reapply the default policy to every module of `role`.
    pub fn reset_role_to_defaults(&self, actor: &str, role: Role) -> Result<BulkOutcome> {
        self.reject_protected(role)?;
        let modules = self.select_modules(&ModuleSelector::All)?;

        let visited = self.mutate(actor, AuditAction::ResetToDefaults, |engine, matrix| {
            modules
                .iter()
                .map(|module| {
                    let flags = engine.config().policy.flags_for(module, role);
                    engine.apply_cell(matrix, module, role, flags)
                })
                .collect::<Result<Vec<_>>>()
        })?;

        Ok(BulkOutcome::from_visited(visited))
    }

    fn reject_protected(&self, role: Role) -> Result<()> {
        if role.is_protected() {
            self.metrics().record_error("protected_role");
            return Err(Error::ProtectedRole(role));
        }
        Ok(())
    }

    fn select_modules(&self, selector: &ModuleSelector) -> Result<Vec<String>> {
        match selector {
            ModuleSelector::All => Ok(self
                .catalog()
                .modules()
                .iter()
                .map(str::to_string)
                .collect()),
            ModuleSelector::Module(module) => {
                self.catalog().require_module(module)?;
                Ok(vec![module.clone()])
            }
        }
    }
}
