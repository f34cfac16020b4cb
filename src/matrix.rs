//! The per-tenant permission matrix.
//!
//! A [`Matrix`] maps `(module, role)` to [`PermissionFlags`]. It enforces the
//! two cell-level invariants on every write:
//!
//! - **Cascade**: a cell that is not visible grants nothing else. Writes are
//!   normalized, so clearing `visible` clears `add`, `change` and `delete` in
//!   the same update.
//! - **Protection**: `super_admin` cells always read as all-true and reject
//!   writes with [`Error::ProtectedRole`].
//!
//! The matrix knows nothing about catalogs; membership checks happen in the
//! engine.

use crate::{
    catalog::Catalog,
    error::{Error, Result},
    permission::{PermissionFlags, PermissionRecord},
    role::Role,
};
use std::collections::BTreeMap;

/// A mapping from `(module, role)` to permission flags for one tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "persistence",
    serde(into = "Vec<PermissionRecord>", from = "Vec<PermissionRecord>")
)]
pub struct Matrix {
    cells: BTreeMap<String, BTreeMap<Role, PermissionFlags>>,
}

impl Matrix {
    /// Create an empty matrix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a cell. Absent cells read as no access; `super_admin` always
    /// reads as all-true.
    pub fn get(&self, module: &str, role: Role) -> PermissionFlags {
        if role.is_protected() {
            return PermissionFlags::ALL;
        }
        self.stored(module, role).unwrap_or(PermissionFlags::NONE)
    }

    /// Read a cell as a record.
    pub fn record(&self, module: &str, role: Role) -> PermissionRecord {
        PermissionRecord::new(module, role, self.get(module, role))
    }

    /// The raw stored value of a cell, if any.
    pub fn stored(&self, module: &str, role: Role) -> Option<PermissionFlags> {
        self.cells.get(module).and_then(|roles| roles.get(&role)).copied()
    }

    /// Whether a record exists for the cell.
    pub fn contains(&self, module: &str, role: Role) -> bool {
        self.stored(module, role).is_some()
    }

    /// Write a cell, applying the cascade rule.
    ///
    /// Returns the previous and new flags when the observable value changed,
    /// `None` on a no-op. Writing to `super_admin` fails with
    /// [`Error::ProtectedRole`] and leaves the matrix untouched.
    pub fn set(
        &mut self,
        module: &str,
        role: Role,
        flags: PermissionFlags,
    ) -> Result<Option<(PermissionFlags, PermissionFlags)>> {
        if role.is_protected() {
            return Err(Error::ProtectedRole(role));
        }

        let before = self.get(module, role);
        let after = flags.normalized();

        self.cells
            .entry(module.to_string())
            .or_default()
            .insert(role, after);

        if before == after {
            Ok(None)
        } else {
            Ok(Some((before, after)))
        }
    }

    /// Insert a cell without protection checks. Used when seeding defaults,
    /// where `super_admin` cells are stored as all-true.
    pub(crate) fn seed(&mut self, module: &str, role: Role, flags: PermissionFlags) {
        let flags = if role.is_protected() {
            PermissionFlags::ALL
        } else {
            flags.normalized()
        };
        self.cells
            .entry(module.to_string())
            .or_default()
            .insert(role, flags);
    }

    /// Insert every cell of `other` whose key is absent here. Existing cells
    /// are never overwritten. Returns the number of cells inserted.
    pub fn merge_missing(&mut self, other: &Matrix) -> usize {
        let mut inserted = 0;
        for (module, roles) in &other.cells {
            let target = self.cells.entry(module.clone()).or_default();
            for (role, flags) in roles {
                if !target.contains_key(role) {
                    target.insert(*role, *flags);
                    inserted += 1;
                }
            }
        }
        inserted
    }

    /// Cells of the catalog product that have no record.
    pub fn missing_cells(&self, catalog: &Catalog) -> Vec<(String, Role)> {
        catalog
            .modules()
            .iter()
            .flat_map(|module| {
                catalog
                    .roles()
                    .iter()
                    .filter(move |role| !self.contains(module, **role))
                    .map(move |role| (module.to_string(), *role))
            })
            .collect()
    }

    /// Stored records that break the cascade or protection invariants.
    pub fn violations(&self) -> Vec<PermissionRecord> {
        self.records()
            .filter(|record| {
                !record.flags.is_consistent()
                    || (record.role.is_protected() && record.flags != PermissionFlags::ALL)
            })
            .collect()
    }

    /// Normalize every stored record so both invariants hold. Returns the
    /// number of records that had to be rewritten.
    pub fn repair(&mut self) -> usize {
        let mut repaired = 0;
        for roles in self.cells.values_mut() {
            for (role, flags) in roles.iter_mut() {
                let fixed = if role.is_protected() {
                    PermissionFlags::ALL
                } else {
                    flags.normalized()
                };
                if fixed != *flags {
                    *flags = fixed;
                    repaired += 1;
                }
            }
        }
        repaired
    }

    /// All stored records, ordered by module then role.
    pub fn records(&self) -> impl Iterator<Item = PermissionRecord> + '_ {
        self.cells.iter().flat_map(|(module, roles)| {
            roles
                .iter()
                .map(move |(role, flags)| PermissionRecord::new(module.clone(), *role, *flags))
        })
    }

    /// Stored records of one role.
    pub fn records_for_role(&self, role: Role) -> Vec<PermissionRecord> {
        self.records().filter(|record| record.role == role).collect()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.cells.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<PermissionRecord>> for Matrix {
    fn from(records: Vec<PermissionRecord>) -> Self {
        records.into_iter().collect()
    }
}

impl From<Matrix> for Vec<PermissionRecord> {
    fn from(matrix: Matrix) -> Self {
        matrix.records().collect()
    }
}

/// Later records win when the iterator yields the same key twice.
impl FromIterator<PermissionRecord> for Matrix {
    fn from_iter<I: IntoIterator<Item = PermissionRecord>>(iter: I) -> Self {
        let mut matrix = Matrix::new();
        for record in iter {
            matrix
                .cells
                .entry(record.module)
                .or_default()
                .insert(record.role, record.flags);
        }
        matrix
    }
}
