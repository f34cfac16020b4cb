//! Default permission policy.
//!
//! The defaults are expressed as data: every role has a [`RoleRule`] naming,
//! for each capability group, the set of modules it applies to. Generating a
//! matrix is a pure function of the policy and the catalog, so a new module
//! added to the catalog receives sensible cells without touching the rest
//! of a tenant's customizations (see [`Matrix::merge_missing`]).
//!
//! | role            | visible                      | add / change                    | delete                |
//! |-----------------|------------------------------|---------------------------------|-----------------------|
//! | `super_admin`   | all                          | all                             | all                   |
//! | `admin`         | all                          | all                             | all except `users`    |
//! | `manager`       | all                          | all except `settings`, `users`  | `marketing`           |
//! | `marketing`     | all except `users`, `settings`, `bids` | `marketing`, `contacts`, `email` | `marketing` |
//! | `standard_user` | all except `users`, `settings` | `contacts`, `tasks`, `notes`  | none                  |

use crate::{
    catalog::Catalog,
    matrix::Matrix,
    permission::PermissionFlags,
    role::Role,
};

/// Modules the `manager` role may view but not edit.
pub const MANAGER_RESTRICTED: &[&str] = &["settings", "users"];
/// Modules the `manager` role may delete from.
pub const MANAGER_DELETABLE: &[&str] = &["marketing"];
/// Modules hidden from the `marketing` role.
pub const MARKETING_EXCLUDED: &[&str] = &["users", "settings", "bids"];
/// Modules the `marketing` role may add to and edit.
pub const MARKETING_OWNED: &[&str] = &["marketing", "contacts", "email"];
/// Modules hidden from the `standard_user` role.
pub const STANDARD_USER_EXCLUDED: &[&str] = &["users", "settings"];
/// Modules holding a standard user's own data.
pub const PERSONAL_DATA: &[&str] = &["contacts", "tasks", "notes"];
/// Modules the `admin` role may not delete from.
pub const ADMIN_UNDELETABLE: &[&str] = &["users"];

/// A set of modules a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleSet {
    /// Every module in the catalog, including ones added later.
    All,
    /// Every module except the listed ones.
    AllExcept(&'static [&'static str]),
    /// Only the listed modules.
    Only(&'static [&'static str]),
    /// No module.
    Empty,
}

impl ModuleSet {
    pub fn contains(&self, module: &str) -> bool {
        match self {
            ModuleSet::All => true,
            ModuleSet::AllExcept(excluded) => !excluded.iter().any(|m| *m == module),
            ModuleSet::Only(included) => included.iter().any(|m| *m == module),
            ModuleSet::Empty => false,
        }
    }
}

/// The default grants of one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleRule {
    pub visible: ModuleSet,
    pub add: ModuleSet,
    pub change: ModuleSet,
    pub delete: ModuleSet,
}

impl RoleRule {
    /// Flags this rule yields for a module, with the cascade rule applied.
    pub fn flags_for(&self, module: &str) -> PermissionFlags {
        PermissionFlags::new(
            self.visible.contains(module),
            self.add.contains(module),
            self.change.contains(module),
            self.delete.contains(module),
        )
    }
}

/// Per-role default rules used to seed and backfill tenant matrices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultPolicy {
    admin: RoleRule,
    manager: RoleRule,
    marketing: RoleRule,
    standard_user: RoleRule,
}

impl Default for DefaultPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

impl DefaultPolicy {
    /// The stock CRM defaults.
    pub fn standard() -> Self {
        Self {
            admin: RoleRule {
                visible: ModuleSet::All,
                add: ModuleSet::All,
                change: ModuleSet::All,
                delete: ModuleSet::AllExcept(ADMIN_UNDELETABLE),
            },
            manager: RoleRule {
                visible: ModuleSet::All,
                add: ModuleSet::AllExcept(MANAGER_RESTRICTED),
                change: ModuleSet::AllExcept(MANAGER_RESTRICTED),
                delete: ModuleSet::Only(MANAGER_DELETABLE),
            },
            marketing: RoleRule {
                visible: ModuleSet::AllExcept(MARKETING_EXCLUDED),
                add: ModuleSet::Only(MARKETING_OWNED),
                change: ModuleSet::Only(MARKETING_OWNED),
                delete: ModuleSet::Only(&["marketing"]),
            },
            standard_user: RoleRule {
                visible: ModuleSet::AllExcept(STANDARD_USER_EXCLUDED),
                add: ModuleSet::Only(PERSONAL_DATA),
                change: ModuleSet::Only(PERSONAL_DATA),
                delete: ModuleSet::Empty,
            },
        }
    }

    /// Replace the rule of a mutable role. `super_admin` has no rule; its
    /// cells are always all-true.
    pub fn with_rule(mut self, role: Role, rule: RoleRule) -> Self {
        match role {
            Role::SuperAdmin => {}
            Role::Admin => self.admin = rule,
            Role::Manager => self.manager = rule,
            Role::Marketing => self.marketing = rule,
            Role::StandardUser => self.standard_user = rule,
        }
        self
    }

    /// Default flags of a single cell.
    pub fn flags_for(&self, module: &str, role: Role) -> PermissionFlags {
        match role {
            Role::SuperAdmin => PermissionFlags::ALL,
            Role::Admin => self.admin.flags_for(module),
            Role::Manager => self.manager.flags_for(module),
            Role::Marketing => self.marketing.flags_for(module),
            Role::StandardUser => self.standard_user.flags_for(module),
        }
    }

    /// Produce a complete matrix: one record per catalogued module and role.
    pub fn generate(&self, catalog: &Catalog) -> Matrix {
        let mut matrix = Matrix::new();
        for module in catalog.modules().iter() {
            for role in catalog.roles() {
                matrix.seed(module, *role, self.flags_for(module, *role));
            }
        }
        matrix
    }
}

/// Generate the stock defaults for a catalog.
pub fn generate(catalog: &Catalog) -> Matrix {
    DefaultPolicy::standard().generate(catalog)
}
