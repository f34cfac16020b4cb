//! Static module and role catalogs supplied by the embedding application.

use crate::error::{Error, Result};
use crate::role::Role;
use std::collections::HashSet;

/// Modules of the stock CRM deployment, in display order.
pub const CRM_MODULES: [&str; 19] = [
    "contacts",
    "companies",
    "deals",
    "bids",
    "tasks",
    "notes",
    "calendar",
    "email",
    "marketing",
    "campaigns",
    "documents",
    "products",
    "invoices",
    "tickets",
    "reports",
    "analytics",
    "integrations",
    "users",
    "settings",
];

/// An ordered list of module identifiers. Duplicates and blank identifiers
/// are rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCatalog {
    modules: Vec<String>,
}

impl ModuleCatalog {
    /// Build a catalog from module identifiers, preserving their order.
    pub fn new<I, M>(modules: I) -> Result<Self>
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();

        for module in modules {
            let module = module.into();
            if module.trim().is_empty() || module.trim() != module {
                return Err(Error::InvalidConfiguration(format!(
                    "Module identifier must be non-empty without surrounding whitespace: '{module}'"
                )));
            }
            if module.contains('\0') {
                return Err(Error::InvalidConfiguration(format!(
                    "Module identifier cannot contain null characters: '{}'",
                    module.escape_debug()
                )));
            }
            if !seen.insert(module.clone()) {
                return Err(Error::InvalidConfiguration(format!(
                    "Duplicate module identifier '{module}'"
                )));
            }
            ordered.push(module);
        }

        Ok(Self { modules: ordered })
    }

    /// The stock 19-module CRM catalog.
    pub fn crm() -> Self {
        Self {
            modules: CRM_MODULES.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// Return a new catalog with `module` appended.
    pub fn with_module(&self, module: impl Into<String>) -> Result<Self> {
        Self::new(self.modules.iter().cloned().chain([module.into()]))
    }

    pub fn contains(&self, module: &str) -> bool {
        self.modules.iter().any(|m| m == module)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// The module and role catalogs an engine operates within.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    modules: ModuleCatalog,
    roles: Vec<Role>,
}

impl Catalog {
    /// Combine a module catalog with a role catalog.
    ///
    /// The role catalog must be non-empty and free of duplicates; it is kept
    /// in privilege order regardless of the order supplied.
    pub fn new(modules: ModuleCatalog, roles: impl IntoIterator<Item = Role>) -> Result<Self> {
        let mut roles: Vec<Role> = roles.into_iter().collect();
        if roles.is_empty() {
            return Err(Error::InvalidConfiguration(
                "Role catalog cannot be empty".to_string(),
            ));
        }
        roles.sort();
        let before = roles.len();
        roles.dedup();
        if roles.len() != before {
            return Err(Error::InvalidConfiguration(
                "Role catalog contains duplicate roles".to_string(),
            ));
        }
        Ok(Self { modules, roles })
    }

    /// A catalog with the given modules and all five roles.
    pub fn with_all_roles(modules: ModuleCatalog) -> Self {
        Self {
            modules,
            roles: Role::ALL.to_vec(),
        }
    }

    /// The stock CRM modules with all five roles.
    pub fn crm() -> Self {
        Self::with_all_roles(ModuleCatalog::crm())
    }

    pub fn modules(&self) -> &ModuleCatalog {
        &self.modules
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn has_module(&self, module: &str) -> bool {
        self.modules.contains(module)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Fail with `UnknownModule` unless the module is catalogued.
    pub fn require_module(&self, module: &str) -> Result<()> {
        if self.has_module(module) {
            Ok(())
        } else {
            Err(Error::UnknownModule(module.to_string()))
        }
    }

    /// Fail with `UnknownRole` unless the role is catalogued.
    pub fn require_role(&self, role: Role) -> Result<()> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(Error::UnknownRole(role.to_string()))
        }
    }

    /// Number of cells in a fully initialized matrix.
    pub fn cell_count(&self) -> usize {
        self.modules.len() * self.roles.len()
    }
}
