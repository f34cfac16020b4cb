//! The fixed set of tenant roles.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// One of the five authorization levels a user holds within a tenant.
///
/// Variants are declared from most to least privileged, so the derived
/// `Ord` sorts `SuperAdmin` first. The engine does not treat this ordering
/// as an inheritance hierarchy; it only matters for display and for the
/// default policy tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "persistence", serde(rename_all = "snake_case"))]
pub enum Role {
    SuperAdmin,
    Admin,
    Manager,
    Marketing,
    StandardUser,
}

impl Role {
    /// All roles, most privileged first.
    pub const ALL: [Role; 5] = [
        Role::SuperAdmin,
        Role::Admin,
        Role::Manager,
        Role::Marketing,
        Role::StandardUser,
    ];

    /// The stable identifier used in storage and audit entries.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Marketing => "marketing",
            Role::StandardUser => "standard_user",
        }
    }

    /// Whether the role's cells are fixed at all-true and reject mutation.
    pub fn is_protected(&self) -> bool {
        matches!(self, Role::SuperAdmin)
    }

    /// Parse a role identifier such as `"standard_user"`.
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == trimmed)
            .ok_or_else(|| Error::UnknownRole(value.to_string()))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!(Role::parse("super_admin").unwrap(), Role::SuperAdmin);
        assert_eq!(" manager ".parse::<Role>().unwrap(), Role::Manager);
        assert_eq!(Role::parse("standard_user").unwrap(), Role::StandardUser);

        assert!(matches!(Role::parse("owner"), Err(Error::UnknownRole(r)) if r == "owner"));
        assert!(Role::parse("").is_err());
        assert!(Role::parse("Admin").is_err());
    }

    #[test]
    fn test_role_ordering() {
        let mut roles = vec![Role::StandardUser, Role::Admin, Role::SuperAdmin, Role::Marketing];
        roles.sort();
        assert_eq!(
            roles,
            vec![Role::SuperAdmin, Role::Admin, Role::Marketing, Role::StandardUser]
        );
        assert!(Role::SuperAdmin < Role::Manager);
    }

    #[test]
    fn test_only_super_admin_is_protected() {
        let protected: Vec<_> = Role::ALL.into_iter().filter(Role::is_protected).collect();
        assert_eq!(protected, vec![Role::SuperAdmin]);
    }

    #[test]
    fn test_display_roundtrips_identifier() {
        for role in Role::ALL {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
    }
}
