//! Permission flags and records.

use crate::error::{Error, Result};
use crate::role::Role;
use std::fmt;
use std::str::FromStr;

/// One of the four capabilities tracked per module/role cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "persistence", serde(rename_all = "snake_case"))]
pub enum Capability {
    /// The module is shown to the role at all.
    Visible,
    /// The role may create records in the module.
    Add,
    /// The role may edit records in the module.
    Change,
    /// The role may delete records in the module.
    Delete,
}

impl Capability {
    /// All capabilities in display order.
    pub const ALL: [Capability; 4] = [
        Capability::Visible,
        Capability::Add,
        Capability::Change,
        Capability::Delete,
    ];

    /// The stable identifier of the capability.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Visible => "visible",
            Capability::Add => "add",
            Capability::Change => "change",
            Capability::Delete => "delete",
        }
    }

    /// Parse a capability name such as `"delete"`.
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        Capability::ALL
            .into_iter()
            .find(|cap| cap.as_str() == trimmed)
            .ok_or_else(|| Error::UnknownCapability(value.to_string()))
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// The four independent capability flags of a single cell.
///
/// Values built through [`PermissionFlags::new`] or [`PermissionFlags::normalized`]
/// always satisfy the cascade rule: a cell that is not visible grants nothing
/// else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
pub struct PermissionFlags {
    pub visible: bool,
    pub add: bool,
    pub change: bool,
    pub delete: bool,
}

impl PermissionFlags {
    /// No access at all.
    pub const NONE: PermissionFlags = PermissionFlags {
        visible: false,
        add: false,
        change: false,
        delete: false,
    };

    /// Every capability granted.
    pub const ALL: PermissionFlags = PermissionFlags {
        visible: true,
        add: true,
        change: true,
        delete: true,
    };

    /// Visible but read-only.
    pub const READ_ONLY: PermissionFlags = PermissionFlags {
        visible: true,
        add: false,
        change: false,
        delete: false,
    };

    /// Build flags from raw values, applying the cascade rule.
    pub fn new(visible: bool, add: bool, change: bool, delete: bool) -> Self {
        Self {
            visible,
            add,
            change,
            delete,
        }
        .normalized()
    }

    /// Apply the cascade rule: when `visible` is false the other three flags
    /// are cleared. `visible` is authoritative and never raised here.
    pub fn normalized(self) -> Self {
        if self.visible {
            self
        } else {
            Self::NONE
        }
    }

    /// Whether the cascade rule holds for these flags.
    pub fn is_consistent(&self) -> bool {
        self.visible || !(self.add || self.change || self.delete)
    }

    /// Read one capability.
    pub fn get(&self, capability: Capability) -> bool {
        match capability {
            Capability::Visible => self.visible,
            Capability::Add => self.add,
            Capability::Change => self.change,
            Capability::Delete => self.delete,
        }
    }

    /// Return a copy with one capability set, keeping the cascade rule.
    ///
    /// Clearing `visible` clears everything; granting `add`, `change` or
    /// `delete` also grants `visible`.
    pub fn with(mut self, capability: Capability, value: bool) -> Self {
        match capability {
            Capability::Visible => self.visible = value,
            Capability::Add => self.add = value,
            Capability::Change => self.change = value,
            Capability::Delete => self.delete = value,
        }
        if value && capability != Capability::Visible {
            self.visible = true;
        }
        self.normalized()
    }

    /// Human-readable list of flag transitions from `self` to `other`,
    /// e.g. `"add: false -> true, delete: true -> false"`. Empty when equal.
    pub fn describe_change(&self, other: &PermissionFlags) -> String {
        Capability::ALL
            .into_iter()
            .filter(|cap| self.get(*cap) != other.get(*cap))
            .map(|cap| format!("{cap}: {} -> {}", self.get(cap), other.get(cap)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for PermissionFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = |on: bool, c: char| if on { c } else { '-' };
        write!(
            f,
            "{}{}{}{}",
            mark(self.visible, 'v'),
            mark(self.add, 'a'),
            mark(self.change, 'c'),
            mark(self.delete, 'd')
        )
    }
}

/// The unit of storage: the flags of one `(module, role)` cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
pub struct PermissionRecord {
    pub module: String,
    pub role: Role,
    #[cfg_attr(feature = "persistence", serde(flatten))]
    pub flags: PermissionFlags,
}

impl PermissionRecord {
    /// Create a record for a cell.
    pub fn new(module: impl Into<String>, role: Role, flags: PermissionFlags) -> Self {
        Self {
            module: module.into(),
            role,
            flags,
        }
    }
}
