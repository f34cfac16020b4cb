//! Audit trail of permission changes.
//!
//! Each changed cell produces one [`AuditLogEntry`]. The [`AuditRecorder`]
//! keeps the most recent entries of a tenant, newest first, and silently
//! drops the oldest once the retention limit is reached.

use crate::{permission::PermissionFlags, role::Role};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::fmt;
use uuid::Uuid;

/// Number of entries kept per tenant unless configured otherwise.
pub const DEFAULT_AUDIT_RETENTION: usize = 50;

/// The administrative operation that produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "persistence", serde(tag = "kind", rename_all = "snake_case"))]
pub enum AuditAction {
    /// A single cell was updated.
    SetCell,
    /// One capability was applied across several modules.
    BulkSet,
    /// Cells were copied from another role.
    CopyRole { from: Role },
    /// A role was reset to the default policy.
    ResetToDefaults,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditAction::SetCell => f.write_str("updated permissions"),
            AuditAction::BulkSet => f.write_str("bulk updated permissions"),
            AuditAction::CopyRole { from } => write!(f, "copied permissions from {from}"),
            AuditAction::ResetToDefaults => f.write_str("reset permissions to defaults"),
        }
    }
}

/// An immutable record of one cell mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
pub struct AuditLogEntry {
    id: Uuid,
    timestamp: DateTime<Utc>,
    actor: String,
    action: AuditAction,
    module: String,
    role: Role,
    before: PermissionFlags,
    after: PermissionFlags,
}

impl AuditLogEntry {
    /// Record a cell transition performed by `actor`.
    pub fn new(
        actor: impl Into<String>,
        action: AuditAction,
        module: impl Into<String>,
        role: Role,
        before: PermissionFlags,
        after: PermissionFlags,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor: actor.into(),
            action,
            module: module.into(),
            role,
            before,
            after,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The identity that performed the change. Not authenticated here.
    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn action(&self) -> AuditAction {
        self.action
    }

    /// Human-readable description of the action.
    pub fn action_description(&self) -> String {
        self.action.to_string()
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn before(&self) -> PermissionFlags {
        self.before
    }

    pub fn after(&self) -> PermissionFlags {
        self.after
    }

    /// The flag transitions, e.g. `"add: false -> true"`.
    pub fn change_summary(&self) -> String {
        self.before.describe_change(&self.after)
    }
}

impl fmt::Display for AuditLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} on {}/{}: {}",
            self.timestamp.to_rfc3339(),
            self.actor,
            self.action,
            self.module,
            self.role,
            self.change_summary()
        )
    }
}

/// Bounded, append-only log of audit entries for one tenant.
#[derive(Debug, Clone)]
pub struct AuditRecorder {
    entries: VecDeque<AuditLogEntry>,
    retention: usize,
}

impl Default for AuditRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIT_RETENTION)
    }
}

impl AuditRecorder {
    /// Create an empty recorder keeping at most `retention` entries.
    pub fn new(retention: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(retention),
            retention,
        }
    }

    /// Restore a recorder from entries listed newest first, as returned by
    /// [`AuditRecorder::list`]. Entries beyond the retention limit are dropped.
    pub fn from_entries(retention: usize, entries: Vec<AuditLogEntry>) -> Self {
        let mut entries: VecDeque<_> = entries.into();
        entries.truncate(retention);
        Self { entries, retention }
    }

    /// Insert an entry at the head of the log, dropping the oldest entries
    /// beyond the retention limit.
    pub fn append(&mut self, entry: AuditLogEntry) {
        #[cfg(feature = "audit")]
        log::info!("audit: {entry}");

        self.entries.push_front(entry);
        self.entries.truncate(self.retention);
    }

    /// Append entries in the order they happened.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = AuditLogEntry>) {
        for entry in entries {
            self.append(entry);
        }
    }

    /// All retained entries, most recent first.
    pub fn list(&self) -> Vec<AuditLogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn retention(&self) -> usize {
        self.retention
    }
}
