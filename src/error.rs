//! Error types for the permission matrix.

use crate::role::Role;
use thiserror::Error;

/// The main error type for permission matrix operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Attempted to mutate the cells of an immutable role.
    #[error("Role '{0}' is protected and cannot be modified")]
    ProtectedRole(Role),

    /// Module is not part of the module catalog.
    #[error("Module '{0}' is not in the module catalog")]
    UnknownModule(String),

    /// Role is not part of the role catalog.
    #[error("Role '{0}' is not in the role catalog")]
    UnknownRole(String),

    /// Capability name could not be parsed.
    #[error("Unknown capability '{0}' (expected visible, add, change or delete)")]
    UnknownCapability(String),

    /// The permission store failed to load or save.
    #[error("Permission store unavailable: {0}")]
    StoreUnavailable(String),

    /// Invalid catalog or engine configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Serialization error.
    #[cfg(feature = "persistence")]
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Short, stable name of the error kind, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ProtectedRole(_) => "protected_role",
            Error::UnknownModule(_) => "unknown_module",
            Error::UnknownRole(_) => "unknown_role",
            Error::UnknownCapability(_) => "unknown_capability",
            Error::StoreUnavailable(_) => "store_unavailable",
            Error::InvalidConfiguration(_) => "invalid_configuration",
            #[cfg(feature = "persistence")]
            Error::Serialization(_) => "serialization",
        }
    }
}

/// Result type alias for permission matrix operations.
pub type Result<T> = std::result::Result<T, Error>;
