//! Storage abstractions for persisting tenant permission matrices.

use crate::{audit::AuditLogEntry, error::Result, matrix::Matrix};
use dashmap::DashMap;
use std::sync::Arc;

/// Keyed persistence for tenant matrices and their audit logs.
///
/// Implementations report transport failures as
/// [`Error::StoreUnavailable`](crate::Error::StoreUnavailable); the engine
/// propagates them verbatim.
pub trait PermissionStore: Send + Sync {
    /// Load a tenant's matrix. `Ok(None)` means the tenant has never been
    /// initialized.
    fn load(&self, tenant_id: &str) -> Result<Option<Matrix>>;

    /// Replace a tenant's matrix.
    fn save(&self, tenant_id: &str, matrix: &Matrix) -> Result<()>;

    /// Load a tenant's audit log, most recent first.
    fn load_audit_log(&self, tenant_id: &str) -> Result<Vec<AuditLogEntry>>;

    /// Replace a tenant's audit log, most recent first.
    fn save_audit_log(&self, tenant_id: &str, entries: &[AuditLogEntry]) -> Result<()>;
}

/// In-memory storage implementation using DashMap for thread safety.
///
/// Clones share the same underlying maps, so one store can back the engines
/// of many tenants.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    matrices: Arc<DashMap<String, Matrix>>,
    audit_logs: Arc<DashMap<String, Vec<AuditLogEntry>>>,
}

impl MemoryStore {
    /// Create a new memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tenants with a stored matrix.
    pub fn tenant_count(&self) -> usize {
        self.matrices.len()
    }

    /// Clear all stored data.
    pub fn clear(&self) {
        self.matrices.clear();
        self.audit_logs.clear();
    }
}

impl PermissionStore for MemoryStore {
    fn load(&self, tenant_id: &str) -> Result<Option<Matrix>> {
        Ok(self.matrices.get(tenant_id).map(|m| m.clone()))
    }

    fn save(&self, tenant_id: &str, matrix: &Matrix) -> Result<()> {
        self.matrices.insert(tenant_id.to_string(), matrix.clone());
        Ok(())
    }

    fn load_audit_log(&self, tenant_id: &str) -> Result<Vec<AuditLogEntry>> {
        Ok(self
            .audit_logs
            .get(tenant_id)
            .map(|entries| entries.clone())
            .unwrap_or_default())
    }

    fn save_audit_log(&self, tenant_id: &str, entries: &[AuditLogEntry]) -> Result<()> {
        self.audit_logs
            .insert(tenant_id.to_string(), entries.to_vec());
        Ok(())
    }
}

impl<S: PermissionStore + ?Sized> PermissionStore for Arc<S> {
    fn load(&self, tenant_id: &str) -> Result<Option<Matrix>> {
        (**self).load(tenant_id)
    }

    fn save(&self, tenant_id: &str, matrix: &Matrix) -> Result<()> {
        (**self).save(tenant_id, matrix)
    }

    fn load_audit_log(&self, tenant_id: &str) -> Result<Vec<AuditLogEntry>> {
        (**self).load_audit_log(tenant_id)
    }

    fn save_audit_log(&self, tenant_id: &str, entries: &[AuditLogEntry]) -> Result<()> {
        (**self).save_audit_log(tenant_id, entries)
    }
}

/// File-based storage implementation (requires persistence feature).
#[cfg(feature = "persistence")]
pub mod file_storage {
    use super::*;
    use crate::error::Error;
    #[cfg(feature = "audit")]
    use log::warn;
    use std::{
        fs::{self, File},
        io::{BufReader, BufWriter, ErrorKind, Write},
        path::{Path, PathBuf},
        sync::{Mutex, PoisonError},
    };

    /// One tenant's persisted state.
    #[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
    struct TenantDocument {
        matrix: Option<Matrix>,
        #[serde(default)]
        audit_log: Vec<AuditLogEntry>,
    }

    /// File-based store keeping one JSON document per tenant in a directory.
    #[derive(Debug)]
    pub struct FileStore {
        directory: PathBuf,
        write_lock: Mutex<()>,
    }

    impl FileStore {
        /// Create a store rooted at `directory`, creating it if needed.
        pub fn new(directory: impl AsRef<Path>) -> Result<Self> {
            let directory = directory.as_ref().to_path_buf();
            fs::create_dir_all(&directory).map_err(|e| {
                Error::StoreUnavailable(format!("Failed to create storage directory: {e}"))
            })?;

            Ok(Self {
                directory,
                write_lock: Mutex::new(()),
            })
        }

        /// Get the storage directory.
        pub fn directory(&self) -> &Path {
            &self.directory
        }

        /// Path of a tenant's document.
        pub fn tenant_path(&self, tenant_id: &str) -> Result<PathBuf> {
            let valid = !tenant_id.is_empty()
                && tenant_id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
                && !tenant_id.starts_with('.');
            if !valid {
                return Err(Error::InvalidConfiguration(format!(
                    "Tenant id '{}' cannot be used as a file name",
                    tenant_id.escape_debug()
                )));
            }
            Ok(self.directory.join(format!("{tenant_id}.json")))
        }

        /// Open and decode a tenant's document. The outer result carries I/O
        /// failures, the inner one decoding failures.
        fn decode_document(
            &self,
            path: &Path,
        ) -> Result<Option<serde_json::Result<TenantDocument>>> {
            let file = match File::open(path) {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
                Err(e) => {
                    return Err(Error::StoreUnavailable(format!(
                        "Failed to open {}: {e}",
                        path.display()
                    )));
                }
            };
            Ok(Some(serde_json::from_reader(BufReader::new(file))))
        }

        fn read_document(&self, tenant_id: &str) -> Result<Option<TenantDocument>> {
            let path = self.tenant_path(tenant_id)?;
            match self.decode_document(&path)? {
                None => Ok(None),
                Some(Ok(document)) => Ok(Some(document)),
                Some(Err(e)) => Err(Error::StoreUnavailable(format!(
                    "Corrupt document {}: {e}",
                    path.display()
                ))),
            }
        }

        fn write_document(&self, tenant_id: &str, document: &TenantDocument) -> Result<()> {
            let path = self.tenant_path(tenant_id)?;
            let staging = path.with_extension("json.tmp");
            let io_error =
                |e: std::io::Error| Error::StoreUnavailable(format!("Failed to write {}: {e}", path.display()));

            let file = File::create(&staging).map_err(io_error)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, document)?;
            writer.flush().map_err(io_error)?;
            drop(writer);

            fs::rename(&staging, &path).map_err(io_error)
        }

        fn update<F>(&self, tenant_id: &str, apply: F) -> Result<()>
        where
            F: FnOnce(&mut TenantDocument),
        {
            let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
            let path = self.tenant_path(tenant_id)?;
            let mut document = match self.decode_document(&path)? {
                None => TenantDocument::default(),
                Some(Ok(document)) => document,
                Some(Err(error)) => {
                    #[cfg(feature = "audit")]
                    warn!("Overwriting corrupt document {}: {error}", path.display());
                    #[cfg(not(feature = "audit"))]
                    let _ = error;
                    TenantDocument::default()
                }
            };
            apply(&mut document);
            self.write_document(tenant_id, &document)
        }
    }

    impl PermissionStore for FileStore {
        fn load(&self, tenant_id: &str) -> Result<Option<Matrix>> {
            Ok(self
                .read_document(tenant_id)?
                .and_then(|document| document.matrix))
        }

        fn save(&self, tenant_id: &str, matrix: &Matrix) -> Result<()> {
            self.update(tenant_id, |document| document.matrix = Some(matrix.clone()))
        }

        fn load_audit_log(&self, tenant_id: &str) -> Result<Vec<AuditLogEntry>> {
            Ok(self
                .read_document(tenant_id)?
                .map(|document| document.audit_log)
                .unwrap_or_default())
        }

        fn save_audit_log(&self, tenant_id: &str, entries: &[AuditLogEntry]) -> Result<()> {
            self.update(tenant_id, |document| document.audit_log = entries.to_vec())
        }
    }
}

#[cfg(feature = "persistence")]
pub use file_storage::FileStore;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audit::{AuditAction, AuditLogEntry},
        permission::PermissionFlags,
        role::Role,
    };

    fn sample_matrix() -> Matrix {
        let mut matrix = Matrix::new();
        matrix
            .set("contacts", Role::Manager, PermissionFlags::READ_ONLY)
            .unwrap();
        matrix
    }

    fn sample_entry() -> AuditLogEntry {
        AuditLogEntry::new(
            "root",
            AuditAction::SetCell,
            "contacts",
            Role::Manager,
            PermissionFlags::ALL,
            PermissionFlags::READ_ONLY,
        )
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.load("acme").unwrap().is_none());

        store.save("acme", &sample_matrix()).unwrap();
        assert_eq!(store.load("acme").unwrap(), Some(sample_matrix()));
        assert!(store.load("globex").unwrap().is_none());
        assert_eq!(store.tenant_count(), 1);

        store.save_audit_log("acme", &[sample_entry()]).unwrap();
        assert_eq!(store.load_audit_log("acme").unwrap().len(), 1);
        assert!(store.load_audit_log("globex").unwrap().is_empty());

        store.clear();
        assert_eq!(store.tenant_count(), 0);
    }

    #[test]
    fn test_memory_store_clones_share_data() {
        let store = MemoryStore::new();
        let shared = Arc::new(store.clone());
        shared.save("acme", &sample_matrix()).unwrap();
        assert!(store.load("acme").unwrap().is_some());
    }

    #[cfg(feature = "persistence")]
    #[test]
    fn test_file_store() {
        use std::env;

        let directory = env::temp_dir().join(format!("permission-matrix-{}", uuid::Uuid::new_v4()));

        {
            let store = FileStore::new(&directory).unwrap();
            assert!(store.load("acme").unwrap().is_none());

            store.save("acme", &sample_matrix()).unwrap();
            store.save_audit_log("acme", &[sample_entry()]).unwrap();
            assert!(store.tenant_path("acme").unwrap().exists());
        }

        // Reopen to check the data survived
        {
            let store = FileStore::new(&directory).unwrap();
            assert_eq!(store.load("acme").unwrap(), Some(sample_matrix()));
            let log = store.load_audit_log("acme").unwrap();
            assert_eq!(log.len(), 1);
            assert_eq!(log[0].module(), "contacts");
        }

        let _ = std::fs::remove_dir_all(&directory);
    }

    #[cfg(feature = "persistence")]
    #[test]
    fn test_file_store_recovers_from_corrupt_document() {
        use crate::{catalog::Catalog, engine::{EngineConfig, PermissionEngine}, error::Error};

        let directory = std::env::temp_dir().join(format!("permission-matrix-{}", uuid::Uuid::new_v4()));
        let store = Arc::new(FileStore::new(&directory).unwrap());
        std::fs::write(store.tenant_path("acme").unwrap(), "{not json").unwrap();

        assert!(matches!(store.load("acme"), Err(Error::StoreUnavailable(_))));
        assert!(matches!(store.load_audit_log("acme"), Err(Error::StoreUnavailable(_))));
        let activation =
            PermissionEngine::activate("acme", Catalog::crm(), Arc::clone(&store), EngineConfig::default());
        assert!(matches!(activation, Err(Error::StoreUnavailable(_))));

        store.save("acme", &sample_matrix()).unwrap();
        assert_eq!(store.load("acme").unwrap(), Some(sample_matrix()));
        assert!(store.load_audit_log("acme").unwrap().is_empty());

        let _ = std::fs::remove_dir_all(&directory);
    }

    #[cfg(feature = "persistence")]
    #[test]
    fn test_file_store_rejects_path_like_tenant_ids() {
        let directory = std::env::temp_dir().join(format!("permission-matrix-{}", uuid::Uuid::new_v4()));
        let store = FileStore::new(&directory).unwrap();

        for tenant in ["", "../etc", ".hidden", "a/b", "a\\b"] {
            assert!(store.save(tenant, &Matrix::new()).is_err(), "accepted '{tenant}'");
        }

        let _ = std::fs::remove_dir_all(&directory);
    }
}
