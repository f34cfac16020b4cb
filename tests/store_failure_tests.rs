//! Behaviour of the engine when the permission store fails.

use permission_matrix::{
    AuditLogEntry, Capability, Catalog, EngineConfig, Error, Matrix, MemoryStore, ModuleSelector,
    PermissionEngine, PermissionStore, PersistenceMode, Role, Result, flags,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A memory store that can be switched offline.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    offline: AtomicBool,
}

impl FlakyStore {
    fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(Error::StoreUnavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

impl PermissionStore for FlakyStore {
    fn load(&self, tenant_id: &str) -> Result<Option<Matrix>> {
        self.check()?;
        self.inner.load(tenant_id)
    }

    fn save(&self, tenant_id: &str, matrix: &Matrix) -> Result<()> {
        self.check()?;
        self.inner.save(tenant_id, matrix)
    }

    fn load_audit_log(&self, tenant_id: &str) -> Result<Vec<AuditLogEntry>> {
        self.check()?;
        self.inner.load_audit_log(tenant_id)
    }

    fn save_audit_log(&self, tenant_id: &str, entries: &[AuditLogEntry]) -> Result<()> {
        self.check()?;
        self.inner.save_audit_log(tenant_id, entries)
    }
}

fn activate(store: &Arc<FlakyStore>) -> PermissionEngine<FlakyStore> {
    PermissionEngine::activate("acme", Catalog::crm(), Arc::clone(store), EngineConfig::default())
        .unwrap()
}

#[test]
fn test_activation_propagates_store_failure() {
    let store = Arc::new(FlakyStore::default());
    store.set_offline(true);

    let result =
        PermissionEngine::activate("acme", Catalog::crm(), Arc::clone(&store), EngineConfig::default());
    assert!(matches!(result, Err(Error::StoreUnavailable(_))));
}

#[test]
fn test_failed_write_keeps_change_in_memory() {
    let store = Arc::new(FlakyStore::default());
    let engine = activate(&store);

    store.set_offline(true);
    let result = engine.set_cell("admin@acme", "bids", Role::Manager, flags![visible]);
    assert!(matches!(result, Err(Error::StoreUnavailable(_))));

    // Applied but not confirmed.
    assert!(!engine.can_add("bids", Role::Manager));
    assert!(engine.is_dirty());
    assert!(engine.audit_log().is_empty());
    assert_eq!(engine.pending_audit_count(), 1);
    assert_eq!(engine.metrics().summary().errors("store_unavailable"), 1);

    store.set_offline(false);
    engine.save().unwrap();

    assert!(!engine.is_dirty());
    assert_eq!(engine.audit_log().len(), 1);
    assert_eq!(engine.pending_audit_count(), 0);
    let stored = store.load("acme").unwrap().unwrap();
    assert_eq!(stored.get("bids", Role::Manager), flags![visible]);
    assert_eq!(store.load_audit_log("acme").unwrap().len(), 1);
}

#[test]
fn test_unconfirmed_changes_accumulate_until_save() {
    let store = Arc::new(FlakyStore::default());
    let engine = activate(&store);

    store.set_offline(true);
    let _ = engine.set_cell("admin@acme", "bids", Role::Manager, flags![visible]);
    let _ = engine.bulk_set(
        "admin@acme",
        &ModuleSelector::module("tasks"),
        Role::StandardUser,
        Capability::Delete,
        true,
    );
    assert!(engine.save().is_err());
    assert_eq!(engine.pending_audit_count(), 2);

    store.set_offline(false);
    engine.save().unwrap();

    let log = engine.audit_log();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].module(), "tasks");
    assert_eq!(log[1].module(), "bids");
}

#[test]
fn test_validation_errors_never_reach_the_store() {
    let store = Arc::new(FlakyStore::default());
    let engine = activate(&store);
    store.set_offline(true);

    let result = engine.copy_role_permissions("admin@acme", Role::Admin, Role::SuperAdmin);
    assert!(matches!(result, Err(Error::ProtectedRole(_))));
    assert!(!engine.is_dirty());

    let result = engine.set_cell("admin@acme", "ai-suggestions", Role::Admin, flags![visible]);
    assert!(matches!(result, Err(Error::UnknownModule(_))));
    assert!(!engine.is_dirty());
}

#[test]
fn test_deferred_mode_does_not_touch_store_until_save() {
    let store = Arc::new(FlakyStore::default());
    let config = EngineConfig {
        persistence: PersistenceMode::Deferred,
        ..EngineConfig::default()
    };
    let engine =
        PermissionEngine::activate("acme", Catalog::crm(), Arc::clone(&store), config).unwrap();

    store.set_offline(true);
    engine
        .set_cell("admin@acme", "bids", Role::Manager, flags![visible])
        .unwrap();
    assert!(matches!(engine.save(), Err(Error::StoreUnavailable(_))));
    assert!(engine.is_dirty());

    store.set_offline(false);
    engine.save().unwrap();
    assert!(!engine.is_dirty());
    assert_eq!(engine.audit_log().len(), 1);
}
