//! Tenant-keyed access to permission engines.

use crate::{
    catalog::Catalog,
    engine::{EngineConfig, PermissionEngine},
    error::{Error, Result},
    storage::{MemoryStore, PermissionStore},
};
use dashmap::DashMap;
use std::sync::Arc;

/// Owns one [`PermissionEngine`] per tenant, materialized on first access.
///
/// Tenants are fully independent: each engine has its own lock and matrix.
/// All engines share the registry's store, catalog and configuration.
pub struct EngineRegistry<S = MemoryStore>
where
    S: PermissionStore,
{
    store: Arc<S>,
    catalog: Catalog,
    config: EngineConfig,
    engines: DashMap<String, Arc<PermissionEngine<S>>>,
}

impl EngineRegistry<MemoryStore> {
    /// Create a registry over a fresh in-memory store.
    pub fn in_memory(catalog: Catalog) -> Self {
        Self::new(Arc::new(MemoryStore::new()), catalog, EngineConfig::default())
    }
}

impl<S> EngineRegistry<S>
where
    S: PermissionStore,
{
    pub fn new(store: Arc<S>, catalog: Catalog, config: EngineConfig) -> Self {
        Self {
            store,
            catalog,
            config,
            engines: DashMap::new(),
        }
    }

    /// The engine of a tenant, activating it on first access.
    ///
    /// Activation loads the stored matrix and backfills missing cells. If it
    /// fails nothing is cached and the next call tries again. Activation of
    /// one tenant never blocks access to other tenants.
    pub fn engine(&self, tenant_id: &str) -> Result<Arc<PermissionEngine<S>>> {
        if tenant_id.trim().is_empty() {
            return Err(Error::InvalidConfiguration(
                "Tenant id cannot be empty".to_string(),
            ));
        }

        if let Some(engine) = self.engines.get(tenant_id) {
            return Ok(Arc::clone(engine.value()));
        }

        // No shard lock is held during store I/O. Racing callers keep the
        // first inserted engine.
        let activated = Arc::new(PermissionEngine::activate(
            tenant_id,
            self.catalog.clone(),
            Arc::clone(&self.store),
            self.config.clone(),
        )?);
        let engine = self
            .engines
            .entry(tenant_id.to_string())
            .or_insert(activated);
        Ok(Arc::clone(engine.value()))
    }

    /// The engine of a tenant if it has already been activated.
    pub fn get(&self, tenant_id: &str) -> Option<Arc<PermissionEngine<S>>> {
        self.engines
            .get(tenant_id)
            .map(|engine| Arc::clone(engine.value()))
    }

    /// Drop a tenant's engine from memory. Stored data is not touched; the
    /// next access reactivates the tenant from the store.
    pub fn evict(&self, tenant_id: &str) -> Option<Arc<PermissionEngine<S>>> {
        self.engines.remove(tenant_id).map(|(_, engine)| engine)
    }

    /// Save every active tenant, returning the ids that failed to save.
    pub fn save_all(&self) -> Vec<(String, Error)> {
        let engines: Vec<_> = self
            .engines
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        engines
            .into_iter()
            .filter_map(|(tenant_id, engine)| engine.save().err().map(|e| (tenant_id, e)))
            .collect()
    }

    /// Ids of the active tenants, sorted.
    pub fn active_tenants(&self) -> Vec<String> {
        let mut tenants: Vec<_> = self.engines.iter().map(|e| e.key().clone()).collect();
        tenants.sort();
        tenants
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}
