//! Walks through tenant activation, queries, administration and the audit log.

use permission_matrix::{
    Capability, Catalog, EngineConfig, EngineRegistry, MemoryStore, ModuleCatalog, ModuleSelector,
    Role, flags,
};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize audit logging
    #[cfg(feature = "audit")]
    permission_matrix::init_audit_logger();

    let store = Arc::new(MemoryStore::new());
    let registry = EngineRegistry::new(Arc::clone(&store), Catalog::crm(), EngineConfig::default());

    // First access seeds the tenant from the default policy
    let acme = registry.engine("acme")?;
    println!("acme activated: {:?}", acme.activation());

    println!("admin can delete users: {}", acme.can_delete("users", Role::Admin));
    println!("marketing can view bids: {}", acme.can_view("bids", Role::Marketing));
    println!(
        "standard user can add contacts: {}",
        acme.can_add("contacts", Role::StandardUser)
    );

    // Administration
    acme.set_cell("alice@acme.test", "bids", Role::Manager, flags![visible, add])?;
    acme.bulk_set(
        "alice@acme.test",
        &ModuleSelector::All,
        Role::StandardUser,
        Capability::Delete,
        false,
    )?;
    acme.copy_role_permissions("alice@acme.test", Role::Manager, Role::Marketing)?;

    match acme.copy_role_permissions("alice@acme.test", Role::Admin, Role::SuperAdmin) {
        Ok(_) => println!("unexpected: super_admin was modified"),
        Err(e) => println!("rejected as expected: {e}"),
    }

    println!("\nRecent audit entries:");
    for entry in acme.audit_log().iter().take(5) {
        println!("  {entry}");
    }

    // A new module appears in the catalog; existing customizations survive
    registry.evict("acme");
    let grown = Catalog::with_all_roles(ModuleCatalog::crm().with_module("ai-suggestions")?);
    let grown_registry = EngineRegistry::new(store, grown, EngineConfig::default());
    let acme = grown_registry.engine("acme")?;
    println!(
        "\nafter adding ai-suggestions: backfilled {} cells, manager bids = {}",
        acme.activation().backfilled,
        acme.get("bids", Role::Manager).flags
    );

    println!("\n{:<14} {:<14} flags", "module", "role");
    for record in acme.records().iter().filter(|r| r.module == "ai-suggestions") {
        println!("{:<14} {:<14} {}", record.module, record.role, record.flags);
    }

    Ok(())
}
