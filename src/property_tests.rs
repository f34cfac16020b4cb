//! Property-based testing for the permission matrix.
//!
//! Drives engines with arbitrary operation sequences using `proptest` and
//! checks that the cascade and protection invariants hold afterwards.

#[cfg(test)]
mod tests {
    use crate::{
        batch::ModuleSelector,
        catalog::{Catalog, CRM_MODULES, ModuleCatalog},
        defaults::DefaultPolicy,
        engine::PermissionEngine,
        error::Error,
        matrix::Matrix,
        permission::{Capability, PermissionFlags},
        role::Role,
    };
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Operation {
        SetCell(String, Role, PermissionFlags),
        BulkSet(ModuleSelector, Role, Capability, bool),
        Copy(Role, Role),
        Reset(Role),
    }

    fn role_strategy() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    fn capability_strategy() -> impl Strategy<Value = Capability> {
        prop::sample::select(Capability::ALL.to_vec())
    }

    fn module_strategy() -> impl Strategy<Value = String> {
        prop::sample::select(CRM_MODULES.to_vec()).prop_map(str::to_string)
    }

    /// Raw flags, including combinations that break the cascade rule.
    fn raw_flags_strategy() -> impl Strategy<Value = PermissionFlags> {
        (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
            |(visible, add, change, delete)| PermissionFlags {
                visible,
                add,
                change,
                delete,
            },
        )
    }

    /// Catalog modules mixed with identifiers the catalog does not know.
    fn any_module_strategy() -> impl Strategy<Value = String> {
        prop_oneof![module_strategy(), "[a-z][a-z-]{0,15}"]
    }

    fn selector_strategy() -> impl Strategy<Value = ModuleSelector> {
        prop_oneof![
            Just(ModuleSelector::All),
            module_strategy().prop_map(ModuleSelector::Module),
        ]
    }

    fn operation_strategy() -> impl Strategy<Value = Operation> {
        prop_oneof![
            (module_strategy(), role_strategy(), raw_flags_strategy())
                .prop_map(|(m, r, f)| Operation::SetCell(m, r, f)),
            (selector_strategy(), role_strategy(), capability_strategy(), any::<bool>())
                .prop_map(|(s, r, c, v)| Operation::BulkSet(s, r, c, v)),
            (role_strategy(), role_strategy()).prop_map(|(from, to)| Operation::Copy(from, to)),
            role_strategy().prop_map(Operation::Reset),
        ]
    }

    fn apply(engine: &PermissionEngine, operation: &Operation) -> Result<(), Error> {
        match operation {
            Operation::SetCell(module, role, flags) => {
                engine.set_cell("prop", module, *role, *flags).map(|_| ())
            }
            Operation::BulkSet(selector, role, capability, value) => engine
                .bulk_set("prop", selector, *role, *capability, *value)
                .map(|_| ()),
            Operation::Copy(from, to) => engine.copy_role_permissions("prop", *from, *to).map(|_| ()),
            Operation::Reset(role) => engine.reset_role_to_defaults("prop", *role).map(|_| ()),
        }
    }

    fn assert_invariants(matrix: &Matrix) -> Result<(), TestCaseError> {
        prop_assert!(matrix.violations().is_empty(), "violations: {:?}", matrix.violations());
        for record in matrix.records() {
            if !record.flags.visible {
                prop_assert_eq!(record.flags, PermissionFlags::NONE);
            }
        }
        for module in CRM_MODULES {
            prop_assert_eq!(matrix.get(module, Role::SuperAdmin), PermissionFlags::ALL);
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn prop_invariants_hold_after_any_sequence(
            operations in prop::collection::vec(operation_strategy(), 1..40)
        ) {
            let engine = PermissionEngine::in_memory("prop", Catalog::crm()).unwrap();

            for operation in &operations {
                let before = engine.snapshot();
                let result = apply(&engine, operation);

                if result.is_err() {
                    // Rejected operations leave no trace.
                    prop_assert_eq!(engine.snapshot(), before);
                }
                assert_invariants(&engine.snapshot())?;
            }

            prop_assert_eq!(engine.snapshot().len(), Catalog::crm().cell_count());
        }

        #[test]
        fn prop_super_admin_is_immutable(
            module in any_module_strategy(),
            flags in raw_flags_strategy(),
            capability in capability_strategy(),
            value in any::<bool>(),
            from in role_strategy()
        ) {
            let engine = PermissionEngine::in_memory("prop", Catalog::crm()).unwrap();
            let before = engine.snapshot();

            let set = engine.set_cell("prop", &module, Role::SuperAdmin, flags);
            prop_assert!(matches!(set, Err(Error::ProtectedRole(Role::SuperAdmin))));

            let bulk = engine.bulk_set("prop", &ModuleSelector::All, Role::SuperAdmin, capability, value);
            prop_assert!(matches!(bulk, Err(Error::ProtectedRole(Role::SuperAdmin))));

            let single = engine.bulk_set("prop", &ModuleSelector::module(module.clone()), Role::SuperAdmin, capability, value);
            prop_assert!(matches!(single, Err(Error::ProtectedRole(Role::SuperAdmin))));

            let copy = engine.copy_role_permissions("prop", from, Role::SuperAdmin);
            prop_assert!(matches!(copy, Err(Error::ProtectedRole(Role::SuperAdmin))));

            prop_assert_eq!(engine.snapshot(), before);
            prop_assert!(engine.audit_log().is_empty());
        }

        #[test]
        fn prop_set_cell_stores_normalized_flags(
            module in module_strategy(),
            role in role_strategy().prop_filter("mutable role", |r| !r.is_protected()),
            flags in raw_flags_strategy()
        ) {
            let engine = PermissionEngine::in_memory("prop", Catalog::crm()).unwrap();
            let change = engine.set_cell("prop", &module, role, flags).unwrap();

            prop_assert_eq!(change.after, flags.normalized());
            prop_assert_eq!(engine.get(&module, role).flags, flags.normalized());
            prop_assert_eq!(engine.audit_log().len(), usize::from(change.is_change()));
        }

        #[test]
        fn prop_merge_missing_never_overwrites(
            customizations in prop::collection::vec(
                (module_strategy(), role_strategy().prop_filter("mutable role", |r| !r.is_protected()), raw_flags_strategy()),
                0..30
            )
        ) {
            let catalog = Catalog::crm();
            let mut persisted = DefaultPolicy::standard().generate(&catalog);
            for (module, role, flags) in &customizations {
                persisted.set(module, *role, *flags).unwrap();
            }
            let expected = persisted.clone();

            let grown = Catalog::with_all_roles(
                ModuleCatalog::crm().with_module("ai-suggestions").unwrap()
            );
            let inserted = persisted.merge_missing(&DefaultPolicy::standard().generate(&grown));

            prop_assert_eq!(inserted, Role::ALL.len());
            for record in expected.records() {
                prop_assert_eq!(persisted.stored(&record.module, record.role), Some(record.flags));
            }
        }
    }
}
