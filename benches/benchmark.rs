use criterion::{Criterion, criterion_group, criterion_main};
use permission_matrix::{
    Capability, Catalog, DefaultPolicy, ModuleCatalog, ModuleSelector, PermissionEngine, Role,
    flags,
};
use std::hint::black_box;
use std::sync::Arc;

fn bench_permission_check(c: &mut Criterion) {
    let engine = PermissionEngine::in_memory("bench", Catalog::crm()).unwrap();

    c.bench_function("permission_check", |b| {
        b.iter(|| black_box(engine.can_change(black_box("contacts"), black_box(Role::Manager))))
    });
}

fn bench_permission_check_unknown_module(c: &mut Criterion) {
    let engine = PermissionEngine::in_memory("bench", Catalog::crm()).unwrap();

    c.bench_function("permission_check_unknown_module", |b| {
        b.iter(|| black_box(engine.can_view(black_box("ai-suggestions"), black_box(Role::Admin))))
    });
}

fn bench_concurrent_access(c: &mut Criterion) {
    let engine = Arc::new(PermissionEngine::in_memory("bench", Catalog::crm()).unwrap());

    c.bench_function("concurrent_access", |b| {
        b.iter(|| {
            let engine = Arc::clone(&engine);
            black_box(engine.check("deals", Role::StandardUser, Capability::Visible))
        })
    });
}

fn bench_set_cell(c: &mut Criterion) {
    let engine = PermissionEngine::in_memory("bench", Catalog::crm()).unwrap();

    c.bench_function("set_cell", |b| {
        b.iter(|| {
            engine
                .set_cell("bench", "deals", Role::Manager, flags![visible])
                .unwrap();
            engine
                .set_cell("bench", "deals", Role::Manager, flags![visible, add, change])
                .unwrap();
        })
    });
}

fn bench_bulk_set(c: &mut Criterion) {
    let engine = PermissionEngine::in_memory("bench", Catalog::crm()).unwrap();

    c.bench_function("bulk_set_all_modules", |b| {
        b.iter(|| {
            for value in [false, true] {
                engine
                    .bulk_set("bench", &ModuleSelector::All, Role::Manager, Capability::Delete, value)
                    .unwrap();
            }
        })
    });
}

fn bench_generate_defaults(c: &mut Criterion) {
    let modules = ModuleCatalog::new((0..200).map(|i| format!("module-{i}"))).unwrap();
    let catalog = Catalog::with_all_roles(modules);
    let policy = DefaultPolicy::standard();

    c.bench_function("generate_defaults_200_modules", |b| {
        b.iter(|| black_box(policy.generate(&catalog)))
    });
}

criterion_group!(
    benches,
    bench_permission_check,
    bench_permission_check_unknown_module,
    bench_concurrent_access,
    bench_set_cell,
    bench_bulk_set,
    bench_generate_defaults
);
criterion_main!(benches);
