//! Controller benchmarks over both stores.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use planstore_bench::plan_document;
use planstore_core::{PlanController, Preconditions};
use planstore_storage::{FileStore, InMemoryStore, PoolConfig};
use serde_json::json;
use tempfile::TempDir;

fn bench_memory(c: &mut Criterion) {
    let mut group = c.benchmark_group("controller_memory");
    let controller = PlanController::with_connector(InMemoryStore::new(), PoolConfig::new(4));
    controller.create(plan_document("hot", 10)).unwrap();

    group.bench_function("read", |b| {
        b.iter(|| black_box(controller.read("hot", &Preconditions::none()).unwrap()));
    });

    group.bench_function("patch", |b| {
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            let patch = json!({"counter": n});
            black_box(controller.patch("hot", &patch, &Preconditions::none()).unwrap());
        });
    });

    group.bench_function("create_delete", |b| {
        b.iter(|| {
            controller.create(plan_document("cold", 1)).unwrap();
            controller.delete("cold").unwrap();
        });
    });

    group.finish();
}

fn bench_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("controller_file");
    let dir = TempDir::new().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    let controller = PlanController::with_connector(store, PoolConfig::new(4));
    controller.create(plan_document("hot", 10)).unwrap();

    group.bench_function("read", |b| {
        b.iter(|| black_box(controller.read("hot", &Preconditions::none()).unwrap()));
    });

    group.bench_function("patch", |b| {
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            let patch = json!({"counter": n});
            black_box(controller.patch("hot", &patch, &Preconditions::none()).unwrap());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_memory, bench_file);
criterion_main!(benches);
