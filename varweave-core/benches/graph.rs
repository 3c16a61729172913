//! Graph query benchmarks on a layered DAG.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use varweave_core::{Variable, VariableStore};

/// Every node reads its predecessor and two nodes further back.
fn layered(size: usize) -> VariableStore {
    let mut store = VariableStore::new();
    store.upsert(Variable::new("v0"));
    for i in 1..size {
        let deps = [i - 1, i / 2, i / 3].map(|j| format!("v{j}"));
        store.upsert(Variable::new(format!("v{i}")).with_dependencies(deps));
    }
    store
}

fn bench_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph");

    for size in [100, 1_000, 10_000] {
        let store = layered(size);
        let last = format!("v{}", size - 1);
        let back_edge = vec![last.clone()];

        group.bench_with_input(BenchmarkId::new("topological_order", size), &store, |b, s| {
            b.iter(|| black_box(s.graph().topological_order()))
        });
        group.bench_with_input(BenchmarkId::new("would_create_cycle", size), &store, |b, s| {
            b.iter(|| black_box(s.graph().would_create_cycle("v0", &back_edge)))
        });
        group.bench_with_input(
            BenchmarkId::new("transitive_dependents", size),
            &store,
            |b, s| b.iter(|| black_box(s.graph().transitive_dependents("v0").len())),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_graph);
criterion_main!(benches);
