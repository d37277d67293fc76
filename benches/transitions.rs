//! Performance benchmarks for state transitions.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use graph_versioner::{
    Graph, GraphConfig, GraphTransaction, NodeId, StateInput, Timestamp, Versioner,
};
use tempfile::TempDir;

/// Build an entity whose history is `depth` states long, with a few
/// reference edges on the current state.
fn entity_with_history(graph: &Graph, versioner: &Versioner, depth: i64) -> NodeId {
    graph
        .write(|tx| {
            let entity = tx.create_node(&["Entity".to_string()])?;
            for i in 0..depth {
                versioner.patch(
                    tx,
                    entity,
                    StateInput::new().with_property("version", i).at(Timestamp(i + 1)),
                )?;
            }

            let current = versioner
                .current_edge(&*tx, entity)?
                .map(|rel| rel.end)
                .unwrap_or(entity);
            for kind in ["A", "B", "C"] {
                let reference = tx.create_node(&["R".to_string()])?;
                tx.create_relationship(current, reference, kind)?;
            }
            Ok(entity)
        })
        .unwrap()
}

/// Benchmark a single patch against histories of varying depth.
fn bench_patch(c: &mut Criterion) {
    let mut group = c.benchmark_group("patch");

    for depth in [1i64, 10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("history_depth", depth), &depth, |b, &depth| {
            let graph = Graph::in_memory();
            let versioner = Versioner::default();
            let entity = entity_with_history(&graph, &versioner, depth);

            b.iter(|| {
                let mut tx = graph.transaction();
                let state = versioner
                    .patch(&mut tx, entity, StateInput::new().with_property("x", 1))
                    .unwrap();
                tx.rollback();
                black_box(state);
            });
        });
    }

    group.finish();
}

/// Benchmark update vs patch_from on the same history.
fn bench_transition_kinds(c: &mut Criterion) {
    let mut group = c.benchmark_group("transition_kind");

    let graph = Graph::in_memory();
    let versioner = Versioner::default();
    let entity = entity_with_history(&graph, &versioner, 50);
    let oldest = graph.read(|data| {
        use graph_versioner::{Direction, GraphRead, HAS_STATE_TYPE};
        data.relationships(entity, Direction::Outgoing, Some(HAS_STATE_TYPE))
            .unwrap()[0]
            .end
    });

    group.bench_function("update", |b| {
        b.iter(|| {
            let mut tx = graph.transaction();
            black_box(versioner.update(&mut tx, entity, StateInput::new()).unwrap());
            tx.rollback();
        });
    });

    group.bench_function("patch_from", |b| {
        b.iter(|| {
            let mut tx = graph.transaction();
            black_box(versioner.patch_from(&mut tx, entity, oldest, None).unwrap());
            tx.rollback();
        });
    });

    group.finish();
}

/// Benchmark committed transitions on a persisted graph.
fn bench_persisted_commit(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let graph = Graph::open(GraphConfig {
        path: Some(dir.path().join("graph")),
        create_if_missing: true,
    })
    .unwrap();
    let versioner = Versioner::default();
    let entity = entity_with_history(&graph, &versioner, 10);

    c.bench_function("persisted_patch_commit", |b| {
        b.iter(|| {
            graph
                .write(|tx| versioner.patch(tx, entity, StateInput::new().with_property("x", 1)))
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_patch, bench_transition_kinds, bench_persisted_commit);
criterion_main!(benches);
