use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use common::instances;
use expander_decomposition::{expander_decomposition, Parameters};

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("expander_decomposition");

    for k in [8, 16, 32] {
        let complete = instances::complete_graph(k);
        group.bench_with_input(BenchmarkId::new("complete", k), &complete, |b, graph| {
            b.iter(|| expander_decomposition(black_box(graph), 0.1, Parameters::default(), 0).unwrap())
        });

        let dumbbell = instances::dumbbell_graph(k);
        group.bench_with_input(BenchmarkId::new("dumbbell", k), &dumbbell, |b, graph| {
            b.iter(|| expander_decomposition(black_box(graph), 0.1, Parameters::default(), 0).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
