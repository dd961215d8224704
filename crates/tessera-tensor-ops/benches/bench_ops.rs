use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;
use tessera_tensor::Float64;
use tessera_tensor_ops::{
    ops::{self, AggOp, UnaryOp},
    ExecutionStrategy, VectorizeConfig, Vectorizer,
};

fn random_tensor(rng: &mut impl Rng, sizes: &[usize]) -> Float64 {
    let n = sizes.iter().product();
    let data = (0..n).map(|_| rng.random::<f64>()).collect();
    Float64::from_shape_vec(sizes, data).unwrap()
}

fn vectorizers() -> Vec<(&'static str, Vectorizer)> {
    vec![
        ("serial", Vectorizer::serial()),
        ("auto", Vectorizer::default()),
        (
            "fixed4",
            Vectorizer::new(ExecutionStrategy::Fixed(4), VectorizeConfig::default()).unwrap(),
        ),
    ]
}

fn bench_add_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_broadcast");
    let mut rng = rand::rng();

    for rows in [8, 128, 1024, 16384] {
        let a = random_tensor(&mut rng, &[rows, 16]);
        let b = random_tensor(&mut rng, &[16]);
        let out = Float64::new(&[0]);

        for (name, vz) in vectorizers() {
            group.bench_with_input(BenchmarkId::new(name, rows), &rows, |bencher, _| {
                bencher.iter(|| ops::add(&vz, black_box(&a), black_box(&b), &out).unwrap())
            });
        }
    }

    group.finish();
}

fn bench_unary(c: &mut Criterion) {
    let mut group = c.benchmark_group("unary_exp");
    let mut rng = rand::rng();

    for size in [128, 16384, 262144] {
        let a = random_tensor(&mut rng, &[size]);
        let out = Float64::new(&[0]);

        for (name, vz) in vectorizers() {
            group.bench_with_input(BenchmarkId::new(name, size), &size, |bencher, _| {
                bencher.iter(|| ops::unary(&vz, UnaryOp::Exp, black_box(&a), &out))
            });
        }
    }

    group.finish();
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate_mean");
    let mut rng = rand::rng();

    for size in [1024, 262144] {
        let a = random_tensor(&mut rng, &[size]);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |bencher, _| {
            bencher.iter(|| ops::aggregate(AggOp::Mean, black_box(&a)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_add_broadcast, bench_unary, bench_aggregate);
criterion_main!(benches);
