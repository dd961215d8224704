use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use tessera_tensor::{Float64, RowMajor, Strings, Tensor, Values};

fn benchmark_handle_clone(c: &mut Criterion) {
    let tensor = Float64::from_shape_vec(&[100, 100], vec![1.0; 10000]).unwrap();

    c.bench_function("handle clone", |b| {
        b.iter(|| {
            let _clone = black_box(&tensor).clone();
        })
    });
}

fn benchmark_deep_clone(c: &mut Criterion) {
    let tensor = Float64::from_shape_vec(&[100, 100], vec![1.0; 10000]).unwrap();

    c.bench_function("deep clone", |b| {
        b.iter(|| {
            let _clone = black_box(&tensor).deep_clone();
        })
    });
}

fn benchmark_float_1d(c: &mut Criterion) {
    let tensor = Float64::from_shape_vec(&[100, 100], vec![1.0; 10000]).unwrap();

    c.bench_function("float_1d sum", |b| {
        b.iter(|| {
            let t = black_box(&tensor);
            (0..t.len()).map(|i| t.float_1d(i)).sum::<f64>()
        })
    });
}

fn benchmark_copy_from_coerce(c: &mut Criterion) {
    let src = Float64::from_shape_vec(&[100, 100], vec![1.5; 10000]).unwrap();
    let dst = Strings::new(&[100, 100]);

    c.bench_function("copy_from float to string", |b| {
        b.iter(|| dst.copy_from(black_box(&src)))
    });
}

fn benchmark_append_rows(c: &mut Criterion) {
    let row = Float64::from_vec(vec![2.0; 100]);

    c.bench_function("append_row x100", |b| {
        b.iter(|| {
            let t = Float64::new(&[0, 100]);
            for _ in 0..100 {
                t.append_row(black_box(&row)).unwrap();
            }
        })
    });

    let pre = Float64::new(&[1000, 100]);
    c.bench_function("set_num_rows reuse", |b| {
        b.iter(|| {
            pre.set_num_rows(0);
            pre.set_num_rows(black_box(1000));
        })
    });
}

criterion_group!(
    benches,
    benchmark_handle_clone,
    benchmark_deep_clone,
    benchmark_float_1d,
    benchmark_copy_from_coerce,
    benchmark_append_rows
);
criterion_main!(benches);
