use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sumi_bench::*;

const SIZES: &[usize] = &[16, 64, 128, 256];

fn dot(c: &mut Criterion) {
    let mut group = c.benchmark_group("dot");

    for &n in SIZES {
        group.throughput(Throughput::Elements((n * n * n) as u64));
        let a = random_matrix(n, n);
        let b = random_matrix(n, n);

        group.bench_with_input(BenchmarkId::new("serial", n), &n, |bench, _| {
            bench.iter(|| black_box(a.dot(&b).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("parallel", n), &n, |bench, _| {
            bench.iter(|| black_box(a.par_dot(&b).unwrap()))
        });
    }

    group.finish();
}

/// Shapes from the MNIST conv net: im2col product, then the first affine.
fn dot_im2col(c: &mut Criterion) {
    let mut group = c.benchmark_group("dot/im2col");

    for &(rows, k, out) in &[(100 * 24 * 24, 25, 30), (100, 30 * 12 * 12, 100)] {
        let col = random_matrix(rows, k);
        let w = random_matrix(k, out);
        let id = format!("{rows}x{k}x{out}");
        group.bench_function(BenchmarkId::new("serial", &id), |b| {
            b.iter(|| black_box(col.dot(&w).unwrap()))
        });
        group.bench_function(BenchmarkId::new("parallel", &id), |b| {
            b.iter(|| black_box(col.par_dot(&w).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, dot, dot_im2col);
criterion_main!(benches);
