//! Benchmarks for the sampling-heavy and iterative statistical routines.
//!
//! Run with `cargo bench --bench statistics`.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ctrlrisk_core::engine::beta_bernoulli::sample_beta_distribution;
use ctrlrisk_core::engine::special::regularized_incomplete_beta;
use ctrlrisk_core::stats::bootstrap::bootstrap_ci;
use ctrlrisk_core::stats::descriptive::mean;
use ctrlrisk_core::stats::regression::logistic_regression;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn bench_beta_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample_beta_distribution");
    // Small shapes accept quickly; Beta(9, 141) exhausts the rejection budget.
    for (alpha, beta) in [(2.0, 3.0), (4.0, 6.0), (9.0, 141.0)] {
        group.bench_with_input(
            BenchmarkId::new("1000_draws", format!("{}_{}", alpha, beta)),
            &(alpha, beta),
            |b, &(alpha, beta)| {
                let mut rng = StdRng::seed_from_u64(42);
                b.iter(|| black_box(sample_beta_distribution(alpha, beta, 1_000, &mut rng)));
            },
        );
    }
    group.finish();
}

fn bench_bootstrap(c: &mut Criterion) {
    let mut group = c.benchmark_group("bootstrap_ci");
    for size in [32_usize, 256, 2048] {
        let mut rng = StdRng::seed_from_u64(size as u64);
        let data: Vec<f64> = (0..size).map(|_| rng.gen_range(0.0..100.0)).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            let mut rng = StdRng::seed_from_u64(7);
            b.iter(|| black_box(bootstrap_ci(black_box(data), mean, &mut rng)));
        });
    }
    group.finish();
}

fn bench_logistic(c: &mut Criterion) {
    let mut group = c.benchmark_group("logistic_regression");
    for rows in [50_usize, 500] {
        let mut rng = StdRng::seed_from_u64(rows as u64);
        let features: Vec<Vec<f64>> = (0..rows)
            .map(|_| (0..4).map(|_| rng.gen_range(-2.0..2.0)).collect())
            .collect();
        let outcomes: Vec<bool> = features.iter().map(|row| row[0] + 0.5 * row[1] > 0.0).collect();
        group.bench_with_input(
            BenchmarkId::from_parameter(rows),
            &(features, outcomes),
            |b, (features, outcomes)| {
                b.iter(|| black_box(logistic_regression(black_box(features), black_box(outcomes))));
            },
        );
    }
    group.finish();
}

fn bench_incomplete_beta(c: &mut Criterion) {
    c.bench_function("regularized_incomplete_beta", |b| {
        b.iter(|| {
            black_box(regularized_incomplete_beta(
                black_box(0.07),
                black_box(9.0),
                black_box(141.0),
            ))
        })
    });
}

criterion_group!(
    benches,
    bench_beta_sampling,
    bench_bootstrap,
    bench_logistic,
    bench_incomplete_beta
);
criterion_main!(benches);
