use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lobachevsky_hyp_ops::*;

fn point(dim: usize, step: f64, offset: f64) -> Vec<f64> {
    PoincareBall::UNIT.exp_map_zero(&(0..dim).map(|i| i as f64 * step + offset).collect::<Vec<_>>()).unwrap()
}

fn bench_exp_map_zero_64d(c: &mut Criterion) {
    let v: Vec<f64> = (0..64).map(|i| (i as f64) * 0.01 - 0.32).collect();
    let ball = PoincareBall::UNIT;
    c.bench_function("exp_map_zero_64d", |b| b.iter(|| ball.exp_map_zero(black_box(&v))));
}

fn bench_log_map_64d(c: &mut Criterion) {
    let ball = PoincareBall::UNIT;
    let x = point(64, 0.004, -0.1);
    let y = point(64, -0.003, 0.05);
    c.bench_function("log_map_64d", |b| b.iter(|| ball.log_map(black_box(&x), black_box(&y))));
}

fn bench_mobius_add_64d(c: &mut Criterion) {
    let ball = PoincareBall::new(-0.7).unwrap();
    let u = point(64, 0.01, 0.0);
    let v = point(64, -0.01, 0.0);
    c.bench_function("mobius_add_64d", |b| b.iter(|| ball.mobius_add(black_box(&u), black_box(&v))));
}

fn bench_distance_64d(c: &mut Criterion) {
    let ball = PoincareBall::UNIT;
    let u = point(64, 0.01, 0.0);
    let v = point(64, -0.01, 0.0);
    c.bench_function("distance_64d", |b| b.iter(|| ball.distance(black_box(&u), black_box(&v))));
}

fn bench_parallel_transport_64d(c: &mut Criterion) {
    let ball = PoincareBall::UNIT;
    let from = point(64, 0.004, -0.1);
    let to = point(64, -0.003, 0.05);
    let v: Vec<f64> = (0..64).map(|i| (i as f64).sin()).collect();
    c.bench_function("parallel_transport_64d", |b| {
        b.iter(|| ball.parallel_transport(black_box(&from), black_box(&to), black_box(&v)))
    });
}

fn bench_frechet_mean_8x32d(c: &mut Criterion) {
    let ball = PoincareBall::UNIT;
    let pts: Vec<Vec<f64>> = (0..8).map(|k| point(32, 0.002 * (k as f64 + 1.0), -0.03)).collect();
    let refs: Vec<&[f64]> = pts.iter().map(|p| p.as_slice()).collect();
    c.bench_function("frechet_mean_8x32d", |b| {
        b.iter(|| ball.frechet_mean(black_box(&refs), None, KARCHER_MAX_ITER, KARCHER_TOL))
    });
}

criterion_group!(
    benches,
    bench_exp_map_zero_64d,
    bench_log_map_64d,
    bench_mobius_add_64d,
    bench_distance_64d,
    bench_parallel_transport_64d,
    bench_frechet_mean_8x32d,
);
criterion_main!(benches);
