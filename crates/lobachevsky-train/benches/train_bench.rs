use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lobachevsky_dataset::DatasetGenerator;
use lobachevsky_train::{TrainConfig, TrainingOrchestrator};

fn config() -> TrainConfig {
    TrainConfig { embedding_dim: 4, num_layers: 2, max_epochs: 1, ..TrainConfig::default() }
}

fn bench_predict_tree_31(c: &mut Criterion) {
    let ds = DatasetGenerator::with_seed(4, 1).unwrap().tree(2, 4).unwrap();
    let orch = TrainingOrchestrator::new(TrainConfig { use_attention: true, ..config() }).unwrap();
    c.bench_function("predict_tree_31", |b| b.iter(|| orch.predict(black_box(&ds))));
}

fn bench_train_epoch_tree_15(c: &mut Criterion) {
    let ds = vec![DatasetGenerator::with_seed(4, 2).unwrap().tree(2, 3).unwrap()];
    c.bench_function("train_epoch_tree_15", |b| {
        b.iter_batched(
            || TrainingOrchestrator::new(config()).unwrap(),
            |mut orch| orch.train(black_box(&ds)),
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_predict_tree_31, bench_train_epoch_tree_15);
criterion_main!(benches);
