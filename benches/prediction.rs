use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kolosal_pipeline::cli::tasks;
use kolosal_pipeline::prelude::*;
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::sync::Arc;

fn create_taxi_rows(n_rows: usize, rng: &mut impl Rng) -> Vec<Row> {
    let vendors = ["CMT", "VTS"];
    let payments = ["CRD", "CSH"];
    (0..n_rows)
        .map(|_| {
            let distance: f64 = rng.gen_range(0.2..15.0);
            let time: f64 = rng.gen_range(60.0..3600.0);
            let vendor = vendors[rng.gen_range(0..2)];
            Row::new()
                .with("VendorId", vendor)
                .with("RateCode", "1")
                .with("PassengerCount", rng.gen_range(1..5) as f64)
                .with("TripTime", time)
                .with("TripDistance", distance)
                .with("PaymentType", payments[rng.gen_range(0..2)])
                .with("FareAmount", 2.5 + 2.5 * distance + 0.0028 * time)
        })
        .collect()
}

fn train_taxi_model(n_rows: usize) -> TrainedModel {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
    let config = tasks::taxi_fare_config().unwrap();
    let dataset = Dataset::new(config.schema.clone(), create_taxi_rows(n_rows, &mut rng)).unwrap();
    config.build().unwrap().fit(&dataset).unwrap()
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10); // Fewer samples for training benchmarks

    let config = tasks::taxi_fare_config().unwrap();
    let pipeline = config.build().unwrap();
    for n_rows in [1000, 5000].iter() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let dataset = Dataset::new(config.schema.clone(), create_taxi_rows(*n_rows, &mut rng)).unwrap();

        group.bench_with_input(BenchmarkId::new("fit", n_rows), &dataset, |b, dataset| {
            b.iter(|| pipeline.fit(black_box(dataset)).unwrap())
        });
    }

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");

    // Train model once
    let model = Arc::new(train_taxi_model(5000));
    let engine = PredictionEngine::new(Arc::clone(&model));
    let sequential = PredictionEngine::with_config(Arc::clone(&model), PredictionConfig::sequential());

    for n_rows in [100, 1000, 10000].iter() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(2);
        let records = create_taxi_rows(*n_rows, &mut rng);

        group.bench_with_input(BenchmarkId::new("parallel", n_rows), &records, |b, records| {
            b.iter(|| engine.predict_batch(black_box(records)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("sequential", n_rows), &records, |b, records| {
            b.iter(|| sequential.predict_batch(black_box(records)).unwrap())
        });
    }

    group.finish();
}

fn bench_single_prediction(c: &mut Criterion) {
    let model = train_taxi_model(2000);
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
    let record = create_taxi_rows(1, &mut rng).remove(0);

    c.bench_function("predict_one", |b| {
        b.iter(|| model.predict(black_box(&record)).unwrap())
    });
}

criterion_group!(benches, bench_training, bench_prediction, bench_single_prediction);
criterion_main!(benches);
