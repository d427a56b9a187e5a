use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use credit_score_ml::config::HarnessConfig;
use credit_score_ml::data::{Dataset, Observation, Schema};
use credit_score_ml::pipeline::Pipeline;
use credit_score_ml::trainers::{FittedModel, TrainerKind};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn create_credit_data(n_rows: usize) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let codes = ["4711", "6201", "4120", "4930", "5611"];

    let rows = (0..n_rows)
        .map(|_| {
            let ratios: Vec<f64> = (0..13)
                .map(|_| if rng.gen_bool(0.02) { f64::NAN } else { rng.gen::<f64>() * 4.0 - 2.0 })
                .collect();
            let label = ratios[0].is_finite() && ratios[0] + rng.gen::<f64>() * 0.5 > 0.5;
            let cnae = codes[rng.gen_range(0..codes.len())];
            Observation::new(ratios, cnae, label)
        })
        .collect();

    Dataset::new(Schema::credit_scoring(), rows)
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let pipeline = Pipeline::base(&HarnessConfig::default());

    for n_rows in [1000, 5000].iter() {
        let data = create_credit_data(*n_rows);
        group.bench_with_input(BenchmarkId::new("fit_transform", n_rows), &data, |b, data| {
            b.iter(|| {
                let fitted = pipeline.fit(black_box(data)).unwrap();
                fitted.transform(data.observations()).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_trainers(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10);

    let pipeline = Pipeline::base(&HarnessConfig::default());
    let data = create_credit_data(2000);

    for kind in [
        TrainerKind::FastTree,
        TrainerKind::FastForest,
        TrainerKind::LbfgsLogisticRegression,
        TrainerKind::SdcaLogisticRegression,
        TrainerKind::AveragedPerceptron,
    ] {
        group.bench_with_input(BenchmarkId::new("fit", kind.name()), &data, |b, data| {
            b.iter(|| FittedModel::train(kind, &pipeline, black_box(data), 1).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pipeline, bench_trainers);
criterion_main!(benches);
