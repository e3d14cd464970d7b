//! Criterion benchmarks for pine-forest: split search, training and prediction.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use pine_forest::{
    Dictionary, EncodedDataset, ForestConfig, SplitScratch, count_equal, encode_tabular,
    find_best_split, select_features,
};

fn make_classification(n_rows: usize, n_features: usize, n_classes: usize, seed: u64) -> EncodedDataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut text = String::new();
    for i in 0..n_rows {
        let class = i % n_classes;
        for f in 0..n_features {
            let base = if f < 3 { class as f64 * 3.0 } else { 0.0 };
            text.push_str(&format!("{:.4},", base + rng.r#gen::<f64>() * 0.5));
        }
        text.push_str(&format!("c{class}\n"));
    }
    encode_tabular(&text, &mut Dictionary::new()).unwrap()
}

fn bench_count_equal(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let labels: Vec<f64> = (0..4096).map(|_| f64::from(rng.gen_range(0..5u8))).collect();

    c.bench_function("count_equal_4096", |b| {
        b.iter(|| count_equal(black_box(2.0), black_box(&labels)));
    });
}

fn bench_find_best_split(c: &mut Criterion) {
    let data = make_classification(200, 10, 3, 42);
    let subset: Vec<usize> = (0..data.len()).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let candidates = select_features(data.schema().n_features(), 3, &mut rng);
    let mut scratch = SplitScratch::with_capacity(subset.len());

    c.bench_function("find_best_split_200x10_3cand", |b| {
        b.iter(|| find_best_split(data.rows(), &subset, &candidates, data.schema(), &mut scratch));
    });
}

fn bench_forest_fit(c: &mut Criterion) {
    let data = make_classification(300, 10, 3, 42);
    let cfg = ForestConfig::new(5).unwrap().with_seed(42);

    c.bench_function("forest_fit_300x10_5folds_5trees", |b| {
        b.iter(|| cfg.fit(&data).unwrap());
    });
}

fn bench_predict_batch(c: &mut Criterion) {
    let data = make_classification(300, 10, 3, 42);
    let forest = ForestConfig::new(5).unwrap().with_seed(42).fit(&data).unwrap().into_forest();
    let n_features = data.schema().n_features();
    let rows: Vec<Vec<f64>> = data.rows().iter().map(|r| r[..n_features].to_vec()).collect();

    c.bench_function("forest_predict_batch_300x10_25trees", |b| {
        b.iter(|| forest.predict_batch(&rows).unwrap());
    });
}

criterion_group!(
    benches,
    bench_count_equal,
    bench_find_best_split,
    bench_forest_fit,
    bench_predict_batch
);
criterion_main!(benches);
