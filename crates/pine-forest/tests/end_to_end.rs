//! End-to-end tests for pine-forest: encode, cross-validate, predict, store.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;

use pine_forest::{
    Dictionary, ErrorKind, ForestConfig, ForestError, InputMode, Model, SequenceConfig, TokenUnit,
    encode_prediction, encode_sequence, encode_tabular, join_tokens,
};

// ---------------------------------------------------------------------------
// Helper: deterministic synthetic classification data as CSV text
// ---------------------------------------------------------------------------

/// 300 rows, 10 features, 3 labels assigned round-robin.
///
/// Features 0-2 are informative (class * 3.0 + noise in [0, 0.5]).
/// Features 3-9 are pure noise in [0, 0.5].
fn make_classification_csv() -> String {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let labels = ["red", "green", "blue"];
    let mut text = String::new();
    for i in 0..300 {
        let class = i % labels.len();
        let fields: Vec<String> = (0..10)
            .map(|f| {
                let base = if f < 3 { class as f64 * 3.0 } else { 0.0 };
                format!("{:.4}", base + rng.r#gen::<f64>() * 0.5)
            })
            .collect();
        text.push_str(&fields.join(","));
        text.push(',');
        text.push_str(labels[class]);
        text.push('\n');
    }
    text
}

fn feature_rows(rows: &[Vec<f64>], n_features: usize) -> Vec<Vec<f64>> {
    rows.iter().map(|row| row[..n_features].to_vec()).collect()
}

// ---------------------------------------------------------------------------
// Tabular mode
// ---------------------------------------------------------------------------

#[test]
fn cv_accuracy_above_threshold() {
    let mut dictionary = Dictionary::new();
    let data = encode_tabular(&make_classification_csv(), &mut dictionary).unwrap();
    let report = ForestConfig::new(10).unwrap().with_seed(42).fit(&data).unwrap();

    assert_eq!(report.fold_scores().len(), 5);
    assert_eq!(report.forest().n_trees(), 50);
    assert!(
        report.mean_accuracy() > 85.0,
        "cv mean_accuracy {} <= 85",
        report.mean_accuracy()
    );
}

#[test]
fn training_rows_are_recovered() {
    let mut dictionary = Dictionary::new();
    let data = encode_tabular(&make_classification_csv(), &mut dictionary).unwrap();
    let report = ForestConfig::new(10).unwrap().with_seed(7).fit(&data).unwrap();

    let n_features = data.schema().n_features();
    let predictions = report
        .forest()
        .predict_batch(&feature_rows(data.rows(), n_features))
        .unwrap();
    let correct = predictions
        .iter()
        .zip(data.rows())
        .filter(|&(p, row)| p.as_value() == row[n_features])
        .count();
    let accuracy = correct as f64 / data.len() as f64;
    assert!(accuracy > 0.95, "training accuracy {accuracy} <= 0.95");
}

#[test]
fn deterministic_predictions() {
    let mut dictionary = Dictionary::new();
    let data = encode_tabular(&make_classification_csv(), &mut dictionary).unwrap();
    let config = ForestConfig::new(4).unwrap().with_seed(42);

    let first = config.fit(&data).unwrap();
    let second = config.clone().with_workers(Some(1)).fit(&data).unwrap();

    assert_eq!(first.forest(), second.forest());
    assert_eq!(first.fold_scores(), second.fold_scores());
}

#[test]
fn empty_training_input_fails_before_training() {
    let err = encode_tabular("\n\n", &mut Dictionary::new()).unwrap_err();
    assert!(matches!(err, ForestError::EmptyDataset));
    assert_eq!(err.kind(), ErrorKind::InputFormat);
}

// ---------------------------------------------------------------------------
// Sequence mode
// ---------------------------------------------------------------------------

#[test]
fn alternating_characters_are_learned() {
    let config = SequenceConfig::new(1, TokenUnit::Char).unwrap();
    let mut dictionary = Dictionary::new();
    let data = encode_sequence(&"ab".repeat(20), config, &mut dictionary).unwrap();
    let report = ForestConfig::new(5)
        .unwrap()
        .with_n_folds(3)
        .with_mode(InputMode::Sequence(config))
        .fit(&data)
        .unwrap();
    assert!(report.mean_accuracy() > 99.0);

    let rows =
        encode_prediction("ab", InputMode::Sequence(config), &dictionary, data.schema()).unwrap();
    let predicted: Vec<&str> = report
        .forest()
        .predict_batch(&rows)
        .unwrap()
        .into_iter()
        .map(|class| dictionary.resolve(class).unwrap())
        .collect();
    assert_eq!(predicted, ["b", "a"]);
    assert_eq!(join_tokens(&predicted, TokenUnit::Char), "ba");
}

// ---------------------------------------------------------------------------
// Model store
// ---------------------------------------------------------------------------

#[test]
fn saved_model_predicts_like_the_original() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("model.bin");

    let mut dictionary = Dictionary::new();
    let data = encode_tabular(&make_classification_csv(), &mut dictionary).unwrap();
    let report = ForestConfig::new(3).unwrap().with_seed(1).fit(&data).unwrap();
    let model = report.to_model(&data);
    assert_eq!(model.mode, InputMode::Tabular);
    assert_eq!(model.dictionary, dictionary);
    model.save(&path).unwrap();
    let loaded = Model::load(&path).unwrap();
    assert_eq!(loaded, model);

    let line = "6.1,6.2,6.3,0.1,0.1,0.1,0.1,0.1,0.1,0.1";
    let rows = encode_prediction(line, loaded.mode, &loaded.dictionary, loaded.schema).unwrap();
    let class = loaded.forest.predict(&rows[0]).unwrap();
    assert_eq!(loaded.dictionary.resolve(class).unwrap(), "blue");
    assert_eq!(model.forest.predict(&rows[0]).unwrap(), class);

    let export: serde_json::Value = serde_json::from_str(&loaded.to_json_pretty().unwrap()).unwrap();
    assert_eq!(export["n_trees"], serde_json::json!(15));
    assert_eq!(export["labels"], serde_json::json!(["red", "green", "blue"]));
}
