//! Turning raw text into fixed-width numeric rows.
//!
//! Two input modes are supported: comma-separated tabular data whose last
//! field is a string label, and token sequences where the tokens before a
//! position predict the token at that position.

use tracing::{debug, warn};

use crate::config::{InputMode, SequenceConfig, TokenUnit};
use crate::dataset::{EncodedDataset, Row, Schema};
use crate::dictionary::{ClassIndex, Dictionary};
use crate::error::ForestError;

/// Encode text according to `mode`.
///
/// # Errors
///
/// See [`encode_tabular`] and [`encode_sequence`].
pub fn encode(
    text: &str,
    mode: InputMode,
    dictionary: &mut Dictionary,
) -> Result<EncodedDataset, ForestError> {
    match mode {
        InputMode::Tabular => encode_tabular(text, dictionary),
        InputMode::Sequence(config) => encode_sequence(text, config, dictionary),
    }
}

/// Encode prediction input according to `mode`.
///
/// Tabular input is one CSV record; sequence input is seed text that yields
/// one feature row per seed position.
///
/// # Errors
///
/// See [`parse_feature_row`] and [`encode_sequence_seed`].
pub fn encode_prediction(
    input: &str,
    mode: InputMode,
    dictionary: &Dictionary,
    schema: Schema,
) -> Result<Vec<Row>, ForestError> {
    match mode {
        InputMode::Tabular => Ok(vec![parse_feature_row(input, schema)?]),
        InputMode::Sequence(config) => encode_sequence_seed(input, config, dictionary, schema),
    }
}

// --- Tabular ---

fn tabular_reader(text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes())
}

fn is_blank(record: &csv::StringRecord) -> bool {
    record.iter().all(str::is_empty)
}

fn record_line(record: &csv::StringRecord, fallback: usize) -> usize {
    record
        .position()
        .map_or(fallback, |pos| pos.line() as usize)
}

fn parse_field(raw: &str, row: usize, column: usize) -> Result<f64, ForestError> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ForestError::InvalidNumber {
            row,
            column,
            raw: raw.to_string(),
        }),
    }
}

/// Encode comma-separated rows of numeric features followed by a label.
///
/// The first record fixes the row width. Blank lines are skipped and
/// surrounding whitespace is trimmed from every field. Labels are interned
/// into `dictionary` in first-seen order.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ForestError::EmptyDataset`] | no records |
/// | [`ForestError::ZeroFeatures`] | the first record has fewer than two fields |
/// | [`ForestError::InconsistentRowWidth`] | a later record has a different field count |
/// | [`ForestError::InvalidNumber`] | a feature field is not a finite number |
/// | [`ForestError::Csv`] | the CSV reader rejects the input |
pub fn encode_tabular(
    text: &str,
    dictionary: &mut Dictionary,
) -> Result<EncodedDataset, ForestError> {
    let mut reader = tabular_reader(text);
    let mut fixed: Option<Schema> = None;
    let mut rows: Vec<Row> = Vec::new();

    for result in reader.records() {
        let record = result?;
        if is_blank(&record) {
            continue;
        }
        let line = record_line(&record, rows.len() + 1);
        let schema = match fixed {
            Some(schema) => schema,
            None => *fixed.insert(Schema::new(record.len())?),
        };
        if record.len() != schema.columns_per_row() {
            return Err(ForestError::InconsistentRowWidth {
                row: line,
                expected: schema.columns_per_row(),
                got: record.len(),
            });
        }

        let mut row = Vec::with_capacity(schema.columns_per_row());
        for (column, raw) in record.iter().take(schema.n_features()).enumerate() {
            row.push(parse_field(raw, line, column)?);
        }
        row.push(dictionary.intern(&record[schema.last_column_index()]).as_value());
        rows.push(row);
    }

    let schema = fixed.ok_or(ForestError::EmptyDataset)?;
    debug!(
        n_rows = rows.len(),
        columns_per_row = schema.columns_per_row(),
        n_labels = dictionary.len(),
        "encoded tabular input"
    );
    EncodedDataset::new(rows, schema, dictionary.clone())
}

/// Parse one prediction record into a feature row.
///
/// Accepts either `n_features` fields, or `columns_per_row` fields whose
/// trailing label is ignored. The returned row holds only the features.
///
/// # Errors
///
/// Returns [`ForestError::PredictionFeatureMismatch`] for any other width
/// and [`ForestError::InvalidNumber`] for a malformed feature.
pub fn parse_feature_row(line: &str, schema: Schema) -> Result<Row, ForestError> {
    let mut reader = tabular_reader(line);
    let record = match reader.records().next() {
        Some(record) => record?,
        None => csv::StringRecord::new(),
    };
    let width = record.len();
    if width != schema.n_features() && width != schema.columns_per_row() {
        return Err(ForestError::PredictionFeatureMismatch {
            expected: schema.n_features(),
            got: width,
        });
    }
    record
        .iter()
        .take(schema.n_features())
        .enumerate()
        .map(|(column, raw)| parse_field(raw, 1, column))
        .collect()
}

// --- Sequence ---

/// Split text into tokens: every character, or whitespace-separated words.
#[must_use]
pub fn tokenize(text: &str, unit: TokenUnit) -> Vec<String> {
    match unit {
        TokenUnit::Char => text.chars().map(String::from).collect(),
        TokenUnit::Word => text.split_whitespace().map(str::to_string).collect(),
    }
}

/// Join predicted tokens back into text.
#[must_use]
pub fn join_tokens<S: AsRef<str>>(tokens: &[S], unit: TokenUnit) -> String {
    let parts = tokens.iter().map(AsRef::as_ref);
    match unit {
        TokenUnit::Char => parts.collect(),
        TokenUnit::Word => parts.collect::<Vec<_>>().join(" "),
    }
}

/// Weight of the token `distance` positions back (1 = most recent).
fn recency_weight(distance: usize, length: usize) -> Result<f64, ForestError> {
    let weight = (length + 1).saturating_sub(distance) as f64 / length as f64;
    if weight > 0.0 && weight <= 1.0 {
        Ok(weight)
    } else {
        Err(ForestError::WeightOutOfRange { weight })
    }
}

/// Build the feature part of a row from the tokens preceding a position.
///
/// `None` entries are tokens with no dictionary index; they occupy a window
/// slot but set no feature. The returned row has `columns_per_row` slots
/// with the label slot left at zero.
fn window_row(
    history: &[Option<ClassIndex>],
    length: usize,
    schema: Schema,
) -> Result<Row, ForestError> {
    let mut row = vec![0.0; schema.columns_per_row()];
    for (offset, token) in history.iter().rev().take(length).enumerate() {
        let Some(token) = token else { continue };
        let weight = recency_weight(offset + 1, length)?;
        if token.index() >= schema.n_features() {
            return Err(ForestError::UnknownClassIndex {
                index: token.index(),
                len: schema.n_features(),
            });
        }
        let slot = &mut row[token.index()];
        if weight > *slot {
            *slot = weight;
        }
    }
    Ok(row)
}

/// Encode a token sequence into training rows.
///
/// Every token is interned first, so the row width is the final dictionary
/// size plus the label slot. Row `i` carries recency weights for the up to
/// `config.length` tokens before position `i`, and token `i` as its label.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ForestError::InvalidSequenceLength`] | `config.length` is zero |
/// | [`ForestError::EmptyDataset`] | fewer than two tokens |
/// | [`ForestError::WeightOutOfRange`] | a recency weight falls outside (0, 1] |
pub fn encode_sequence(
    text: &str,
    config: SequenceConfig,
    dictionary: &mut Dictionary,
) -> Result<EncodedDataset, ForestError> {
    if config.length == 0 {
        return Err(ForestError::InvalidSequenceLength { length: 0 });
    }
    let tokens = tokenize(text, config.unit);
    if tokens.len() < 2 {
        return Err(ForestError::EmptyDataset);
    }

    let history: Vec<Option<ClassIndex>> = tokens
        .iter()
        .map(|token| Some(dictionary.intern(token)))
        .collect();
    let schema = Schema::new(dictionary.len() + 1)?;

    let mut rows = Vec::with_capacity(tokens.len() - 1);
    for (i, target) in history.iter().enumerate().skip(1) {
        let mut row = window_row(&history[..i], config.length, schema)?;
        if let Some(target) = target {
            row[schema.last_column_index()] = target.as_value();
        }
        rows.push(row);
    }

    debug!(
        n_tokens = tokens.len(),
        n_rows = rows.len(),
        vocabulary = dictionary.len(),
        window = config.length,
        "encoded sequence input"
    );
    EncodedDataset::new(rows, schema, dictionary.clone())
}

/// Encode seed text into feature rows for prediction.
///
/// Produces one row per seed position `i` in `1..=len`, so the last row
/// predicts the token that follows the seed. Tokens missing from the
/// dictionary set no feature and are logged.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ForestError::InvalidSequenceLength`] | `config.length` is zero |
/// | [`ForestError::EmptyDataset`] | the seed has no tokens |
pub fn encode_sequence_seed(
    seed: &str,
    config: SequenceConfig,
    dictionary: &Dictionary,
    schema: Schema,
) -> Result<Vec<Row>, ForestError> {
    if config.length == 0 {
        return Err(ForestError::InvalidSequenceLength { length: 0 });
    }
    let tokens = tokenize(seed, config.unit);
    if tokens.is_empty() {
        return Err(ForestError::EmptyDataset);
    }

    let history: Vec<Option<ClassIndex>> = tokens
        .iter()
        .map(|token| {
            let index = dictionary.get(token);
            if index.is_none() {
                warn!(token = %token.escape_debug(), "seed token not in dictionary, skipped");
            }
            index
        })
        .collect();

    (1..=history.len())
        .map(|i| {
            let mut row = window_row(&history[..i], config.length, schema)?;
            row.truncate(schema.n_features());
            Ok(row)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        encode_sequence, encode_sequence_seed, encode_tabular, join_tokens, parse_feature_row,
        tokenize,
    };
    use crate::config::{SequenceConfig, TokenUnit};
    use crate::dataset::Schema;
    use crate::dictionary::Dictionary;
    use crate::error::ForestError;

    // --- Tabular ---

    #[test]
    fn tabular_interns_labels_in_order() {
        let mut dict = Dictionary::new();
        let data = encode_tabular("1,2,A\n1,3,A\n5,9,B\n5,8,B\n", &mut dict).unwrap();
        assert_eq!(data.len(), 4);
        assert_eq!(data.schema().columns_per_row(), 3);
        assert_eq!(data.rows()[0], vec![1.0, 2.0, 0.0]);
        assert_eq!(data.rows()[3], vec![5.0, 8.0, 1.0]);
        assert_eq!(dict.labels(), ["A", "B"]);
    }

    #[test]
    fn tabular_skips_blank_lines_and_trims() {
        let mut dict = Dictionary::new();
        let data = encode_tabular("\n 1.5 , 2 , yes \n\n3,4,no\n", &mut dict).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.rows()[0], vec![1.5, 2.0, 0.0]);
        assert_eq!(dict.labels(), ["yes", "no"]);
    }

    #[test]
    fn tabular_empty_input() {
        let mut dict = Dictionary::new();
        let err = encode_tabular("", &mut dict).unwrap_err();
        assert!(matches!(err, ForestError::EmptyDataset));
    }

    #[test]
    fn tabular_needs_a_feature_column() {
        let mut dict = Dictionary::new();
        let err = encode_tabular("A\nB\n", &mut dict).unwrap_err();
        assert!(matches!(err, ForestError::ZeroFeatures { columns: 1 }));
    }

    #[test]
    fn tabular_inconsistent_width_names_line() {
        let mut dict = Dictionary::new();
        let err = encode_tabular("1,2,A\n1,3,A\n5,B\n", &mut dict).unwrap_err();
        assert!(matches!(
            err,
            ForestError::InconsistentRowWidth { row: 3, expected: 3, got: 2 }
        ));
    }

    #[test]
    fn tabular_bad_number_names_row_and_column() {
        let mut dict = Dictionary::new();
        let err = encode_tabular("1,2,A\n1,abc,A\n", &mut dict).unwrap_err();
        match err {
            ForestError::InvalidNumber { row, column, raw } => {
                assert_eq!(row, 2);
                assert_eq!(column, 1);
                assert_eq!(raw, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn tabular_rejects_non_finite() {
        let mut dict = Dictionary::new();
        let err = encode_tabular("NaN,2,A\n", &mut dict).unwrap_err();
        assert!(matches!(err, ForestError::InvalidNumber { column: 0, .. }));
    }

    // --- Prediction rows ---

    #[test]
    fn feature_row_accepts_both_widths() {
        let schema = Schema::new(3).unwrap();
        assert_eq!(parse_feature_row("1,2.5", schema).unwrap(), vec![1.0, 2.5]);
        assert_eq!(parse_feature_row("1,2.5,A", schema).unwrap(), vec![1.0, 2.5]);
    }

    #[test]
    fn feature_row_wrong_width() {
        let schema = Schema::new(3).unwrap();
        let err = parse_feature_row("1", schema).unwrap_err();
        assert!(matches!(
            err,
            ForestError::PredictionFeatureMismatch { expected: 2, got: 1 }
        ));
    }

    // --- Sequence ---

    #[test]
    fn tokenize_chars_and_words() {
        assert_eq!(tokenize("ab a", TokenUnit::Char), ["a", "b", " ", "a"]);
        assert_eq!(tokenize(" the  cat\nsat ", TokenUnit::Word), ["the", "cat", "sat"]);
    }

    #[test]
    fn join_tokens_by_unit() {
        assert_eq!(join_tokens(&["a", "b"], TokenUnit::Char), "ab");
        assert_eq!(join_tokens(&["the", "cat"], TokenUnit::Word), "the cat");
    }

    #[test]
    fn sequence_length_one_is_one_hot() {
        let mut dict = Dictionary::new();
        let config = SequenceConfig::new(1, TokenUnit::Char).unwrap();
        let data = encode_sequence("abca", config, &mut dict).unwrap();
        assert_eq!(dict.labels(), ["a", "b", "c"]);
        assert_eq!(data.schema().columns_per_row(), 4);
        assert_eq!(
            data.rows(),
            [
                vec![1.0, 0.0, 0.0, 1.0],
                vec![0.0, 1.0, 0.0, 2.0],
                vec![0.0, 0.0, 1.0, 0.0],
            ]
        );
    }

    #[test]
    fn sequence_weights_decay_with_distance() {
        let mut dict = Dictionary::new();
        let config = SequenceConfig::new(2, TokenUnit::Word).unwrap();
        let data = encode_sequence("x y z", config, &mut dict).unwrap();
        // Row for "z": y is most recent (1.0), x one further back (0.5).
        assert_eq!(data.rows()[1], vec![0.5, 1.0, 0.0, 2.0]);
    }

    #[test]
    fn sequence_repeat_keeps_most_recent_weight() {
        let mut dict = Dictionary::new();
        let config = SequenceConfig::new(3, TokenUnit::Char).unwrap();
        let data = encode_sequence("aab", config, &mut dict).unwrap();
        // Row for "b": "a" at distance 1 and 2; the larger weight wins.
        assert_eq!(data.rows()[1], vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn sequence_needs_two_tokens() {
        let mut dict = Dictionary::new();
        let config = SequenceConfig::new(1, TokenUnit::Char).unwrap();
        let err = encode_sequence("a", config, &mut dict).unwrap_err();
        assert!(matches!(err, ForestError::EmptyDataset));
    }

    #[test]
    fn seed_rows_cover_every_position() {
        let mut dict = Dictionary::new();
        let config = SequenceConfig::new(1, TokenUnit::Char).unwrap();
        let data = encode_sequence("abc", config, &mut dict).unwrap();
        let rows = encode_sequence_seed("ab", config, &dict, data.schema()).unwrap();
        assert_eq!(rows, [vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]);
    }

    #[test]
    fn seed_skips_unknown_tokens() {
        let mut dict = Dictionary::new();
        let config = SequenceConfig::new(2, TokenUnit::Char).unwrap();
        let data = encode_sequence("ab", config, &mut dict).unwrap();
        let rows = encode_sequence_seed("az", config, &dict, data.schema()).unwrap();
        assert_eq!(rows.len(), 2);
        // "z" sets nothing but still pushes "a" one step back.
        assert_eq!(rows[1], vec![0.5, 0.0]);
    }

    #[test]
    fn empty_seed_rejected() {
        let dict = Dictionary::new();
        let config = SequenceConfig::new(1, TokenUnit::Word).unwrap();
        let schema = Schema::new(2).unwrap();
        let err = encode_sequence_seed("   ", config, &dict, schema).unwrap_err();
        assert!(matches!(err, ForestError::EmptyDataset));
    }
}
