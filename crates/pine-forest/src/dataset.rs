//! Fixed-width numeric rows and the schema that describes them.

use crate::dictionary::{ClassIndex, Dictionary};
use crate::error::ForestError;

/// Column layout shared by every row of one run.
///
/// Created once when the first row (or the dictionary size, in sequence
/// mode) is known, then passed explicitly to every component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Schema {
    columns_per_row: usize,
}

impl Schema {
    /// Create a schema for rows of `columns_per_row` values (features + label).
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::ZeroFeatures`] when there is no feature column.
    pub fn new(columns_per_row: usize) -> Result<Self, ForestError> {
        if columns_per_row < 2 {
            return Err(ForestError::ZeroFeatures {
                columns: columns_per_row,
            });
        }
        Ok(Self { columns_per_row })
    }

    /// Total values per row, label included.
    #[must_use]
    pub fn columns_per_row(&self) -> usize {
        self.columns_per_row
    }

    /// Position of the label slot.
    #[must_use]
    pub fn last_column_index(&self) -> usize {
        self.columns_per_row - 1
    }

    /// Number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.columns_per_row - 1
    }
}

/// One encoded row: features followed by the label slot.
pub type Row = Vec<f64>;

/// Rows produced by one encoding pass, with their schema and dictionary.
#[derive(Debug, Clone)]
pub struct EncodedDataset {
    rows: Vec<Row>,
    schema: Schema,
    dictionary: Dictionary,
}

impl EncodedDataset {
    /// Assemble a dataset, checking every row against the schema.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::EmptyDataset`] | `rows` is empty |
    /// | [`ForestError::InconsistentRowWidth`] | a row's width differs from the schema |
    /// | [`ForestError::InvalidNumber`] | a feature is NaN or infinite |
    /// | [`ForestError::UnknownClassIndex`] | a label slot is outside the dictionary |
    pub fn new(rows: Vec<Row>, schema: Schema, dictionary: Dictionary) -> Result<Self, ForestError> {
        if rows.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        let last = schema.last_column_index();
        for (i, row) in rows.iter().enumerate() {
            if row.len() != schema.columns_per_row() {
                return Err(ForestError::InconsistentRowWidth {
                    row: i + 1,
                    expected: schema.columns_per_row(),
                    got: row.len(),
                });
            }
            if let Some(column) = row[..last].iter().position(|v| !v.is_finite()) {
                return Err(ForestError::InvalidNumber {
                    row: i + 1,
                    column,
                    raw: row[column].to_string(),
                });
            }
            let class = ClassIndex::from_value(row[last])?;
            dictionary.resolve(class)?;
        }
        Ok(Self {
            rows,
            schema,
            dictionary,
        })
    }

    /// Encoded rows.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Column layout.
    #[must_use]
    pub fn schema(&self) -> Schema {
        self.schema
    }

    /// Label dictionary built while encoding.
    #[must_use]
    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Always `false`; construction rejects empty datasets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Split into parts, handing the dictionary to the caller.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Row>, Schema, Dictionary) {
        (self.rows, self.schema, self.dictionary)
    }
}

/// Return the label slot of a validated row.
#[inline]
pub(crate) fn label_of(row: &[f64], schema: Schema) -> f64 {
    row[schema.last_column_index()]
}

#[cfg(test)]
mod tests {
    use super::{EncodedDataset, Schema};
    use crate::dictionary::Dictionary;
    use crate::error::ForestError;

    fn two_label_dict() -> Dictionary {
        let mut dict = Dictionary::new();
        dict.intern("A");
        dict.intern("B");
        dict
    }

    #[test]
    fn schema_counts() {
        let schema = Schema::new(5).unwrap();
        assert_eq!(schema.columns_per_row(), 5);
        assert_eq!(schema.last_column_index(), 4);
        assert_eq!(schema.n_features(), 4);
    }

    #[test]
    fn schema_needs_a_feature() {
        assert!(matches!(
            Schema::new(1),
            Err(ForestError::ZeroFeatures { columns: 1 })
        ));
    }

    #[test]
    fn dataset_rejects_wrong_width() {
        let schema = Schema::new(3).unwrap();
        let rows = vec![vec![1.0, 2.0, 0.0], vec![1.0, 1.0]];
        let err = EncodedDataset::new(rows, schema, two_label_dict()).unwrap_err();
        assert!(matches!(
            err,
            ForestError::InconsistentRowWidth { row: 2, expected: 3, got: 2 }
        ));
    }

    #[test]
    fn dataset_rejects_unknown_label() {
        let schema = Schema::new(2).unwrap();
        let rows = vec![vec![1.0, 9.0]];
        let err = EncodedDataset::new(rows, schema, two_label_dict()).unwrap_err();
        assert!(matches!(err, ForestError::UnknownClassIndex { index: 9, .. }));
    }

    #[test]
    fn dataset_rejects_empty() {
        let schema = Schema::new(2).unwrap();
        let err = EncodedDataset::new(vec![], schema, two_label_dict()).unwrap_err();
        assert!(matches!(err, ForestError::EmptyDataset));
    }
}
