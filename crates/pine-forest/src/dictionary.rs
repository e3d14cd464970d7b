//! Bidirectional mapping between label strings and class indices.

use std::collections::HashMap;
use std::fmt;

use crate::error::ForestError;

/// Zero-based class index assigned by a [`Dictionary`].
///
/// Stored in the last slot of every row as an `f64`. Class indices are small
/// non-negative integers that are never produced by arithmetic, so exact
/// float equality on the stored value is sound.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct ClassIndex(usize);

impl ClassIndex {
    /// Create a class index from a zero-based position.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based position.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }

    /// Return the value stored in a row's label slot.
    #[must_use]
    pub fn as_value(self) -> f64 {
        self.0 as f64
    }

    /// Recover a class index from a row's label slot.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidClassValue`] when `value` is not a
    /// non-negative integer.
    pub fn from_value(value: f64) -> Result<Self, ForestError> {
        if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
            return Err(ForestError::InvalidClassValue { value });
        }
        Ok(Self(value as usize))
    }
}

impl fmt::Display for ClassIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Label dictionary built once while encoding and read-only afterwards.
///
/// Indices are assigned monotonically in first-seen order and never reused.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Dictionary {
    indices: HashMap<String, ClassIndex>,
    labels: Vec<String>,
}

impl Dictionary {
    /// Create an empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the index for `label`, assigning the next one if it is new.
    pub fn intern(&mut self, label: &str) -> ClassIndex {
        if let Some(&index) = self.indices.get(label) {
            return index;
        }
        let index = ClassIndex::new(self.labels.len());
        self.labels.push(label.to_string());
        self.indices.insert(label.to_string(), index);
        index
    }

    /// Look up an existing label without assigning.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<ClassIndex> {
        self.indices.get(label).copied()
    }

    /// Return the label recorded at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::UnknownClassIndex`] when the index was never assigned.
    pub fn resolve(&self, index: ClassIndex) -> Result<&str, ForestError> {
        self.labels
            .get(index.index())
            .map(String::as_str)
            .ok_or(ForestError::UnknownClassIndex {
                index: index.index(),
                len: self.labels.len(),
            })
    }

    /// Number of distinct labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Return `true` when no label has been interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels in index order.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Check that the forward and inverse maps describe the same mapping.
    pub(crate) fn is_consistent(&self) -> bool {
        self.indices.len() == self.labels.len()
            && self
                .labels
                .iter()
                .enumerate()
                .all(|(i, label)| self.indices.get(label) == Some(&ClassIndex::new(i)))
    }
}
