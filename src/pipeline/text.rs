//! Text featurization of the categorical code column

use crate::error::{CreditScoreError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lowercasing tokenizer that splits on anything not alphanumeric
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextTokenizer;

impl TextTokenizer {
    pub fn new() -> Self {
        Self
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect()
    }
}

/// Character trigrams of `<token>`
fn char_trigrams(token: &str) -> Vec<String> {
    let padded: Vec<char> = format!("<{}>", token).chars().collect();
    padded
        .windows(3)
        .map(|w| w.iter().collect::<String>())
        .collect()
}

/// Word-unigram plus char-trigram counts, L2-normalized per row.
///
/// Slots are the word vocabulary in sorted order followed by the trigram
/// vocabulary in sorted order. Tokens unseen at fit time contribute nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFeaturizer {
    column: String,
    tokenizer: TextTokenizer,
    words: BTreeMap<String, usize>,
    chars: BTreeMap<String, usize>,
    is_fitted: bool,
}

impl TextFeaturizer {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            tokenizer: TextTokenizer::new(),
            words: BTreeMap::new(),
            chars: BTreeMap::new(),
            is_fitted: false,
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn n_features(&self) -> usize {
        self.words.len() + self.chars.len()
    }

    pub fn fit<S: AsRef<str>>(&mut self, documents: &[S]) -> Result<()> {
        let mut words = BTreeMap::new();
        let mut chars = BTreeMap::new();

        for doc in documents {
            for token in self.tokenizer.tokenize(doc.as_ref()) {
                for gram in char_trigrams(&token) {
                    chars.insert(gram, 0);
                }
                words.insert(token, 0);
            }
        }

        for (idx, slot) in words.values_mut().enumerate() {
            *slot = idx;
        }
        let offset = words.len();
        for (idx, slot) in chars.values_mut().enumerate() {
            *slot = offset + idx;
        }

        self.words = words;
        self.chars = chars;
        self.is_fitted = true;
        Ok(())
    }

    pub fn transform<S: AsRef<str>>(&self, documents: &[S]) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(CreditScoreError::ModelNotFitted);
        }

        let mut result = Array2::zeros((documents.len(), self.n_features()));

        for (row, doc) in documents.iter().enumerate() {
            for token in self.tokenizer.tokenize(doc.as_ref()) {
                if let Some(&idx) = self.words.get(&token) {
                    result[[row, idx]] += 1.0;
                }
                for gram in char_trigrams(&token) {
                    if let Some(&idx) = self.chars.get(&gram) {
                        result[[row, idx]] += 1.0;
                    }
                }
            }

            let norm = result.row(row).iter().map(|&v| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                result.row_mut(row).mapv_inplace(|v| v / norm);
            }
        }

        Ok(result)
    }

    /// `{column}.word.{t}` then `{column}.char.{t}`, in slot order
    pub fn feature_names(&self) -> Vec<String> {
        self.words
            .keys()
            .map(|t| format!("{}.word.{}", self.column, t))
            .chain(
                self.chars
                    .keys()
                    .map(|t| format!("{}.char.{}", self.column, t)),
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenizer() {
        let tokenizer = TextTokenizer::new();
        assert_eq!(tokenizer.tokenize("47.11-A"), vec!["47", "11", "a"]);
        assert!(tokenizer.tokenize("").is_empty());
    }

    #[test]
    fn test_char_trigrams() {
        assert_eq!(char_trigrams("ab"), vec!["<ab", "ab>"]);
        assert_eq!(char_trigrams("a"), vec!["<a>"]);
    }

    #[test]
    fn test_vocabulary_is_sorted() {
        let mut featurizer = TextFeaturizer::new("CNAE");
        featurizer.fit(&["b", "a"]).unwrap();

        assert_eq!(
            featurizer.feature_names(),
            vec!["CNAE.word.a", "CNAE.word.b", "CNAE.char.<a>", "CNAE.char.<b>"]
        );
    }

    #[test]
    fn test_rows_are_l2_normalized() {
        let mut featurizer = TextFeaturizer::new("CNAE");
        featurizer.fit(&["4711 a", "b"]).unwrap();
        let x = featurizer.transform(&["4711 a"]).unwrap();

        let norm: f64 = x.row(0).iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_unseen_tokens_ignored() {
        let mut featurizer = TextFeaturizer::new("CNAE");
        featurizer.fit(&["a"]).unwrap();
        let x = featurizer.transform(&["zzz"]).unwrap();
        assert!(x.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_transform_before_fit() {
        let featurizer = TextFeaturizer::new("CNAE");
        assert!(featurizer.transform(&["a"]).is_err());
    }
}
