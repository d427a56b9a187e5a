//! Schema-tagged observation collections and their partitions

use super::loader::CsvLoader;
use super::observation::{Delimiter, Observation, Schema};
use crate::error::{CreditScoreError, Result};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::Path;

/// Ordered observations plus the schema they were read with
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    schema: Schema,
    observations: Vec<Observation>,
}

impl Dataset {
    pub fn new(schema: Schema, observations: Vec<Observation>) -> Self {
        Self {
            schema,
            observations,
        }
    }

    /// Read a positional CSV into a dataset
    pub fn load(path: impl AsRef<Path>, delimiter: Delimiter, schema: &Schema) -> Result<Self> {
        let observations = CsvLoader::new(schema.clone())
            .with_delimiter(delimiter)
            .load(path)?;
        Ok(Self::new(schema.clone(), observations))
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Labels as 0.0 / 1.0
    pub fn labels(&self) -> Array1<f64> {
        self.observations
            .iter()
            .map(|o| if o.label { 1.0 } else { 0.0 })
            .collect()
    }

    /// (positives, negatives)
    pub fn label_counts(&self) -> (usize, usize) {
        let positives = self.observations.iter().filter(|o| o.label).count();
        (positives, self.len() - positives)
    }

    /// Rows at `indices`, in that order
    pub fn subset(&self, indices: &[usize]) -> Self {
        let observations = indices
            .iter()
            .filter_map(|&i| self.observations.get(i).cloned())
            .collect();
        Self::new(self.schema.clone(), observations)
    }

    /// Seeded random split into (train, test). Disjoint and exhaustive.
    pub fn train_test_split(&self, test_fraction: f64, seed: u64) -> Result<(Self, Self)> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(CreditScoreError::InvalidParameter {
                name: "test_fraction".to_string(),
                value: test_fraction.to_string(),
                reason: "must be in (0, 1)".to_string(),
            });
        }
        if self.len() < 2 {
            return Err(CreditScoreError::FitError(format!(
                "cannot split {} rows into train and test",
                self.len()
            )));
        }

        let mut indices: Vec<usize> = (0..self.len()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let n_test = ((self.len() as f64) * test_fraction).round() as usize;
        let n_test = n_test.clamp(1, self.len() - 1);
        let (test_idx, train_idx) = indices.split_at(n_test);

        Ok((self.subset(train_idx), self.subset(test_idx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy(n: usize) -> Dataset {
        let observations = (0..n)
            .map(|i| Observation::new(vec![i as f64; 13], "A", i % 2 == 0))
            .collect();
        Dataset::new(Schema::credit_scoring(), observations)
    }

    #[test]
    fn test_split_is_disjoint_and_exhaustive() {
        let data = toy(50);
        let (train, test) = data.train_test_split(0.2, 1).unwrap();

        assert_eq!(train.len(), 40);
        assert_eq!(test.len(), 10);

        let mut seen: Vec<f64> = train
            .observations()
            .iter()
            .chain(test.observations())
            .map(|o| o.ratios[0])
            .collect();
        seen.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(seen, (0..50).map(|i| i as f64).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_seeded() {
        let data = toy(30);
        let (a, _) = data.train_test_split(0.2, 7).unwrap();
        let (b, _) = data.train_test_split(0.2, 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_split_rejects_bad_fraction() {
        assert!(toy(10).train_test_split(1.0, 1).is_err());
    }

    #[test]
    fn test_label_counts() {
        assert_eq!(toy(5).label_counts(), (3, 2));
    }
}
