//! Missing-value imputation

use crate::error::{CreditScoreError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Trait for imputers
pub trait Imputer: Send + Sync {
    /// Fit the imputer on data with missing values
    fn fit(&mut self, x: &Array2<f64>) -> Result<()>;

    /// Transform data by imputing missing values
    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    /// Fit and transform in one step
    fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

/// Check if value is missing (NaN)
#[inline]
pub fn is_missing(v: f64) -> bool {
    v.is_nan()
}

/// Replaces NaN with the training mean of its column.
///
/// Only the listed columns are imputed. A column that is missing in every
/// training row imputes 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanImputer {
    columns: Vec<usize>,
    means: Option<Array1<f64>>,
}

impl MeanImputer {
    pub fn new(columns: Vec<usize>) -> Self {
        Self {
            columns,
            means: None,
        }
    }

    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    pub fn means(&self) -> Option<&Array1<f64>> {
        self.means.as_ref()
    }
}

impl Imputer for MeanImputer {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        if let Some(&bad) = self.columns.iter().find(|&&c| c >= x.ncols()) {
            return Err(CreditScoreError::SchemaMismatch {
                expected: format!("column {} to impute", bad),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let means = x
            .axis_iter(Axis(1))
            .map(|col| {
                // Running convex combination; a plain sum overflows near f64::MAX
                col.iter()
                    .filter(|v| !is_missing(**v))
                    .fold((0.0, 0usize), |(mean, n), &v| {
                        let k = (n + 1) as f64;
                        (mean * (n as f64 / k) + v / k, n + 1)
                    })
                    .0
            })
            .collect();

        self.means = Some(means);
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let means = self.means.as_ref().ok_or(CreditScoreError::ModelNotFitted)?;
        if x.ncols() != means.len() {
            return Err(CreditScoreError::SchemaMismatch {
                expected: format!("{} columns", means.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut out = x.clone();
        for &c in &self.columns {
            let mean = means[c];
            out.column_mut(c).mapv_inplace(|v| if is_missing(v) { mean } else { v });
        }
        Ok(out)
    }
}
