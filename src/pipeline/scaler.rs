//! Min-max feature scaling

use crate::error::{CreditScoreError, Result};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// Parameters for one fitted slot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct ScalerParams {
    min: f64,
    /// `max / 2 - min / 2`, finite for any finite bounds; 0 maps every value to 0
    half_range: f64,
}

impl ScalerParams {
    fn scale(&self, v: f64) -> f64 {
        (v / 2.0 - self.min / 2.0) / self.half_range
    }
}

/// `(x - min) / (max - min)` per slot, with no clipping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl MinMaxScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        self.params = x
            .axis_iter(Axis(1))
            .map(|col| {
                let min = col.iter().cloned().fold(f64::INFINITY, f64::min);
                let max = col.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                if min.is_finite() && max.is_finite() {
                    ScalerParams {
                        min,
                        half_range: max / 2.0 - min / 2.0,
                    }
                } else {
                    ScalerParams { min: 0.0, half_range: 0.0 }
                }
            })
            .collect();
        self.is_fitted = true;
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(CreditScoreError::ModelNotFitted);
        }
        if x.ncols() != self.params.len() {
            return Err(CreditScoreError::SchemaMismatch {
                expected: format!("{} features", self.params.len()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut out = x.clone();
        for (mut col, p) in out.axis_iter_mut(Axis(1)).zip(&self.params) {
            if p.half_range == 0.0 {
                col.fill(0.0);
            } else {
                col.mapv_inplace(|v| p.scale(v));
            }
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn n_features(&self) -> usize {
        self.params.len()
    }
}
