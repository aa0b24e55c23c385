// src/data_analysis/curve_stats.rs

use ndarray::{Array1, Array2, Axis};
use ndarray_stats::QuantileExt;

use crate::constants::NORMALIZED_POINTS;
use crate::data_analysis::normalize::NormalizedCurve;
use crate::error::{GaitDataError, Result};

/// Per-percent average of several normalized curves (cycles or trials).
#[derive(Debug, Clone, PartialEq)]
pub struct CurveStats {
    pub count: usize,
    pub mean: Array1<f64>,
    pub std: Array1<f64>,
}

impl CurveStats {
    /// Mean and population standard deviation at every percent of the cycle.
    pub fn from_curves(curves: &[NormalizedCurve]) -> Result<Self> {
        if curves.is_empty() {
            return Err(GaitDataError::NoCurves);
        }
        let stacked = Array2::from_shape_fn((curves.len(), NORMALIZED_POINTS), |(r, c)| curves[r].values()[c]);
        let mean = stacked.mean_axis(Axis(0)).ok_or(GaitDataError::NoCurves)?;
        let std = stacked.std_axis(Axis(0), 0.0);
        Ok(Self {
            count: curves.len(),
            mean,
            std,
        })
    }

    /// (min, max) of the mean curve; None if it contains NaN.
    pub fn mean_range(&self) -> Option<(f64, f64)> {
        let min = *self.mean.min().ok()?;
        let max = *self.mean.max().ok()?;
        Some((min, max))
    }

    /// Percent of the cycle at which the mean curve peaks.
    pub fn peak_percent(&self) -> Option<usize> {
        self.mean.argmax().ok()
    }
}

/// (min, max) of a single curve; None if it contains NaN.
pub fn curve_range(curve: &NormalizedCurve) -> Option<(f64, f64)> {
    let values = curve.values();
    Some((*values.min().ok()?, *values.max().ok()?))
}


// src/data_analysis/curve_stats.rs
