// ============================================================
// Layer 4 - Reversible Feature Scaler
// ============================================================
// Per-feature normalisation fitted on the training split only:
//
//   sta  (Standard) → x' = (x - mean) / std      population std
//   min  (MinMax)   → x' = (x - min) / (max - min)
//
// A zero std or zero range is replaced by 1 so constant features
// pass through shifted but not divided by zero.
//
// Arrays of any rank are accepted as long as axis 0 is the sample
// axis: they are flattened to [samples, features] for the maths
// and reshaped back afterwards, so
//   inverse_transform(transform(x)) has exactly x's shape.
//
// Fitting is a one-way state transition, Unfitted → Fitted.
// A second fit is rejected so test data can never silently
// overwrite statistics learned from the training split.

use std::str::FromStr;

use ndarray::{Array, Array2, ArrayBase, Axis, Data, Dimension, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleMode {
    /// Zero mean, unit variance
    Standard,
    /// Range mapped to [0, 1]
    MinMax,
}

impl FromStr for ScaleMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sta" => Ok(ScaleMode::Standard),
            "min" => Ok(ScaleMode::MinMax),
            other => Err(PipelineError::UnsupportedScalerMode(other.to_string())),
        }
    }
}

/// x' = (x - offset) / scale, per feature
#[derive(Debug, Clone, PartialEq)]
struct FeatureStats {
    offset: Vec<f64>,
    scale:  Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
enum ScalerState {
    Unfitted,
    Fitted(FeatureStats),
}

#[derive(Debug, Clone)]
pub struct Scaler {
    mode:  ScaleMode,
    state: ScalerState,
}

impl Scaler {
    pub fn new(mode: ScaleMode) -> Self {
        Self { mode, state: ScalerState::Unfitted }
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self.state, ScalerState::Fitted(_))
    }

    /// Fit on `train` and return it transformed, in its original shape.
    pub fn fit_transform<S, D>(&mut self, train: &ArrayBase<S, D>) -> PipelineResult<Array<f64, D>>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        if self.is_fitted() {
            return Err(PipelineError::ScalerAlreadyFitted);
        }

        let flat = as_rows(train)?;
        if flat.nrows() == 0 {
            return Err(PipelineError::ShapeMismatch {
                what:     "scaler training data".to_string(),
                expected: 1,
                actual:   0,
            });
        }

        let stats = match self.mode {
            ScaleMode::Standard => standard_stats(&flat),
            ScaleMode::MinMax   => min_max_stats(&flat),
        };
        tracing::debug!(
            "Fitted {:?} scaler on {} samples × {} features",
            self.mode,
            flat.nrows(),
            flat.ncols()
        );

        self.state = ScalerState::Fitted(stats);
        self.transform(train)
    }

    /// Apply the fitted statistics to `x`.
    pub fn transform<S, D>(&self, x: &ArrayBase<S, D>) -> PipelineResult<Array<f64, D>>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let stats = self.stats()?;
        self.apply(x, |v, offset, scale| (v - offset) / scale, stats)
    }

    /// Apply the fitted statistics to each array, in order.
    pub fn transform_many<S, D>(&self, xs: &[ArrayBase<S, D>]) -> PipelineResult<Vec<Array<f64, D>>>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        xs.iter().map(|x| self.transform(x)).collect()
    }

    /// Undo the transform for each array, restoring each one's shape.
    pub fn inverse_transform<S, D>(&self, xs: &[ArrayBase<S, D>]) -> PipelineResult<Vec<Array<f64, D>>>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        if xs.is_empty() {
            return Err(PipelineError::EmptyInverseInput);
        }
        let stats = self.stats()?;
        xs.iter()
            .map(|x| self.apply(x, |v, offset, scale| v * scale + offset, stats))
            .collect()
    }

    fn stats(&self) -> PipelineResult<&FeatureStats> {
        match &self.state {
            ScalerState::Fitted(stats) => Ok(stats),
            ScalerState::Unfitted => Err(PipelineError::ScalerNotFitted),
        }
    }

    fn apply<S, D, F>(
        &self,
        x:     &ArrayBase<S, D>,
        f:     F,
        stats: &FeatureStats,
    ) -> PipelineResult<Array<f64, D>>
    where
        S: Data<Elem = f64>,
        D: Dimension,
        F: Fn(f64, f64, f64) -> f64,
    {
        let mut flat = as_rows(x)?;
        if flat.ncols() != stats.offset.len() {
            return Err(PipelineError::FeatureMismatch {
                expected: stats.offset.len(),
                actual:   flat.ncols(),
            });
        }

        for mut row in flat.axis_iter_mut(Axis(0)) {
            Zip::from(&mut row)
                .and(&stats.offset[..])
                .and(&stats.scale[..])
                .for_each(|v, &offset, &scale| *v = f(*v, offset, scale));
        }

        flat.into_shape_with_order(x.raw_dim()).map_err(|_| PipelineError::ShapeMismatch {
            what:     "scaled array".to_string(),
            expected: x.len(),
            actual:   x.len(),
        })
    }
}

/// Flatten to [samples, features] in row-major order.
fn as_rows<S, D>(x: &ArrayBase<S, D>) -> PipelineResult<Array2<f64>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    if x.ndim() == 0 {
        return Err(PipelineError::UnsupportedRank {
            what:     "scaler input",
            expected: ">= 1",
            actual:   0,
        });
    }
    let rows     = x.len_of(Axis(0));
    let features = x.shape()[1..].iter().product::<usize>();

    let flat: Vec<f64> = x.iter().copied().collect();
    Array2::from_shape_vec((rows, features), flat).map_err(|_| PipelineError::ShapeMismatch {
        what:     "scaler input".to_string(),
        expected: rows * features,
        actual:   x.len(),
    })
}

fn standard_stats(x: &Array2<f64>) -> FeatureStats {
    let n = x.nrows() as f64;
    let mut offset = Vec::with_capacity(x.ncols());
    let mut scale  = Vec::with_capacity(x.ncols());

    for col in x.axis_iter(Axis(1)) {
        let mean = col.sum() / n;
        let var  = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std  = var.sqrt();
        offset.push(mean);
        scale.push(if std == 0.0 { 1.0 } else { std });
    }
    FeatureStats { offset, scale }
}

fn min_max_stats(x: &Array2<f64>) -> FeatureStats {
    let mut offset = Vec::with_capacity(x.ncols());
    let mut scale  = Vec::with_capacity(x.ncols());

    for col in x.axis_iter(Axis(1)) {
        let min = col.iter().copied().fold(f64::INFINITY, f64::min);
        let max = col.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;
        offset.push(min);
        scale.push(if range == 0.0 { 1.0 } else { range });
    }
    FeatureStats { offset, scale }
}

// ─── One-shot helper ──────────────────────────────────────────────────────────
/// A freshly fitted scaler with the training split and any other
/// splits transformed by it.
#[derive(Debug, Clone)]
pub struct PreparedScaling<D: Dimension> {
    pub scaler: Scaler,
    pub train:  Array<f64, D>,
    /// One entry per extra array, in argument order (may be empty)
    pub others: Vec<Array<f64, D>>,
}

/// Fit a new scaler on `train`, then transform `others` with it.
pub fn prep_transform<S, D>(
    mode:   ScaleMode,
    train:  &ArrayBase<S, D>,
    others: &[ArrayBase<S, D>],
) -> PipelineResult<PreparedScaling<D>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let mut scaler = Scaler::new(mode);
    let train  = scaler.fit_transform(train)?;
    let others = scaler.transform_many(others)?;
    Ok(PreparedScaling { scaler, train, others })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1, Array3};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random(shape: (usize, usize, usize), seed: u64) -> Array3<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        Array3::from_shape_simple_fn(shape, || rng.gen_range(-50.0..120.0))
    }

    fn assert_close<D: Dimension>(a: &Array<f64, D>, b: &Array<f64, D>) {
        assert_eq!(a.shape(), b.shape());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-6, "{x} vs {y}");
        }
    }

    #[test]
    fn test_round_trip_both_modes() {
        for mode in [ScaleMode::Standard, ScaleMode::MinMax] {
            let x = random((20, 3, 7), 42);
            let mut scaler = Scaler::new(mode);
            let t = scaler.fit_transform(&x).unwrap();
            let back = scaler.inverse_transform(&[t]).unwrap();
            assert_close(&back[0], &x);
        }
    }

    #[test]
    fn test_standard_gives_zero_mean_unit_variance() {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]];
        let mut scaler = Scaler::new(ScaleMode::Standard);
        let t = scaler.fit_transform(&x).unwrap();
        for col in t.axis_iter(Axis(1)) {
            let mean = col.sum() / 4.0;
            let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 4.0;
            assert!(mean.abs() < 1e-12);
            assert!((var - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_min_max_maps_train_to_unit_range() {
        let x: Array1<f64> = array![2.0, 4.0, 6.0];
        let mut scaler = Scaler::new(ScaleMode::MinMax);
        let t = scaler.fit_transform(&x).unwrap();
        assert_eq!(t, array![0.0, 0.5, 1.0]);

        // test data uses train statistics, so it may leave [0, 1]
        let other = scaler.transform(&array![8.0]).unwrap();
        assert_eq!(other, array![1.5]);
    }

    #[test]
    fn test_constant_feature_does_not_divide_by_zero() {
        let x = array![[5.0, 1.0], [5.0, 2.0]];
        let mut scaler = Scaler::new(ScaleMode::Standard);
        let t = scaler.fit_transform(&x).unwrap();
        assert_eq!(t[[0, 0]], 0.0);
        assert_eq!(t[[1, 0]], 0.0);
    }

    #[test]
    fn test_second_fit_is_rejected() {
        let x = array![[1.0], [2.0]];
        let mut scaler = Scaler::new(ScaleMode::Standard);
        scaler.fit_transform(&x).unwrap();
        let err = scaler.fit_transform(&array![[100.0], [200.0]]).unwrap_err();
        assert!(matches!(err, PipelineError::ScalerAlreadyFitted));
        // original statistics still in force
        assert_eq!(scaler.transform(&array![[1.5]]).unwrap(), array![[0.0]]);
    }

    #[test]
    fn test_unfitted_scaler_rejects_transform() {
        let scaler = Scaler::new(ScaleMode::MinMax);
        let err = scaler.transform(&array![1.0]).unwrap_err();
        assert!(matches!(err, PipelineError::ScalerNotFitted));
    }

    #[test]
    fn test_inverse_needs_at_least_one_array() {
        let mut scaler = Scaler::new(ScaleMode::MinMax);
        scaler.fit_transform(&array![1.0, 2.0]).unwrap();
        let none: [Array1<f64>; 0] = [];
        let err = scaler.inverse_transform(&none).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInverseInput));
    }

    #[test]
    fn test_feature_count_must_match_fit() {
        let mut scaler = Scaler::new(ScaleMode::Standard);
        scaler.fit_transform(&array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        let err = scaler.transform(&array![[1.0, 2.0, 3.0]]).unwrap_err();
        assert!(matches!(err, PipelineError::FeatureMismatch { expected: 2, actual: 3 }));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("sta".parse::<ScaleMode>().unwrap(), ScaleMode::Standard);
        assert_eq!("min".parse::<ScaleMode>().unwrap(), ScaleMode::MinMax);
        let err = "robust".parse::<ScaleMode>().unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedScalerMode(m) if m == "robust"));
    }

    #[test]
    fn test_prep_transform_handles_zero_one_many() {
        let train = random((10, 2, 2), 1);
        let a = random((4, 2, 2), 2);
        let b = random((3, 2, 2), 3);

        let none = prep_transform(ScaleMode::Standard, &train, &[]).unwrap();
        assert!(none.others.is_empty());

        let many = prep_transform(ScaleMode::Standard, &train, &[a.clone(), b.clone()]).unwrap();
        assert_eq!(many.others.len(), 2);
        assert_eq!(many.others[1].dim(), (3, 2, 2));

        let back = many.scaler.inverse_transform(&many.others).unwrap();
        assert_close(&back[0], &a);
        assert_close(&back[1], &b);
    }
}
