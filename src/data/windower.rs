// ============================================================
// Layer 4 - Arrival Windower
// ============================================================
// Cuts a fixed-length window out of each raw trace and builds the
// matching fuzzy-label target curve:
//
//   window_len W = n_len + p_len
//
//   Aligned (arrival > n_len):
//     input  = data[:, arrival - n_len .. arrival + p_len]
//     target = [sentinel; n_len] ++ [magnitude; p_len]
//
//   LeftAnchored (arrival <= n_len):
//     input  = data[:, 0 .. W]
//     target = [sentinel; arrival] ++ [magnitude; W - arrival]
//
// The sentinel (default -4) sits far below any real magnitude so
// the "no event yet" region is unmistakable in the loss.

use ndarray::{s, Array1, Array2, Array3, ArrayView2, ArrayView3, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// Window geometry and sentinel value. Constants, never derived from data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub window_len: usize,
    /// Samples kept after the arrival
    pub p_len:      usize,
    pub sentinel:   f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { window_len: 512, p_len: 125, sentinel: -4.0 }
    }
}

impl WindowConfig {
    pub fn new(window_len: usize, p_len: usize, sentinel: f32) -> PipelineResult<Self> {
        let cfg = Self { window_len, p_len, sentinel };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Samples before the arrival in an aligned window
    pub fn n_len(&self) -> usize {
        self.window_len.saturating_sub(self.p_len)
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.window_len == 0 {
            return Err(PipelineError::InvalidWindow {
                reason: "window length must be positive".to_string(),
            });
        }
        if self.p_len > self.window_len {
            return Err(PipelineError::InvalidWindow {
                reason: format!(
                    "p_len {} exceeds window length {}",
                    self.p_len, self.window_len
                ),
            });
        }
        Ok(())
    }

    /// Enough samples before the arrival to place it at `n_len`
    pub fn has_left_margin(&self, arrival: usize) -> bool {
        arrival > self.n_len()
    }

    pub fn placement(&self, arrival: usize) -> WindowPlacement {
        if self.has_left_margin(arrival) {
            WindowPlacement::Aligned { start: arrival - self.n_len() }
        } else {
            WindowPlacement::LeftAnchored
        }
    }
}

/// Where the window starts and how long the sentinel prefix is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPlacement {
    /// Arrival sits exactly `n_len` samples into the window
    Aligned { start: usize },
    /// Arrival too early; window starts at sample 0
    LeftAnchored,
}

impl WindowPlacement {
    pub fn start(&self) -> usize {
        match *self {
            WindowPlacement::Aligned { start } => start,
            WindowPlacement::LeftAnchored => 0,
        }
    }

    /// Number of leading sentinel samples in the target curve
    pub fn sentinel_len(&self, cfg: &WindowConfig, arrival: usize) -> usize {
        match self {
            WindowPlacement::Aligned { .. } => cfg.n_len(),
            WindowPlacement::LeftAnchored => arrival,
        }
    }
}

/// One windowed input and its target curve.
#[derive(Debug, Clone)]
pub struct WindowedExample {
    /// [channels, W]
    pub input:  Array2<f32>,
    /// [W]
    pub target: Array1<f32>,
}

/// Window a single `[channels, samples]` trace.
pub fn window_one(
    data:      ArrayView2<'_, f32>,
    arrival:   usize,
    magnitude: f32,
    cfg:       &WindowConfig,
) -> PipelineResult<WindowedExample> {
    cfg.validate()?;

    let placement = cfg.placement(arrival);
    let start = placement.start();
    let end   = start + cfg.window_len;
    let len   = data.ncols();
    if end > len {
        return Err(PipelineError::WindowOutOfBounds { row: 0, start, end, len });
    }

    let input = data.slice(s![.., start..end]).to_owned();

    let sentinel_len = placement.sentinel_len(cfg, arrival);
    let target = Array1::from_shape_fn(cfg.window_len, |t| {
        if t < sentinel_len { cfg.sentinel } else { magnitude }
    });

    Ok(WindowedExample { input, target })
}

/// Window every row of a `[n, channels, samples]` batch, keeping row order.
/// Returns inputs `[n, channels, W]` and targets `[n, W]`.
pub fn window_batch(
    data:       ArrayView3<'_, f32>,
    arrivals:   &[usize],
    magnitudes: &[f32],
    cfg:        &WindowConfig,
) -> PipelineResult<(Array3<f32>, Array2<f32>)> {
    cfg.validate()?;

    let (n, channels, _) = data.dim();
    for (what, actual) in [("arrivals", arrivals.len()), ("magnitudes", magnitudes.len())] {
        if actual != n {
            return Err(PipelineError::ShapeMismatch { what: what.to_string(), expected: n, actual });
        }
    }

    let mut inputs  = Array3::<f32>::zeros((n, channels, cfg.window_len));
    let mut targets = Array2::<f32>::zeros((n, cfg.window_len));

    for (row, trace) in data.axis_iter(Axis(0)).enumerate() {
        let ex = window_one(trace, arrivals[row], magnitudes[row], cfg).map_err(|e| match e {
            PipelineError::WindowOutOfBounds { start, end, len, .. } => {
                PipelineError::WindowOutOfBounds { row, start, end, len }
            }
            other => other,
        })?;
        inputs.slice_mut(s![row, .., ..]).assign(&ex.input);
        targets.slice_mut(s![row, ..]).assign(&ex.target);
    }

    Ok((inputs, targets))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// value at [c, t] = t, so slices reveal their start
    fn ramp(samples: usize) -> Array2<f32> {
        Array2::from_shape_fn((3, samples), |(_, t)| t as f32)
    }

    #[test]
    fn test_has_left_margin_boundary() {
        let cfg = WindowConfig::default();
        assert_eq!(cfg.n_len(), 387);
        assert!(!cfg.has_left_margin(387));
        assert!(cfg.has_left_margin(388));
        assert_eq!(cfg.placement(387), WindowPlacement::LeftAnchored);
        assert_eq!(cfg.placement(388), WindowPlacement::Aligned { start: 1 });
    }

    #[test]
    fn test_early_arrival_is_left_anchored() {
        let cfg = WindowConfig::new(512, 125, -4.0).unwrap();
        let data = ramp(6000);
        let ex = window_one(data.view(), 10, 2.7, &cfg).unwrap();

        assert_eq!(ex.input.dim(), (3, 512));
        assert_eq!(ex.input[[0, 0]], 0.0);
        assert_eq!(ex.input[[2, 511]], 511.0);

        let sentinels = ex.target.iter().take_while(|&&v| v == -4.0).count();
        assert_eq!(sentinels, 10);
        assert!(ex.target.iter().skip(10).all(|&v| v == 2.7));
    }

    #[test]
    fn test_late_arrival_is_aligned() {
        let cfg = WindowConfig::default();
        let data = ramp(6000);
        let ex = window_one(data.view(), 3000, 3.4, &cfg).unwrap();

        // arrival lands at offset n_len = 387 inside the window
        assert_eq!(ex.input, data.slice(s![.., 2613..3125]).to_owned());
        assert_eq!(ex.input[[0, 387]], 3000.0);
        assert!(ex.target.iter().take(387).all(|&v| v == -4.0));
        assert!(ex.target.iter().skip(387).all(|&v| v == 3.4));
        assert_eq!(ex.target.len(), 512);
    }

    #[test]
    fn test_batch_keeps_row_order() {
        let cfg = WindowConfig::default();
        let data = Array3::from_shape_fn((2, 3, 6000), |(i, _, t)| (i * 10_000 + t) as f32);
        let (x, y) = window_batch(data.view(), &[3000, 10], &[1.5, 2.5], &cfg).unwrap();

        assert_eq!(x.dim(), (2, 3, 512));
        assert_eq!(y.dim(), (2, 512));
        assert_eq!(x[[0, 0, 0]], 2613.0);
        assert_eq!(x[[1, 0, 0]], 10_000.0);
        assert_eq!(y[[0, 511]], 1.5);
        assert_eq!(y[[1, 9]], -4.0);
        assert_eq!(y[[1, 10]], 2.5);
    }

    #[test]
    fn test_window_past_record_end_fails() {
        let cfg = WindowConfig::default();
        let data = ramp(3100);
        let err = window_one(data.view(), 3000, 1.0, &cfg).unwrap_err();
        assert!(matches!(err, PipelineError::WindowOutOfBounds { start: 2613, end: 3125, len: 3100, .. }));
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(WindowConfig::new(100, 101, -4.0).is_err());
        assert!(WindowConfig::new(0, 0, -4.0).is_err());
    }

    #[test]
    fn test_literal_config_is_validated_before_windowing() {
        let cfg = WindowConfig { window_len: 100, p_len: 101, sentinel: -4.0 };
        let data = Array2::<f32>::zeros((3, 6000));

        let err = window_one(data.view(), 10, 1.0, &cfg).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidWindow { .. }));

        let batch = Array3::<f32>::zeros((1, 3, 6000));
        let err = window_batch(batch.view(), &[10], &[1.0], &cfg).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidWindow { .. }));
    }

    #[test]
    fn test_batch_reports_failing_row() {
        let cfg = WindowConfig::default();
        let data = Array3::<f32>::zeros((2, 3, 3100));
        let err = window_batch(data.view(), &[10, 3000], &[1.0, 2.0], &cfg).unwrap_err();
        assert!(matches!(err, PipelineError::WindowOutOfBounds { row: 1, start: 2613, .. }));
    }

    #[test]
    fn test_batch_length_mismatch_fails() {
        let cfg = WindowConfig::default();
        let data = Array3::<f32>::zeros((2, 3, 6000));
        let err = window_batch(data.view(), &[10], &[1.0, 2.0], &cfg).unwrap_err();
        assert!(matches!(err, PipelineError::ShapeMismatch { expected: 2, actual: 1, .. }));
    }
}
