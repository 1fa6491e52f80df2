// ============================================================
// Layer 5 - ML / Model Layer (Burn)
// ============================================================
// The network and its training loop.
//
//   model.rs   - MagnitudeNet: two strided 1-D convolutions,
//                adaptive pooling to one feature vector per
//                graph node, an optional GCN stage over the
//                circulant graph, and a linear head producing
//                either a target curve or a single magnitude.
//
//   trainer.rs - Adam + MSE training loop, per-epoch test pass,
//                RMSE / R² on magnitudes, checkpoints, metrics
//                and prediction files.
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Kipf & Welling (2017) GCN

/// Convolutional / graph magnitude regressor
pub mod model;

/// Training loop and split evaluation
pub mod trainer;
