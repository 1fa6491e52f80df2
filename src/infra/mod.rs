// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Run-directory side effects shared by training and evaluation:
//
//   checkpoint.rs - Model weights via Burn's CompactRecorder,
//                   plus the TrainConfig as JSON so `evaluate`
//                   can rebuild the exact run.
//
//   metrics.rs    - RMSE / R² and the per-epoch metrics CSV.
//
//   results.rs    - Per-trace prediction tables for each split.
//
// Reference: Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Regression metrics and the epoch CSV logger
pub mod metrics;

/// Prediction CSV writer
pub mod results;
