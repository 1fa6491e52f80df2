// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal each:
// assembling datasets, training a model, or re-scoring a run.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No UI or printing here (that's Layer 1)
//   - Only workflow coordination

/// Archive → partition → sample → filter → datasets
pub mod pipeline;

// The training workflow
pub mod train_use_case;

// Re-scoring the latest checkpoint of a seeded run
pub mod evaluate_use_case;
