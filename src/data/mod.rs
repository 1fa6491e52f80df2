// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything from the raw seismic archive to tensor batches.
//
// The pipeline flows in this order:
//
//   Archive (<name>.csv + waveform store)
//       │
//       ▼
//   Partitioner       → seeded train/test positions
//       │
//       ▼
//   SampleCache       → fixed random subset, cached per count
//       │
//       ▼
//   Scale filter      → keep one magnitude scale ("ml", "md", ...)
//       │
//       ▼
//   Windower / Scaler → arrival windows + fuzzy targets, or
//                       scaled scalar labels
//       │
//       ▼
//   SeismicDataset    → implements Burn's Dataset trait
//       │
//       ▼
//   SeismicBatcher    → stacks samples into tensor batches
//
// Each module is responsible for exactly one step and is
// testable without a GPU.

/// Metadata table + keyed waveform store
pub mod archive;

/// Reproducible random subset with on-disk cache
pub mod sampler;

/// Disjoint train/test index sets
pub mod splitter;

/// Keeps rows of one magnitude scale
pub mod scale_filter;

/// Arrival-aligned windows and fuzzy-label targets
pub mod windower;

/// Reversible standard / min-max scaling
pub mod scaler;

/// Implements Burn's Dataset trait over data, labels and aux columns
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
