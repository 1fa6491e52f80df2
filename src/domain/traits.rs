// ============================================================
// Layer 3 - Core Traits (Abstractions)
// ============================================================
// The sampler reads raw waveforms through `WaveformStore` so it
// never cares whether traces live in a directory of .npy files,
// an in-memory map (tests), or some other keyed container.

use ndarray::Array2;

use crate::error::PipelineResult;

// ─── WaveformStore ────────────────────────────────────────────────────────────
/// Keyed access to raw trace waveforms.
///
/// Implementations:
///   - NpyWaveformStore → one `<trace_name>.npy` file per trace
pub trait WaveformStore: Send + Sync {
    /// Load one trace as a `[channels, samples]` array.
    fn read(&self, trace_name: &str) -> PipelineResult<Array2<f32>>;
}
