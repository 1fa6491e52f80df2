// ============================================================
// Pipeline Error Taxonomy
// ============================================================
// Every failure the data pipeline can raise. All of them are
// fatal and surfaced synchronously; nothing here is retried.
//
//   Configuration  - caller or config bug (bad radius, stale cache, ...)
//   Shape          - array dimensions or indices disagree
//   I/O            - archive, waveform store or cache access failed
//
// The application and CLI layers wrap these in anyhow with context.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for the data pipeline and graph builder.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    // ========== Configuration Errors ==========

    /// A cached sample set was built for a different count
    #[error(
        "cached sample at '{path}' holds {found} traces but {expected} were requested; \
         delete the cache directory and run again"
    )]
    SizeMismatch { path: PathBuf, expected: usize, found: usize },

    /// More samples requested than the archive holds
    #[error("cannot draw {requested} samples from an archive of {available} traces")]
    SampleTooLarge { requested: usize, available: usize },

    /// Training count exceeds the total sample count
    #[error("training count {train} exceeds total sample count {total}")]
    InvalidPartition { total: usize, train: usize },

    /// Neighbour radius must be at least one
    #[error("neighbour radius must be >= 1, got {0}")]
    InvalidRadius(usize),

    /// Unknown scaler mode string
    #[error("unknown scaler mode '{0}', expected 'sta' or 'min'")]
    UnsupportedScalerMode(String),

    /// Array rank outside the accepted set
    #[error("{what} must have rank {expected}, got rank {actual}")]
    UnsupportedRank { what: &'static str, expected: &'static str, actual: usize },

    /// Window configuration cannot be satisfied
    #[error("invalid window: {reason}")]
    InvalidWindow { reason: String },

    /// fit_transform called on an already fitted scaler
    #[error("scaler is already fitted; create a new scaler to fit different data")]
    ScalerAlreadyFitted,

    /// transform/inverse called before fit
    #[error("scaler has not been fitted")]
    ScalerNotFitted,

    /// inverse_transform called with no arrays
    #[error("no arrays given for inverse transform")]
    EmptyInverseInput,

    // ========== Shape Errors ==========

    /// Leading dimensions disagree
    #[error("{what} has {actual} rows but the data has {expected}")]
    ShapeMismatch { what: String, expected: usize, actual: usize },

    /// Feature count differs from the fitted statistics
    #[error("scaler was fitted on {expected} features, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },

    /// Row or node index past the end of its collection
    #[error("{what} index {index} is out of range for {len} entries")]
    IndexOutOfRange { what: &'static str, index: usize, len: usize },

    /// Window extends past the end of the record
    #[error("window {start}..{end} exceeds record length {len} (row {row})")]
    WindowOutOfBounds { row: usize, start: usize, end: usize, len: usize },

    // ========== I/O Errors ==========

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("metadata error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("cannot read array '{path}': {source}")]
    NpyRead {
        path: PathBuf,
        #[source]
        source: ndarray_npy::ReadNpyError,
    },

    #[error("cannot write array '{path}': {source}")]
    NpyWrite {
        path: PathBuf,
        #[source]
        source: ndarray_npy::WriteNpyError,
    },

    /// Trace name missing from the waveform store
    #[error("trace '{0}' not found in waveform store")]
    TraceNotFound(String),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
