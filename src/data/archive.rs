// ============================================================
// Layer 4 - Seismic Archive
// ============================================================
// An archive is a metadata table plus a keyed waveform store:
//
//   <root>/<name>.csv          ← one row per trace (TraceRecord)
//   <root>/<name>/<trace>.npy  ← raw waveform, [6000, 3] time × channel
//
// Waveforms are stored time-major on disk and transposed to
// channel-major ([3, 6000]) when read, which is the layout every
// downstream step (windowing, batching, conv layers) expects.
//
// The sample cache lives alongside the archive under
// <root>/<count>/, see sampler.rs.

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use ndarray::Array2;
use ndarray_npy::ReadNpyExt;

use crate::domain::record::TraceRecord;
use crate::domain::traits::WaveformStore;
use crate::error::{PipelineError, PipelineResult};

/// Number of channels in every trace (E, N, Z components)
pub const TRACE_CHANNELS: usize = 3;

/// Metadata plus waveform access for one named archive.
pub struct Archive {
    name:    String,
    records: Vec<TraceRecord>,
    store:   Box<dyn WaveformStore>,
}

impl Archive {
    /// Open `<root>/<name>.csv` and the `.npy` store at `<root>/<name>/`.
    pub fn open(root: impl Into<PathBuf>, name: impl Into<String>) -> PipelineResult<Self> {
        let root = root.into();
        let name = name.into();

        let csv_path = root.join(format!("{name}.csv"));
        let records  = read_metadata(&csv_path)?;
        let store    = NpyWaveformStore::new(root.join(&name));

        tracing::info!(
            "Opened archive '{}' with {} traces from '{}'",
            name,
            records.len(),
            root.display()
        );

        Ok(Self { name, records, store: Box::new(store) })
    }

    /// Build an archive from already-loaded parts
    #[cfg(test)]
    pub fn with_store(
        name:    impl Into<String>,
        records: Vec<TraceRecord>,
        store:   Box<dyn WaveformStore>,
    ) -> Self {
        Self { name: name.into(), records, store }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[cfg(test)]
    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    pub fn record(&self, index: usize) -> Option<&TraceRecord> {
        self.records.get(index)
    }

    /// Load the waveform of the record at `index` as `[3, samples]`.
    pub fn waveform(&self, index: usize) -> PipelineResult<Array2<f32>> {
        let record = self.records.get(index).ok_or(PipelineError::IndexOutOfRange {
            what: "archive",
            index,
            len: self.records.len(),
        })?;
        self.store.read(&record.trace_name)
    }
}

/// Read every metadata row from the archive CSV.
pub fn read_metadata(path: &Path) -> PipelineResult<Vec<TraceRecord>> {
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: TraceRecord = row.map_err(|source| PipelineError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}

// ─── NpyWaveformStore ─────────────────────────────────────────────────────────
/// Waveform store backed by a directory of `<trace_name>.npy` files.
pub struct NpyWaveformStore {
    dir: PathBuf,
}

impl NpyWaveformStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn trace_path(&self, trace_name: &str) -> PathBuf {
        self.dir.join(format!("{trace_name}.npy"))
    }
}

impl WaveformStore for NpyWaveformStore {
    fn read(&self, trace_name: &str) -> PipelineResult<Array2<f32>> {
        let path = self.trace_path(trace_name);
        if !path.exists() {
            return Err(PipelineError::TraceNotFound(trace_name.to_string()));
        }

        let file = File::open(&path).map_err(|e| PipelineError::io(&path, e))?;
        let raw  = Array2::<f32>::read_npy(file)
            .map_err(|source| PipelineError::NpyRead { path: path.clone(), source })?;

        // On disk: [time, channel]
        if raw.ncols() != TRACE_CHANNELS {
            return Err(PipelineError::ShapeMismatch {
                what:     format!("channel axis of '{}'", path.display()),
                expected: TRACE_CHANNELS,
                actual:   raw.ncols(),
            });
        }

        Ok(raw.reversed_axes().as_standard_layout().to_owned())
    }
}
