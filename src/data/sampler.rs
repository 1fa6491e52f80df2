// ============================================================
// Layer 4 - Sampler and Sample Cache
// ============================================================
// Draws a fixed-size random subset of traces from an archive and
// persists it so repeated runs see exactly the same subset.
//
// Split in two on purpose:
//
//   draw_indices / sample    → pure: randomness + archive reads,
//                              no cache files touched
//   SampleCache              → file checks; reuses the cache when
//                              present, otherwise calls sample()
//                              and writes the result
//
// Cache layout (keyed by the requested count):
//
//   <root>/<count>/data.npy    ← f32 [count, 3, samples]
//   <root>/<count>/index.npy   ← u64 [count], archive row indices
//
// Both files present = cache hit. A hit whose row count differs
// from the request is a stale cache and fails with SizeMismatch;
// the files are left untouched so the user can inspect them.
// No locking: concurrent writers must be serialised by the caller.

use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use ndarray::{s, Array1, Array3, Axis};
use ndarray_npy::{ReadNpyExt, WriteNpyExt};
use rand::Rng;

use crate::data::archive::{Archive, TRACE_CHANNELS};
use crate::domain::record::TraceRecord;
use crate::error::{PipelineError, PipelineResult};

const DATA_FILE:  &str = "data.npy";
const INDEX_FILE: &str = "index.npy";

/// A sampled subset: archive row indices and their raw waveforms.
/// Row `i` of `waveforms` belongs to archive row `indices[i]`.
#[derive(Debug, Clone)]
pub struct SampledSet {
    pub indices:   Vec<usize>,
    /// [count, 3, samples]
    pub waveforms: Array3<f32>,
}

impl SampledSet {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Keep only the rows at `positions` (positions into this set,
    /// not archive indices), in the given order.
    pub fn select(&self, positions: &[usize]) -> SampledSet {
        SampledSet {
            indices:   positions.iter().map(|&p| self.indices[p]).collect(),
            waveforms: self.waveforms.select(Axis(0), positions),
        }
    }

    /// Metadata rows for every sampled trace, in sample order.
    pub fn records(&self, archive: &Archive) -> PipelineResult<Vec<TraceRecord>> {
        self.indices
            .iter()
            .map(|&i| {
                archive.record(i).cloned().ok_or(PipelineError::IndexOutOfRange {
                    what:  "sampled archive",
                    index: i,
                    len:   archive.len(),
                })
            })
            .collect()
    }
}

/// Draw `count` distinct indices uniformly from `0..total`.
pub fn draw_indices<R: Rng + ?Sized>(
    total: usize,
    count: usize,
    rng:   &mut R,
) -> PipelineResult<Vec<usize>> {
    if count > total {
        return Err(PipelineError::SampleTooLarge { requested: count, available: total });
    }
    Ok(rand::seq::index::sample(rng, total, count).into_vec())
}

/// Draw `count` traces from the archive and load their waveforms.
/// Touches no cache files.
pub fn sample<R: Rng + ?Sized>(
    archive: &Archive,
    count:   usize,
    rng:     &mut R,
) -> PipelineResult<SampledSet> {
    let indices = draw_indices(archive.len(), count, rng)?;

    let mut waveforms: Option<Array3<f32>> = None;
    for (row, &idx) in indices.iter().enumerate() {
        let wave = archive.waveform(idx)?;

        // Allocate once we know the trace length
        let buf = waveforms.get_or_insert_with(|| {
            Array3::zeros((count, TRACE_CHANNELS, wave.ncols()))
        });

        if wave.dim() != (buf.dim().1, buf.dim().2) {
            return Err(PipelineError::ShapeMismatch {
                what:     format!("samples of trace at archive index {idx}"),
                expected: buf.dim().2,
                actual:   wave.ncols(),
            });
        }
        buf.slice_mut(s![row, .., ..]).assign(&wave);
    }

    let waveforms = waveforms.unwrap_or_else(|| Array3::zeros((0, TRACE_CHANNELS, 0)));
    tracing::debug!("Sampled {} traces from '{}'", indices.len(), archive.name());
    Ok(SampledSet { indices, waveforms })
}

// ─── SampleCache ──────────────────────────────────────────────────────────────
/// On-disk cache of one sampled subset, keyed by sample count.
pub struct SampleCache {
    dir:   PathBuf,
    count: usize,
}

impl SampleCache {
    /// Cache for `count` samples under `<root>/<count>/`.
    pub fn new(root: impl AsRef<Path>, count: usize) -> Self {
        Self { dir: root.as_ref().join(count.to_string()), count }
    }

    pub fn data_path(&self) -> PathBuf {
        self.dir.join(DATA_FILE)
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    /// True if both cache files exist
    pub fn is_hit(&self) -> bool {
        self.data_path().exists() && self.index_path().exists()
    }

    /// Reuse the cached subset if present, otherwise sample and persist it.
    pub fn load_or_sample<R: Rng + ?Sized>(
        &self,
        archive: &Archive,
        rng:     &mut R,
    ) -> PipelineResult<SampledSet> {
        fs::create_dir_all(&self.dir).map_err(|e| PipelineError::io(&self.dir, e))?;

        if self.is_hit() {
            tracing::info!("Reusing sample cache '{}'", self.dir.display());
            return self.load();
        }

        tracing::info!(
            "No sample cache at '{}', drawing {} traces",
            self.dir.display(),
            self.count
        );
        let sampled = sample(archive, self.count, rng)?;
        self.store(&sampled)?;
        Ok(sampled)
    }

    /// Read both cache files and check they match the requested count.
    pub fn load(&self) -> PipelineResult<SampledSet> {
        let data_path  = self.data_path();
        let index_path = self.index_path();

        let file = File::open(&data_path).map_err(|e| PipelineError::io(&data_path, e))?;
        let waveforms = Array3::<f32>::read_npy(file)
            .map_err(|source| PipelineError::NpyRead { path: data_path.clone(), source })?;

        let file = File::open(&index_path).map_err(|e| PipelineError::io(&index_path, e))?;
        let index = Array1::<u64>::read_npy(file)
            .map_err(|source| PipelineError::NpyRead { path: index_path.clone(), source })?;

        for found in [waveforms.len_of(Axis(0)), index.len()] {
            if found != self.count {
                return Err(PipelineError::SizeMismatch {
                    path:     self.dir.clone(),
                    expected: self.count,
                    found,
                });
            }
        }

        Ok(SampledSet {
            indices: index.iter().map(|&i| i as usize).collect(),
            waveforms,
        })
    }

    fn store(&self, sampled: &SampledSet) -> PipelineResult<()> {
        let data_path  = self.data_path();
        let index_path = self.index_path();

        let file = File::create(&data_path).map_err(|e| PipelineError::io(&data_path, e))?;
        sampled
            .waveforms
            .write_npy(file)
            .map_err(|source| PipelineError::NpyWrite { path: data_path.clone(), source })?;

        let index: Array1<u64> = sampled.indices.iter().map(|&i| i as u64).collect();
        let file = File::create(&index_path).map_err(|e| PipelineError::io(&index_path, e))?;
        index
            .write_npy(file)
            .map_err(|source| PipelineError::NpyWrite { path: index_path.clone(), source })?;

        tracing::debug!("Wrote sample cache '{}'", self.dir.display());
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::test_record;
    use crate::domain::traits::WaveformStore;
    use ndarray::Array2;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashSet;

    /// Each trace "Tn" is filled with the value n
    struct ConstantStore {
        samples: usize,
    }

    impl WaveformStore for ConstantStore {
        fn read(&self, trace_name: &str) -> PipelineResult<Array2<f32>> {
            let n: f32 = trace_name[1..].parse().unwrap();
            Ok(Array2::from_elem((TRACE_CHANNELS, self.samples), n))
        }
    }

    fn archive(traces: usize) -> Archive {
        let records = (0..traces)
            .map(|i| test_record(&format!("T{i}"), 10.0, 2.0, "ml"))
            .collect();
        Archive::with_store("chunk", records, Box::new(ConstantStore { samples: 8 }))
    }

    #[test]
    fn test_draw_indices_unique_and_exact() {
        let mut rng = StdRng::seed_from_u64(7);
        let idx = draw_indices(100, 40, &mut rng).unwrap();
        assert_eq!(idx.len(), 40);
        let unique: HashSet<_> = idx.iter().collect();
        assert_eq!(unique.len(), 40);
        assert!(idx.iter().all(|&i| i < 100));
    }

    #[test]
    fn test_draw_indices_is_seed_deterministic() {
        let a = draw_indices(1000, 25, &mut StdRng::seed_from_u64(100)).unwrap();
        let b = draw_indices(1000, 25, &mut StdRng::seed_from_u64(100)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_draw_more_than_available_fails() {
        let err = draw_indices(5, 6, &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert!(matches!(err, PipelineError::SampleTooLarge { requested: 6, available: 5 }));
    }

    #[test]
    fn test_sample_rows_match_indices() {
        let dir = tempfile::tempdir().unwrap();
        let archive = archive(20);
        let set = sample(&archive, 6, &mut StdRng::seed_from_u64(3)).unwrap();

        assert_eq!(set.waveforms.dim(), (6, 3, 8));
        for (row, &idx) in set.indices.iter().enumerate() {
            assert_eq!(set.waveforms[[row, 2, 7]], idx as f32);
        }
        // pure: nothing written
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_cache_hit_reuses_subset() {
        let dir = tempfile::tempdir().unwrap();
        let archive = archive(30);
        let cache = SampleCache::new(dir.path(), 10);

        let first = cache.load_or_sample(&archive, &mut StdRng::seed_from_u64(1)).unwrap();
        assert!(cache.is_hit());
        let second = cache.load_or_sample(&archive, &mut StdRng::seed_from_u64(999)).unwrap();

        assert_eq!(first.indices, second.indices);
        assert_eq!(first.waveforms, second.waveforms);
    }

    #[test]
    fn test_stale_cache_size_mismatch_leaves_files_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let archive = archive(200);

        // Build a cache for 50, then present it where the 100-sample cache belongs
        let small = SampleCache::new(dir.path(), 50);
        small.load_or_sample(&archive, &mut StdRng::seed_from_u64(5)).unwrap();
        fs::rename(dir.path().join("50"), dir.path().join("100")).unwrap();

        let cache = SampleCache::new(dir.path(), 100);
        let data_before  = fs::read(cache.data_path()).unwrap();
        let index_before = fs::read(cache.index_path()).unwrap();

        let err = cache
            .load_or_sample(&archive, &mut StdRng::seed_from_u64(5))
            .unwrap_err();
        assert!(matches!(err, PipelineError::SizeMismatch { expected: 100, found: 50, .. }));

        assert_eq!(fs::read(cache.data_path()).unwrap(), data_before);
        assert_eq!(fs::read(cache.index_path()).unwrap(), index_before);
    }

    #[test]
    fn test_select_keeps_rows_and_indices_together() {
        let archive = archive(12);
        let set = sample(&archive, 5, &mut StdRng::seed_from_u64(11)).unwrap();

        let sub = set.select(&[4, 1]);
        assert_eq!(sub.indices, vec![set.indices[4], set.indices[1]]);
        assert_eq!(sub.waveforms[[0, 0, 0]], set.indices[4] as f32);

        let records = sub.records(&archive).unwrap();
        assert_eq!(records[1].trace_name, format!("T{}", set.indices[1]));
    }

    #[test]
    fn test_records_reject_index_past_archive_end() {
        let set = SampledSet { indices: vec![0, 12], waveforms: Array3::zeros((2, 3, 8)) };
        let err = set.records(&archive(12)).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::IndexOutOfRange { index: 12, len: 12, .. }
        ));
    }
}
