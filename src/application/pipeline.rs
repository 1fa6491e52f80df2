// ============================================================
// Layer 2 - Dataset Assembly
// ============================================================
// Turns a TrainConfig into ready-to-train Burn datasets:
//
//   Step 1: Open the archive                    (data::archive)
//   Step 2: Draw the train/test partition       (data::splitter)
//   Step 3: Load or draw the cached sample      (data::sampler)
//   Step 4: Keep one magnitude scale per split  (data::scale_filter)
//   Step 5a: Curve model  → arrival windows     (data::windower)
//   Step 5b: Graph model  → scalar labels,
//            optionally scaled on train         (data::scaler)
//
// The partition is drawn before sampling from the same RNG, so a
// seeded run gets the same split whether or not the cache exists.

use anyhow::{bail, Result};
use burn::data::dataset::Dataset;
use ndarray::{Array1, Array2};
use rand::{rngs::StdRng, SeedableRng};

use crate::application::train_use_case::{ModelKind, TrainConfig};
use crate::data::{
    archive::Archive,
    dataset::{AuxColumn, SeismicDataset},
    sampler::{SampleCache, SampledSet},
    scale_filter::{filter_by_scale, ScaleSelection},
    scaler::{prep_transform, Scaler},
    splitter::{partition, train_count_for, Partition},
    windower::{window_batch, WindowConfig},
};
use crate::domain::record::{MagnitudeScale, TraceRecord};
use crate::graph::{adjacency_to_edges, circulant_adjacency, EdgeList};
use crate::infra::results::PredictionRow;

/// Aux column order of every dataset built here
pub const AUX_MAGNITUDE: usize = 0;
pub const AUX_POSITION:  usize = 1;
pub const AUX_TRACE:     usize = 2;

/// Train and test datasets of one run, plus what is needed to read
/// predictions back as magnitudes.
pub struct PreparedSplits {
    pub train:        SeismicDataset,
    pub test:         SeismicDataset,
    /// Present when scalar labels were scaled
    pub label_scaler: Option<Scaler>,
    /// Values the model must produce per sample
    pub output_len:   usize,
}

/// Archive, partition and cached sample of a run, before filtering.
pub struct SampledRun {
    pub archive:   Archive,
    pub partition: Partition,
    pub sampled:   SampledSet,
}

/// Seeded runs are reproducible; unseeded runs draw from OS entropy.
pub fn run_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None       => StdRng::from_entropy(),
    }
}

/// Aux columns: true magnitude, [longitude, latitude], trace name.
pub fn magnitude_aux(
    magnitudes: &[f64],
    positions:  &[[f64; 2]],
    traces:     &[String],
) -> Vec<AuxColumn> {
    let positions = Array2::from_shape_fn((positions.len(), 2), |(i, j)| positions[i][j]);

    vec![
        AuxColumn::Numeric(Array1::from(magnitudes.to_vec()).into_dyn()),
        AuxColumn::Numeric(positions.into_dyn()),
        AuxColumn::Text(traces.to_vec()),
    ]
}

fn record_aux(records: &[TraceRecord]) -> Vec<AuxColumn> {
    let magnitudes: Vec<f64>      = records.iter().map(|r| r.source_magnitude).collect();
    let positions:  Vec<[f64; 2]> = records.iter().map(TraceRecord::position).collect();
    let traces:     Vec<String>   = records.iter().map(|r| r.trace_name.clone()).collect();
    magnitude_aux(&magnitudes, &positions, &traces)
}

/// Metadata of dataset row `index`; the predicted magnitude is left at 0.
pub fn prediction_row(dataset: &SeismicDataset, index: usize) -> Option<PredictionRow> {
    let item = dataset.get(index)?;
    let true_magnitude = item.aux.get(AUX_MAGNITUDE)?.as_scalar()?;
    let position = item.aux.get(AUX_POSITION)?.as_values()?;
    let trace_name = item.aux.get(AUX_TRACE)?.as_text()?.to_string();

    Some(PredictionRow {
        trace_name,
        longitude: *position.first()?,
        latitude:  *position.get(1)?,
        true_magnitude,
        predicted_magnitude: 0.0,
    })
}

/// Open the archive, draw the partition, then load or draw the sample.
pub fn load_sampled(cfg: &TrainConfig) -> Result<SampledRun> {
    let archive = Archive::open(&cfg.archive_root, cfg.archive_name.as_str())?;

    let mut rng = run_rng(cfg.seed);
    let train_count = train_count_for(cfg.num_samples, cfg.train_ratio);
    let partition = partition(cfg.num_samples, train_count, &mut rng)?;

    let cache = SampleCache::new(&cfg.archive_root, cfg.num_samples);
    let sampled = cache.load_or_sample(&archive, &mut rng)?;

    Ok(SampledRun { archive, partition, sampled })
}

fn select_split(
    run:       &SampledRun,
    records:   &[TraceRecord],
    positions: &[usize],
    scale:     &MagnitudeScale,
) -> Result<ScaleSelection> {
    let subset = run.sampled.select(positions);
    let records: Vec<TraceRecord> = positions.iter().map(|&p| records[p].clone()).collect();
    let labels = Array1::from(records.iter().map(|r| r.source_magnitude as f32).collect::<Vec<_>>());

    Ok(filter_by_scale(subset.waveforms.view(), labels.view(), &records, scale)?)
}

fn curve_dataset(sel: &ScaleSelection, window: &WindowConfig) -> Result<SeismicDataset> {
    let arrivals: Vec<usize> = sel.records.iter().map(TraceRecord::arrival_index).collect();
    let magnitudes = sel.labels.to_vec();
    let (inputs, targets) = window_batch(sel.data.view(), &arrivals, &magnitudes, window)?;
    Ok(SeismicDataset::new(inputs.into_dyn(), targets.into_dyn(), record_aux(&sel.records))?)
}

fn scalar_dataset(sel: &ScaleSelection, labels: Array1<f64>) -> Result<SeismicDataset> {
    let labels = labels.mapv(|v| v as f32);
    Ok(SeismicDataset::new(
        sel.data.clone().into_dyn(),
        labels.into_dyn(),
        record_aux(&sel.records),
    )?)
}

/// Build the train and test datasets described by `cfg`.
pub fn prepare_splits(cfg: &TrainConfig) -> Result<PreparedSplits> {
    let run = load_sampled(cfg)?;
    let records = run.sampled.records(&run.archive)?;
    let scale = MagnitudeScale::new(cfg.magnitude_scale.as_str());

    let train = select_split(&run, &records, &run.partition.train, &scale)?;
    let test  = select_split(&run, &records, &run.partition.test, &scale)?;
    tracing::info!(
        "Scale '{}': {} train / {} test traces (of {} / {})",
        scale,
        train.len(),
        test.len(),
        run.partition.train.len(),
        run.partition.test.len(),
    );

    if train.is_empty() {
        bail!("No training traces on magnitude scale '{scale}'. Try another --scale or more --samples.");
    }

    match cfg.model {
        ModelKind::Curve => {
            let window = WindowConfig::new(cfg.window_len, cfg.p_len, cfg.sentinel)?;
            Ok(PreparedSplits {
                train:        curve_dataset(&train, &window)?,
                test:         curve_dataset(&test, &window)?,
                label_scaler: None,
                output_len:   window.window_len,
            })
        }
        ModelKind::Graph => {
            let train_labels = train.labels.mapv(f64::from);
            let test_labels  = test.labels.mapv(f64::from);

            let (train_labels, test_labels, label_scaler) = match cfg.label_scaling {
                Some(mode) => {
                    let mut prepared = prep_transform(mode, &train_labels, &[test_labels])?;
                    let test_labels = prepared.others.remove(0);
                    tracing::info!("Scaled magnitude labels with {:?}", mode);
                    (prepared.train, test_labels, Some(prepared.scaler))
                }
                None => (train_labels, test_labels, None),
            };

            Ok(PreparedSplits {
                train:        scalar_dataset(&train, train_labels)?,
                test:         scalar_dataset(&test, test_labels)?,
                label_scaler,
                output_len:   1,
            })
        }
    }
}

/// Edges of the circulant graph the graph model convolves over.
pub fn build_edges(cfg: &TrainConfig) -> Result<Option<EdgeList>> {
    if !cfg.model.uses_graph() {
        return Ok(None);
    }
    let adm = circulant_adjacency(cfg.num_nodes, cfg.graph_radius)?;
    let edges = adjacency_to_edges(&adm);
    tracing::info!(
        "Circulant graph: {} nodes, radius {}, {} edges",
        cfg.num_nodes,
        cfg.graph_radius,
        edges.len()
    );
    Ok(Some(edges))
}
