// ============================================================
// Layer 2 - EvaluateUseCase
// ============================================================
// Re-scores the latest checkpoint of a seeded run:
//
//   Step 1: Load train_config.json from the run directory
//   Step 2: Rebuild the identical test split (needs the seed)
//   Step 3: Rebuild the network and load the latest weights
//   Step 4: Predict, then write test_predictions.csv and
//           evaluation.json

use anyhow::{bail, Context, Result};
use burn::data::dataloader::DataLoaderBuilder;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::application::pipeline::{build_edges, prepare_splits};
use crate::data::batcher::SeismicBatcher;
use crate::infra::{checkpoint::CheckpointManager, results::ResultsWriter};
use crate::ml::{
    model::{propagation_tensor, MagnitudeNet},
    trainer::{evaluate_split, model_config},
};

type MyBackend = burn::backend::Wgpu;

/// Test-split scores of one checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub epoch:   usize,
    pub samples: usize,
    pub loss:    f64,
    pub rmse:    f64,
    pub r2:      f64,
}

pub struct EvaluateUseCase {
    run_dir: String,
}

impl EvaluateUseCase {
    pub fn new(run_dir: impl Into<String>) -> Self {
        Self { run_dir: run_dir.into() }
    }

    pub fn execute(&self) -> Result<EvaluationSummary> {
        let ckpt_manager = CheckpointManager::new(&self.run_dir)?;
        let cfg = ckpt_manager.load_config()?;

        if cfg.seed.is_none() {
            bail!(
                "Run '{}' was trained without --seed, so its test split cannot be rebuilt",
                self.run_dir
            );
        }

        let splits = prepare_splits(&cfg)?;
        let edges  = build_edges(&cfg)?;

        let device = burn::backend::wgpu::WgpuDevice::default();
        let model: MagnitudeNet<MyBackend> = model_config(&cfg, splits.output_len).init(&device);
        let model = ckpt_manager.load_model(model, &device)?;
        let epoch = ckpt_manager.latest_epoch()?;

        let propagation = edges
            .as_ref()
            .map(|e| propagation_tensor::<MyBackend>(e, cfg.num_nodes, &device))
            .transpose()?;

        let loader = DataLoaderBuilder::new(SeismicBatcher::<MyBackend>::new(device.clone()))
            .batch_size(cfg.batch_size)
            .num_workers(1)
            .build(splits.test.clone());

        let outcome = evaluate_split(
            &model,
            loader,
            &splits.test,
            propagation.as_ref(),
            splits.label_scaler.as_ref(),
        )?;

        let summary = EvaluationSummary {
            epoch,
            samples: outcome.predictions.len(),
            loss:    outcome.loss,
            rmse:    outcome.rmse(),
            r2:      outcome.r2(),
        };

        ResultsWriter::new(&self.run_dir)?.write_split("test", &splits.test, &outcome.predictions)?;

        let path = PathBuf::from(&self.run_dir).join("evaluation.json");
        fs::write(&path, serde_json::to_string_pretty(&summary)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;

        tracing::info!(
            "Epoch {} on {} test traces: loss={:.4} rmse={:.4} r2={:.4}",
            summary.epoch, summary.samples, summary.loss, summary.rmse, summary.r2
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;

    #[test]
    fn test_unseeded_run_is_rejected_before_loading_data() {
        let dir = tempfile::tempdir().unwrap();
        let run_dir = dir.path().to_string_lossy().to_string();

        let cfg = TrainConfig { seed: None, run_dir: run_dir.clone(), ..TrainConfig::default() };
        CheckpointManager::new(&run_dir).unwrap().save_config(&cfg).unwrap();

        let err = EvaluateUseCase::new(run_dir).execute().unwrap_err();
        assert!(err.to_string().contains("without --seed"));
    }

    #[test]
    fn test_missing_config_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = EvaluateUseCase::new(dir.path().to_string_lossy().to_string())
            .execute()
            .unwrap_err();
        assert!(err.to_string().contains("train_config.json"));
    }
}
