// ============================================================
// Layer 6 - Checkpoint Manager
// ============================================================
// Saves and restores MagnitudeNet weights using Burn's
// CompactRecorder, next to the run configuration.
//
// Run directory layout:
//   <run_dir>/
//     model_epoch_1.mpk.gz   ← weights after epoch 1
//     model_epoch_2.mpk.gz
//     ...
//     latest_epoch.json      ← number of the last saved epoch
//     train_config.json      ← full TrainConfig of the run
//
// The config is what lets `evaluate` rebuild the same splits
// and the same network before loading weights into it.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use std::{fs, path::PathBuf};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::MagnitudeNet;

const LATEST_EPOCH_FILE: &str = "latest_epoch.json";
const CONFIG_FILE: &str = "train_config.json";

/// Manages the checkpoint files of one run directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create the manager, creating the directory if needed.
    pub fn new(dir: impl Into<String>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create run directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Save weights for `epoch` and move the latest-epoch pointer to it.
    pub fn save_model<B: AutodiffBackend>(
        &self,
        model: &MagnitudeNet<B>,
        epoch: usize,
    ) -> Result<()> {
        // recorder appends the extension
        let path = self.dir.join(format!("model_epoch_{epoch}"));

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let latest_path = self.dir.join(LATEST_EPOCH_FILE);
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write {LATEST_EPOCH_FILE}"))?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Load the latest saved weights into `model`.
    ///
    /// `model` must have the architecture the checkpoint was saved
    /// with, otherwise loading fails.
    pub fn load_model<B: Backend>(
        &self,
        model:  MagnitudeNet<B>,
        device: &B::Device,
    ) -> Result<MagnitudeNet<B>> {
        let epoch = self.latest_epoch()?;
        let path  = self.dir.join(format!("model_epoch_{epoch}"));

        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Has this run been trained?", path.display())
            })?;

        Ok(model.load_record(record))
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);

        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Run 'train' with this run directory first.",
                path.display()
            )
        })?;

        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config '{}'", path.display()))
    }

    /// Number of the last saved epoch.
    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join(LATEST_EPOCH_FILE);

        let s = fs::read_to_string(&path)
            .with_context(|| format!("Cannot find '{LATEST_EPOCH_FILE}'. Has this run been trained?"))?;

        Ok(serde_json::from_str::<usize>(&s)?)
    }
}
