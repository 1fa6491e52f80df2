// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Save the run config             (Layer 6 - infra)
//   Step 2: Assemble train/test datasets    (pipeline.rs)
//   Step 3: Build the circulant graph edges (Layer 3 - graph)
//   Step 4: Run the training loop           (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::application::pipeline::{build_edges, prepare_splits};
use crate::data::scaler::ScaleMode;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::trainer::run_training;

/// Which network and target type a run trains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// 512-sample arrival windows against fuzzy target curves
    Curve,
    /// Whole traces against the scalar magnitude, with graph convolution
    Graph,
}

impl ModelKind {
    pub fn uses_graph(self) -> bool {
        matches!(self, ModelKind::Graph)
    }
}

impl FromStr for ModelKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "curve" => Ok(ModelKind::Curve),
            "graph" => Ok(ModelKind::Graph),
            other   => bail!("Unknown model '{other}', expected 'curve' or 'graph'"),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Curve => f.write_str("curve"),
            ModelKind::Graph => f.write_str("graph"),
        }
    }
}

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything needed to rebuild a run: data selection, preprocessing,
// architecture and optimiser settings. Saved next to the checkpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub archive_root:    String,
    pub archive_name:    String,
    pub run_dir:         String,
    pub num_samples:     usize,
    pub train_ratio:     f64,
    pub magnitude_scale: String,
    /// None draws from OS entropy; such runs cannot be re-evaluated
    pub seed:            Option<u64>,
    pub model:           ModelKind,
    pub window_len:      usize,
    pub p_len:           usize,
    pub sentinel:        f32,
    /// Graph model only
    pub label_scaling:   Option<ScaleMode>,
    pub hidden:          usize,
    pub num_nodes:       usize,
    pub graph_radius:    usize,
    pub batch_size:      usize,
    pub epochs:          usize,
    pub lr:              f64,
    pub weight_decay:    f32,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            archive_root:    "data".to_string(),
            archive_name:    "chunk2".to_string(),
            run_dir:         "runs/curve".to_string(),
            num_samples:     100,
            train_ratio:     0.75,
            magnitude_scale: "ml".to_string(),
            seed:            Some(100),
            model:           ModelKind::Curve,
            window_len:      512,
            p_len:           125,
            sentinel:        -4.0,
            label_scaling:   None,
            hidden:          16,
            num_nodes:       64,
            graph_radius:    2,
            batch_size:      64,
            epochs:          70,
            lr:              5e-4,
            weight_decay:    5e-4,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;
        if cfg.seed.is_none() {
            tracing::warn!("Unseeded run: 'evaluate' will not be able to rebuild its test split");
        }

        // ── Step 1: Save config so `evaluate` can rebuild this run ───────────
        let ckpt_manager = CheckpointManager::new(&cfg.run_dir)?;
        ckpt_manager.save_config(cfg)?;

        // ── Step 2: Datasets ──────────────────────────────────────────────────
        let splits = prepare_splits(cfg)?;
        tracing::info!(
            "Datasets ready: {} train, {} test, output_len={}",
            splits.train.sample_count(),
            splits.test.sample_count(),
            splits.output_len
        );

        // ── Step 3: Graph (graph model only) ──────────────────────────────────
        let edges = build_edges(cfg)?;

        // ── Step 4: Training loop (Layer 5) ───────────────────────────────────
        run_training(cfg, splits, edges, ckpt_manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_kind_parses_case_insensitively() {
        assert_eq!("Curve".parse::<ModelKind>().unwrap(), ModelKind::Curve);
        assert_eq!("graph".parse::<ModelKind>().unwrap(), ModelKind::Graph);
        assert!("lstm".parse::<ModelKind>().is_err());
        assert!(ModelKind::Graph.uses_graph());
        assert!(!ModelKind::Curve.uses_graph());
    }

    #[test]
    fn test_config_json_uses_lowercase_model() {
        let cfg = TrainConfig { model: ModelKind::Graph, ..TrainConfig::default() };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"model\":\"graph\""));

        let back: TrainConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.model, ModelKind::Graph);
        assert_eq!(back.seed, Some(100));
    }
}
