// ============================================================
// Layer 5 - Training Loop
// ============================================================
// Train + test loop using Burn's DataLoader and Adam.
//
//   - Training uses MyBackend (Autodiff<Wgpu>) for gradients
//   - model.valid() returns the model on MyInnerBackend (Wgpu)
//   - The test loader and propagation matrix must use the inner backend
//   - Metrics are computed on magnitudes, after undoing label scaling
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{anyhow, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{decay::WeightDecayConfig, AdamConfig, GradientsParams, Optimizer},
    prelude::*,
};
use ndarray::Array1;
use std::sync::Arc;

use crate::application::pipeline::{prediction_row, PreparedSplits};
use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{SeismicBatch, SeismicBatcher},
    dataset::SeismicDataset,
    scaler::Scaler,
};
use crate::graph::EdgeList;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{r2, rmse, EpochMetrics, MetricsLogger},
    results::ResultsWriter,
};
use crate::ml::model::{magnitudes, propagation_tensor, MagnitudeNet, MagnitudeNetConfig};

type MyBackend      = burn::backend::Autodiff<burn::backend::Wgpu>;
type MyInnerBackend = burn::backend::Wgpu;

/// Seed for the training loader's shuffle
const SHUFFLE_SEED: u64 = 42;

/// One predicted magnitude, keyed by its dataset position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub index:               usize,
    pub true_magnitude:      f64,
    pub predicted_magnitude: f64,
}

/// Mean loss and all predictions for one pass over a split.
#[derive(Debug, Clone, Default)]
pub struct SplitOutcome {
    pub loss:        f64,
    pub predictions: Vec<Prediction>,
}

impl SplitOutcome {
    fn columns(&self) -> (Vec<f64>, Vec<f64>) {
        self.predictions
            .iter()
            .map(|p| (p.true_magnitude, p.predicted_magnitude))
            .unzip()
    }

    pub fn rmse(&self) -> f64 {
        let (t, p) = self.columns();
        rmse(&t, &p)
    }

    pub fn r2(&self) -> f64 {
        let (t, p) = self.columns();
        r2(&t, &p)
    }
}

/// Accumulates loss and predictions batch by batch.
struct OutcomeBuilder<'a> {
    dataset:  &'a SeismicDataset,
    scaler:   Option<&'a Scaler>,
    loss_sum: f64,
    batches:  usize,
    preds:    Vec<Prediction>,
}

impl<'a> OutcomeBuilder<'a> {
    fn new(dataset: &'a SeismicDataset, scaler: Option<&'a Scaler>) -> Self {
        Self { dataset, scaler, loss_sum: 0.0, batches: 0, preds: Vec::new() }
    }

    fn push<B: Backend>(&mut self, loss: f64, output: Tensor<B, 2>, indices: &[usize]) -> Result<()> {
        self.loss_sum += loss;
        self.batches  += 1;

        let raw: Vec<f64> = magnitudes(output)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("cannot read predictions: {e:?}"))?
            .into_iter()
            .map(f64::from)
            .collect();

        // Scalar targets may be scaled; bring predictions back to magnitudes
        let predicted = match self.scaler {
            Some(scaler) => scaler
                .inverse_transform(&[Array1::from(raw)])?
                .remove(0)
                .to_vec(),
            None => raw,
        };

        for (&index, predicted_magnitude) in indices.iter().zip(predicted) {
            let row = prediction_row(self.dataset, index)
                .ok_or_else(|| anyhow!("dataset row {index} has no magnitude column"))?;
            self.preds.push(Prediction {
                index,
                true_magnitude: row.true_magnitude,
                predicted_magnitude,
            });
        }
        Ok(())
    }

    fn finish(self) -> SplitOutcome {
        let loss = if self.batches > 0 {
            self.loss_sum / self.batches as f64
        } else { f64::NAN };
        SplitOutcome { loss, predictions: self.preds }
    }
}

pub fn model_config(cfg: &TrainConfig, output_len: usize) -> MagnitudeNetConfig {
    MagnitudeNetConfig::new(output_len, cfg.model.uses_graph())
        .with_hidden(cfg.hidden)
        .with_num_nodes(cfg.num_nodes)
}

/// Run the full training loop and write metrics, checkpoints and predictions.
pub fn run_training(
    cfg:          &TrainConfig,
    splits:       PreparedSplits,
    edges:        Option<EdgeList>,
    ckpt_manager: CheckpointManager,
) -> Result<()> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);

    let mut model: MagnitudeNet<MyBackend> = model_config(cfg, splits.output_len).init(&device);
    tracing::info!(
        "Model ready: {:?}, hidden={}, nodes={}, output_len={}",
        cfg.model, cfg.hidden, cfg.num_nodes, splits.output_len
    );

    let propagation = edges
        .as_ref()
        .map(|e| propagation_tensor::<MyBackend>(e, cfg.num_nodes, &device))
        .transpose()?;

    let optim_cfg = AdamConfig::new()
        .with_weight_decay(Some(WeightDecayConfig::new(cfg.weight_decay)));
    let mut optim = optim_cfg.init();

    let train_loader = DataLoaderBuilder::new(SeismicBatcher::<MyBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(SHUFFLE_SEED)
        .num_workers(1)
        .build(splits.train.clone());

    let test_loader = DataLoaderBuilder::new(SeismicBatcher::<MyInnerBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(splits.test.clone());

    let logger  = MetricsLogger::new(&cfg.run_dir)?;
    let results = ResultsWriter::new(&cfg.run_dir)?;
    let scaler  = splits.label_scaler.as_ref();

    let mut last: Option<(SplitOutcome, SplitOutcome)> = None;

    for epoch in 1..=cfg.epochs {
        // ── Training phase ────────────────────────────────────────────────────
        let mut train_out = OutcomeBuilder::new(&splits.train, scaler);

        for batch in train_loader.iter() {
            let SeismicBatch { data, targets, indices } = batch;
            let (loss, output) = model.forward_loss(data, targets, propagation.as_ref());

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            train_out.push(loss_val, output.detach(), &indices)?;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }
        let train_outcome = train_out.finish();

        // ── Test phase (no autodiff) ──────────────────────────────────────────
        let model_valid = model.valid();
        let propagation_valid = propagation.clone().map(|p| p.inner());
        let test_outcome = evaluate_split(
            &model_valid,
            test_loader.clone(),
            &splits.test,
            propagation_valid.as_ref(),
            scaler,
        )?;

        let m = EpochMetrics::new(
            epoch,
            train_outcome.loss,
            test_outcome.loss,
            train_outcome.rmse(),
            test_outcome.rmse(),
            train_outcome.r2(),
            test_outcome.r2(),
        );
        println!(
            "Epoch {:>4}/{} | loss_train={:.4} | loss_test={:.4} | rmse_train={:.4} | rmse_test={:.4} | r2_train={:.6} | r2_test={:.6}",
            epoch, cfg.epochs, m.train_loss, m.test_loss,
            m.train_rmse, m.test_rmse, m.train_r2, m.test_r2,
        );
        logger.log(&m)?;

        ckpt_manager.save_model(&model, epoch)?;
        last = Some((train_outcome, test_outcome));
    }

    if let Some((train_outcome, test_outcome)) = last {
        results.write_split("train", &splits.train, &train_outcome.predictions)?;
        results.write_split("test", &splits.test, &test_outcome.predictions)?;
    }

    tracing::info!("Training complete!");
    Ok(())
}

/// One pass over a split without gradients.
pub fn evaluate_split<B: Backend>(
    model:       &MagnitudeNet<B>,
    loader:      Arc<dyn DataLoader<SeismicBatch<B>>>,
    dataset:     &SeismicDataset,
    propagation: Option<&Tensor<B, 2>>,
    scaler:      Option<&Scaler>,
) -> Result<SplitOutcome> {
    let mut out = OutcomeBuilder::new(dataset, scaler);
    for batch in loader.iter() {
        let SeismicBatch { data, targets, indices } = batch;
        let (loss, output) = model.forward_loss(data, targets, propagation);
        let loss_val: f64 = loss.into_scalar().elem::<f64>();
        out.push(loss_val, output, &indices)?;
    }
    Ok(out.finish())
}
