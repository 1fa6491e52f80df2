// ============================================================
// Layer 6 - Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Metrics recorded per epoch:
//   - epoch:       the epoch number (1, 2, 3, ...)
//   - train_loss:  mean MSE over training batches (target space)
//   - test_loss:   mean MSE over test batches
//   - train_rmse / test_rmse: RMSE of predicted magnitudes
//   - train_r2   / test_r2:   coefficient of determination
//
// Output file: <run_dir>/metrics.csv
//
// Example CSV output:
//   epoch,train_loss,test_loss,train_rmse,test_rmse,train_r2,test_r2
//   1,1.204100,1.187300,0.612000,0.598000,0.412000,0.398000
//
// Empty splits produce NaN, never a panic.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

/// Root-mean-square error. NaN for empty or unequal inputs.
pub fn rmse(truth: &[f64], pred: &[f64]) -> f64 {
    if truth.is_empty() || truth.len() != pred.len() {
        return f64::NAN;
    }
    let sse: f64 = truth.iter().zip(pred).map(|(t, p)| (t - p).powi(2)).sum();
    (sse / truth.len() as f64).sqrt()
}

/// Coefficient of determination, 1 - SS_res / SS_tot.
///
/// Constant targets give 1.0 for a perfect fit and 0.0 otherwise.
/// NaN for empty or unequal inputs.
pub fn r2(truth: &[f64], pred: &[f64]) -> f64 {
    if truth.is_empty() || truth.len() != pred.len() {
        return f64::NAN;
    }
    let mean = truth.iter().sum::<f64>() / truth.len() as f64;
    let ss_res: f64 = truth.iter().zip(pred).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = truth.iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:      usize,
    pub train_loss: f64,
    pub test_loss:  f64,
    pub train_rmse: f64,
    pub test_rmse:  f64,
    pub train_r2:   f64,
    pub test_r2:    f64,
}

impl EpochMetrics {
    pub fn new(
        epoch:      usize,
        train_loss: f64,
        test_loss:  f64,
        train_rmse: f64,
        test_rmse:  f64,
        train_r2:   f64,
        test_r2:    f64,
    ) -> Self {
        Self { epoch, train_loss, test_loss, train_rmse, test_rmse, train_r2, test_r2 }
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger.
    /// The header is written only when the file doesn't exist yet,
    /// so repeated runs append to the same log.
    pub fn new(dir: impl Into<String>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut writer = csv::Writer::from_path(&csv_path)?;
            writer.write_record([
                "epoch", "train_loss", "test_loss",
                "train_rmse", "test_rmse", "train_r2", "test_r2",
            ])?;
            writer.flush()?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let file = fs::OpenOptions::new().append(true).open(&self.csv_path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        writer.write_record([
            m.epoch.to_string(),
            format!("{:.6}", m.train_loss),
            format!("{:.6}", m.test_loss),
            format!("{:.6}", m.train_rmse),
            format!("{:.6}", m.test_rmse),
            format!("{:.6}", m.train_r2),
            format!("{:.6}", m.test_r2),
        ])?;
        writer.flush()?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, test_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.test_loss,
        );
        Ok(())
    }

    #[cfg(test)]
    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
