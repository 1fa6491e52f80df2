// ============================================================
// Layer 6 - Prediction Results Writer
// ============================================================
// Writes the final predictions of each split to CSV so they can
// be plotted or compared outside this program:
//
//   <run_dir>/train_predictions.csv
//   <run_dir>/test_predictions.csv
//
// One row per trace: name, epicentre, true and predicted magnitude.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::application::pipeline::prediction_row;
use crate::data::dataset::SeismicDataset;
use crate::ml::trainer::Prediction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    pub trace_name:          String,
    pub longitude:           f64,
    pub latitude:            f64,
    pub true_magnitude:      f64,
    pub predicted_magnitude: f64,
}

pub struct ResultsWriter {
    dir: PathBuf,
}

impl ResultsWriter {
    pub fn new(dir: impl Into<String>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create results directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, split: &str) -> PathBuf {
        self.dir.join(format!("{split}_predictions.csv"))
    }

    /// Write one split's predictions, looking up trace metadata in `dataset`.
    pub fn write_split(
        &self,
        split:       &str,
        dataset:     &SeismicDataset,
        predictions: &[Prediction],
    ) -> Result<PathBuf> {
        let path = self.path_for(split);
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Cannot create '{}'", path.display()))?;

        for p in predictions {
            let mut row = prediction_row(dataset, p.index)
                .with_context(|| format!("No metadata for {split} row {}", p.index))?;
            row.predicted_magnitude = p.predicted_magnitude;
            writer.serialize(&row)?;
        }
        writer.flush()?;

        tracing::info!("Wrote {} {} predictions to '{}'", predictions.len(), split, path.display());
        Ok(path)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::pipeline::magnitude_aux;
    use ndarray::{Array1, Array3};

    #[test]
    fn test_rows_carry_trace_metadata() {
        let ds = SeismicDataset::new(
            Array3::<f32>::zeros((2, 3, 8)).into_dyn(),
            Array1::<f32>::zeros(2).into_dyn(),
            magnitude_aux(
                &[2.1, 3.4],
                &[[-117.0, 35.5], [-121.25, 37.0]],
                &["CI.A".to_string(), "NC.B".to_string()],
            ),
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let writer = ResultsWriter::new(dir.path().to_string_lossy().to_string()).unwrap();
        let preds = [Prediction { index: 1, true_magnitude: 3.4, predicted_magnitude: 3.0 }];
        let path = writer.write_split("test", &ds, &preds).unwrap();

        let mut reader = csv::Reader::from_path(path).unwrap();
        let rows: Vec<PredictionRow> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(
            rows,
            vec![PredictionRow {
                trace_name:          "NC.B".to_string(),
                longitude:           -121.25,
                latitude:            37.0,
                true_magnitude:      3.4,
                predicted_magnitude: 3.0,
            }]
        );
    }
}
