// ============================================================
// Layer 4 - Magnitude-Scale Filter
// ============================================================
// Keeps only the rows measured on one magnitude scale ("ml",
// "md", ...). Relative order is preserved. No matching rows is
// NOT an error: the result has zero rows but the same rank, and
// callers decide what an empty split means for them.

use ndarray::{Array1, Array3, ArrayView1, ArrayView3, Axis};

use crate::domain::record::{MagnitudeScale, TraceRecord};
use crate::error::{PipelineError, PipelineResult};

/// Rows of one split that match a magnitude scale.
#[derive(Debug, Clone)]
pub struct ScaleSelection {
    /// [rows, channels, samples]
    pub data:    Array3<f32>,
    pub labels:  Array1<f32>,
    pub records: Vec<TraceRecord>,
}

impl ScaleSelection {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Positions of the records measured on `scale`, ascending.
pub fn matching_rows(records: &[TraceRecord], scale: &MagnitudeScale) -> Vec<usize> {
    records
        .iter()
        .enumerate()
        .filter(|(_, r)| scale.matches(r))
        .map(|(i, _)| i)
        .collect()
}

/// Keep the data, label and metadata rows whose scale equals `scale`.
pub fn filter_by_scale(
    data:    ArrayView3<'_, f32>,
    labels:  ArrayView1<'_, f32>,
    records: &[TraceRecord],
    scale:   &MagnitudeScale,
) -> PipelineResult<ScaleSelection> {
    let rows = data.len_of(Axis(0));
    if labels.len() != rows {
        return Err(PipelineError::ShapeMismatch {
            what: "labels".to_string(), expected: rows, actual: labels.len(),
        });
    }
    if records.len() != rows {
        return Err(PipelineError::ShapeMismatch {
            what: "metadata".to_string(), expected: rows, actual: records.len(),
        });
    }

    let keep = matching_rows(records, scale);
    if keep.is_empty() {
        tracing::warn!("No traces on magnitude scale '{}' among {} rows", scale, rows);
    } else {
        tracing::debug!("Scale '{}': kept {} of {} rows", scale, keep.len(), rows);
    }

    Ok(ScaleSelection {
        data:    data.select(Axis(0), &keep),
        labels:  labels.select(Axis(0), &keep),
        records: keep.iter().map(|&i| records[i].clone()).collect(),
    })
}
