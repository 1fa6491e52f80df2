use burn::data::dataset::Dataset;
use ndarray::{ArrayD, Axis};

use crate::error::{PipelineError, PipelineResult};

/// Extra per-sample column carried next to data and label
/// (true magnitude, position, trace name, ...).
#[derive(Debug, Clone)]
pub enum AuxColumn {
    /// Rank 1 or 2, leading axis = sample
    Numeric(ArrayD<f64>),
    Text(Vec<String>),
}

impl AuxColumn {
    fn rows(&self) -> usize {
        match self {
            AuxColumn::Numeric(a) => a.len_of(Axis(0)),
            AuxColumn::Text(v)    => v.len(),
        }
    }

    fn row(&self, index: usize) -> AuxValue {
        match self {
            AuxColumn::Numeric(a) => AuxValue::Numeric(a.index_axis(Axis(0), index).to_owned()),
            AuxColumn::Text(v)    => AuxValue::Text(v[index].clone()),
        }
    }
}

/// One row of an [`AuxColumn`].
#[derive(Debug, Clone, PartialEq)]
pub enum AuxValue {
    Numeric(ArrayD<f64>),
    Text(String),
}

impl AuxValue {
    /// First element of a numeric row (the row itself for rank-1 columns)
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            AuxValue::Numeric(a) => a.iter().next().copied(),
            AuxValue::Text(_)    => None,
        }
    }

    pub fn as_values(&self) -> Option<Vec<f64>> {
        match self {
            AuxValue::Numeric(a) => Some(a.iter().copied().collect()),
            AuxValue::Text(_)    => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AuxValue::Text(s)    => Some(s),
            AuxValue::Numeric(_) => None,
        }
    }
}

/// One sample: data row, label row, aux rows in column order, and its position.
#[derive(Debug, Clone)]
pub struct SeismicItem {
    pub data:  ArrayD<f32>,
    pub label: ArrayD<f32>,
    pub aux:   Vec<AuxValue>,
    pub index: usize,
}

/// Indexed container over data, label and aux columns of equal length.
///
/// Data must be rank 3 or 4 and labels rank 1 or 2: the batcher relies
/// on the channel axis sitting right after the sample axis.
#[derive(Debug, Clone)]
pub struct SeismicDataset {
    data:  ArrayD<f32>,
    label: ArrayD<f32>,
    aux:   Vec<AuxColumn>,
}

impl SeismicDataset {
    pub fn new(data: ArrayD<f32>, label: ArrayD<f32>, aux: Vec<AuxColumn>) -> PipelineResult<Self> {
        if !(3..=4).contains(&data.ndim()) {
            return Err(PipelineError::UnsupportedRank {
                what: "dataset data", expected: "3 or 4", actual: data.ndim(),
            });
        }
        if !(1..=2).contains(&label.ndim()) {
            return Err(PipelineError::UnsupportedRank {
                what: "dataset label", expected: "1 or 2", actual: label.ndim(),
            });
        }

        let rows = data.len_of(Axis(0));
        if label.len_of(Axis(0)) != rows {
            return Err(PipelineError::ShapeMismatch {
                what: "label".to_string(), expected: rows, actual: label.len_of(Axis(0)),
            });
        }
        for (i, col) in aux.iter().enumerate() {
            if let AuxColumn::Numeric(a) = col {
                if !(1..=2).contains(&a.ndim()) {
                    return Err(PipelineError::UnsupportedRank {
                        what: "aux column", expected: "1 or 2", actual: a.ndim(),
                    });
                }
            }
            if col.rows() != rows {
                return Err(PipelineError::ShapeMismatch {
                    what: format!("aux column {i}"), expected: rows, actual: col.rows(),
                });
            }
        }

        Ok(Self { data, label, aux })
    }

    pub fn sample_count(&self) -> usize {
        self.data.len_of(Axis(0))
    }
}

impl Dataset<SeismicItem> for SeismicDataset {
    fn get(&self, index: usize) -> Option<SeismicItem> {
        if index >= self.sample_count() {
            return None;
        }
        Some(SeismicItem {
            data:  self.data.index_axis(Axis(0), index).to_owned(),
            label: self.label.index_axis(Axis(0), index).to_owned(),
            aux:   self.aux.iter().map(|c| c.row(index)).collect(),
            index,
        })
    }

    fn len(&self) -> usize {
        self.sample_count()
    }
}
