// ============================================================
// Layer 4 - Seismic Batcher
// ============================================================
// Implements Burn's Batcher trait to stack SeismicItems into
// tensors for one forward pass.
//
//   Input:  Vec of N items, data rows [C, ...], label rows [...]
//   Output: data    [N, C, L]   (trailing data axes flattened into L)
//           targets [N, T]      (label row flattened, T = 1 for scalars)
//           indices             (dataset positions, to look up aux rows)
//
// All rows of one dataset share a shape, so flattening is a
// straight copy in row-major order.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::dataset::SeismicItem;

#[derive(Debug, Clone)]
pub struct SeismicBatch<B: Backend> {
    /// [batch, channels, samples]
    pub data:    Tensor<B, 3>,
    /// [batch, label_len]
    pub targets: Tensor<B, 2>,
    /// Dataset position of every row
    pub indices: Vec<usize>,
}

#[derive(Clone, Debug)]
pub struct SeismicBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SeismicBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<SeismicItem, SeismicBatch<B>> for SeismicBatcher<B> {
    fn batch(&self, items: Vec<SeismicItem>) -> SeismicBatch<B> {
        let batch_size = items.len();

        let (channels, samples) = items
            .first()
            .map(|it| {
                let channels = it.data.shape().first().copied().unwrap_or(1);
                (channels, it.data.len() / channels.max(1))
            })
            .unwrap_or((0, 0));
        let label_len = items.first().map(|it| it.label.len()).unwrap_or(0);

        let data_flat: Vec<f32> = items
            .iter()
            .flat_map(|it| it.data.iter().copied())
            .collect();
        let target_flat: Vec<f32> = items
            .iter()
            .flat_map(|it| it.label.iter().copied())
            .collect();
        let indices = items.iter().map(|it| it.index).collect();

        let data = Tensor::<B, 3>::from_data(
            TensorData::new(data_flat, [batch_size, channels, samples]),
            &self.device,
        );
        let targets = Tensor::<B, 2>::from_data(
            TensorData::new(target_flat, [batch_size, label_len]),
            &self.device,
        );

        SeismicBatch { data, targets, indices }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::{AuxColumn, SeismicDataset};
    use burn::backend::NdArray;
    use burn::data::dataset::Dataset;
    use ndarray::{Array1, Array2, Array3, Array4};

    type TestBackend = NdArray;

    #[test]
    fn test_scalar_labels_become_single_column() {
        let data  = Array3::from_shape_fn((3, 3, 8), |(i, c, t)| (i * 100 + c * 10 + t) as f32);
        let label = Array1::from(vec![1.0f32, 2.0, 3.0]);
        let names = AuxColumn::Text(vec!["x".into(), "y".into(), "z".into()]);
        let ds = SeismicDataset::new(data.into_dyn(), label.into_dyn(), vec![names]).unwrap();

        let batcher = SeismicBatcher::<TestBackend>::new(Default::default());
        let batch = batcher.batch(vec![ds.get(2).unwrap(), ds.get(0).unwrap()]);

        assert_eq!(batch.data.dims(), [2, 3, 8]);
        assert_eq!(batch.targets.dims(), [2, 1]);
        assert_eq!(batch.indices, vec![2, 0]);

        let values = batch.data.into_data().to_vec::<f32>().unwrap();
        assert_eq!(values[0], 200.0);
        assert_eq!(values[3 * 8], 0.0);

        let targets = batch.targets.into_data().to_vec::<f32>().unwrap();
        assert_eq!(targets, vec![3.0, 1.0]);
    }

    #[test]
    fn test_curve_labels_and_4d_data_flatten() {
        let data  = Array4::<f32>::ones((2, 3, 2, 5));
        let label = Array2::<f32>::from_elem((2, 10), -4.0);
        let ds = SeismicDataset::new(data.into_dyn(), label.into_dyn(), vec![]).unwrap();

        let batcher = SeismicBatcher::<TestBackend>::new(Default::default());
        let batch = batcher.batch(vec![ds.get(0).unwrap(), ds.get(1).unwrap()]);

        assert_eq!(batch.data.dims(), [2, 3, 10]);
        assert_eq!(batch.targets.dims(), [2, 10]);
    }
}
