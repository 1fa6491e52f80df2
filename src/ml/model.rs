use burn::{
    nn::{
        conv::{Conv1d, Conv1dConfig},
        loss::{MseLoss, Reduction},
        pool::{AdaptiveAvgPool1d, AdaptiveAvgPool1dConfig},
        Linear, LinearConfig, PaddingConfig1d,
    },
    prelude::*,
    tensor::{activation::relu, TensorData},
};

use crate::error::PipelineResult;
use crate::graph::{gcn_normalize, EdgeList};

/// Outputs averaged to turn a predicted curve into one magnitude
const CURVE_TAIL: usize = 10;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct MagnitudeNetConfig {
    /// Values produced per sample: the window length for curve
    /// targets, 1 for a scalar magnitude
    pub output_len: usize,
    /// Enable the graph-convolution stage
    pub graph: bool,
    #[config(default = 3)]
    pub in_channels: usize,
    #[config(default = 16)]
    pub hidden: usize,
    /// Positions after pooling, one graph node each
    #[config(default = 64)]
    pub num_nodes: usize,
}

impl MagnitudeNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> MagnitudeNet<B> {
        let conv1 = Conv1dConfig::new(self.in_channels, self.hidden, 7)
            .with_stride(2)
            .with_padding(PaddingConfig1d::Explicit(3))
            .init(device);
        let conv2 = Conv1dConfig::new(self.hidden, self.hidden, 5)
            .with_stride(2)
            .with_padding(PaddingConfig1d::Explicit(2))
            .init(device);
        let pool = AdaptiveAvgPool1dConfig::new(self.num_nodes).init();
        let graph_conv = self
            .graph
            .then(|| LinearConfig::new(self.hidden, self.hidden).init(device));
        let head = LinearConfig::new(self.hidden * self.num_nodes, self.output_len).init(device);

        MagnitudeNet { conv1, conv2, pool, graph_conv, head }
    }
}

/// Conv encoder → pooled node features → optional GCN → linear head.
#[derive(Module, Debug)]
pub struct MagnitudeNet<B: Backend> {
    pub conv1:      Conv1d<B>,
    pub conv2:      Conv1d<B>,
    pub pool:       AdaptiveAvgPool1d,
    pub graph_conv: Option<Linear<B>>,
    pub head:       Linear<B>,
}

impl<B: Backend> MagnitudeNet<B> {
    /// x: [batch, channels, samples] → [batch, output_len]
    ///
    /// The graph stage runs only when the model has one and a
    /// propagation matrix `[num_nodes, num_nodes]` is supplied.
    pub fn forward(&self, x: Tensor<B, 3>, propagation: Option<&Tensor<B, 2>>) -> Tensor<B, 2> {
        let x = relu(self.conv1.forward(x));
        let x = relu(self.conv2.forward(x));
        let x = self.pool.forward(x); // [batch, hidden, nodes]

        let x = match (&self.graph_conv, propagation) {
            (Some(linear), Some(p)) => {
                let [batch, _, nodes] = x.dims();
                let h = linear.forward(x.swap_dims(1, 2)); // [batch, nodes, hidden]
                let p = p.clone().unsqueeze::<3>().expand([batch, nodes, nodes]);
                relu(p.matmul(h)).swap_dims(1, 2)
            }
            _ => x,
        };

        let [batch, hidden, nodes] = x.dims();
        self.head.forward(x.reshape([batch, hidden * nodes]))
    }

    /// Mean-squared error against `targets` ([batch, output_len]).
    pub fn forward_loss(
        &self,
        x:           Tensor<B, 3>,
        targets:     Tensor<B, 2>,
        propagation: Option<&Tensor<B, 2>>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let output = self.forward(x, propagation);
        let loss = MseLoss::new().forward(output.clone(), targets, Reduction::Mean);
        (loss, output)
    }
}

/// One magnitude per row: the mean of the last few outputs of a curve,
/// or the single output of a scalar head.
pub fn magnitudes<B: Backend>(output: Tensor<B, 2>) -> Tensor<B, 1> {
    let [batch, len] = output.dims();
    let tail = CURVE_TAIL.min(len);
    output
        .slice([0..batch, len - tail..len])
        .mean_dim(1)
        .reshape([batch])
}

/// GCN propagation matrix for the edge list as a tensor.
pub fn propagation_tensor<B: Backend>(
    edges:  &EdgeList,
    nodes:  usize,
    device: &B::Device,
) -> PipelineResult<Tensor<B, 2>> {
    let values: Vec<f32> = gcn_normalize(edges, nodes)?.iter().map(|&v| v as f32).collect();
    Ok(Tensor::from_data(TensorData::new(values, [nodes, nodes]), device))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{adjacency_to_edges, circulant_adjacency};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_curve_model_output_shape() {
        let device = Default::default();
        let model = MagnitudeNetConfig::new(512, false)
            .with_num_nodes(16)
            .init::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 3>::zeros([2, 3, 512], &device);
        assert_eq!(model.forward(x, None).dims(), [2, 512]);
    }

    #[test]
    fn test_graph_model_uses_propagation() {
        let device = Default::default();
        let model = MagnitudeNetConfig::new(1, true)
            .with_num_nodes(8)
            .with_hidden(4)
            .init::<TestBackend>(&device);
        let edges = adjacency_to_edges(&circulant_adjacency(8, 1).unwrap());
        let p = propagation_tensor::<TestBackend>(&edges, 8, &device).unwrap();

        let x = Tensor::<TestBackend, 3>::ones([3, 3, 600], &device);
        let targets = Tensor::<TestBackend, 2>::zeros([3, 1], &device);
        let (loss, output) = model.forward_loss(x, targets, Some(&p));
        assert_eq!(output.dims(), [3, 1]);
        assert_eq!(loss.dims(), [1]);
    }

    #[test]
    fn test_magnitudes_average_curve_tail() {
        let device = Default::default();
        let mut row: Vec<f32> = vec![-4.0; 20];
        row.extend(vec![3.0; 10]);
        let curve = Tensor::<TestBackend, 2>::from_data(TensorData::new(row, [1, 30]), &device);
        let m = magnitudes(curve).into_data().to_vec::<f32>().unwrap();
        assert!((m[0] - 3.0).abs() < 1e-6);

        let scalar = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![1.5f32, 2.5], [2, 1]),
            &device,
        );
        let m = magnitudes(scalar).into_data().to_vec::<f32>().unwrap();
        assert_eq!(m, vec![1.5, 2.5]);
    }
}
