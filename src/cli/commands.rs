// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Defines the subcommands `sample`, `train`, `evaluate` and
// `graph` and all their configurable flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::train_use_case::{ModelKind, TrainConfig};
use crate::data::scaler::ScaleMode;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Draw (or verify) the cached random sample of an archive
    Sample(SampleArgs),

    /// Build the datasets and train a magnitude model
    Train(TrainArgs),

    /// Re-score the latest checkpoint of a seeded run
    Evaluate(EvaluateArgs),

    /// Print the circulant graph used by the graph model
    Graph(GraphArgs),
}

/// Which archive, how many traces, and how they are split.
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// Directory holding <name>.csv, the <name>/ waveform store and sample caches
    #[arg(long, default_value = "data")]
    pub root: String,

    /// Archive name
    #[arg(long, default_value = "chunk2")]
    pub name: String,

    /// Number of traces to sample
    #[arg(long, default_value_t = 100)]
    pub samples: usize,

    /// Fraction of the sample used for training
    #[arg(long, default_value_t = 0.75)]
    pub train_ratio: f64,

    /// RNG seed; omit for a non-reproducible run
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug)]
pub struct SampleArgs {
    #[command(flatten)]
    pub data: DataArgs,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Directory for checkpoints, metrics and predictions
    #[arg(long, default_value = "runs/curve")]
    pub run_dir: String,

    /// Magnitude scale to keep, e.g. "ml" or "md"
    #[arg(long, default_value = "ml")]
    pub scale: String,

    /// `curve` (arrival windows) or `graph` (whole trace + GCN)
    #[arg(long, default_value = "curve")]
    pub model: ModelKind,

    /// Window length in samples (curve model)
    #[arg(long, default_value_t = 512)]
    pub window_len: usize,

    /// Samples kept after the arrival (curve model)
    #[arg(long, default_value_t = 125)]
    pub p_len: usize,

    /// Target value before the arrival (curve model)
    #[arg(long, default_value_t = -4.0, allow_hyphen_values = true)]
    pub sentinel: f32,

    /// Label scaling for the graph model: `sta` or `min`
    #[arg(long)]
    pub label_scaling: Option<ScaleMode>,

    /// Convolution channels
    #[arg(long, default_value_t = 16)]
    pub hidden: usize,

    /// Pooled positions, one graph node each
    #[arg(long, default_value_t = 64)]
    pub num_nodes: usize,

    /// Neighbours on each side in the circulant graph
    #[arg(long, default_value_t = 2)]
    pub graph_radius: usize,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 70)]
    pub epochs: usize,

    #[arg(long, default_value_t = 5e-4)]
    pub lr: f64,

    /// Adam L2 penalty
    #[arg(long, default_value_t = 5e-4)]
    pub weight_decay: f32,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            archive_root:    a.data.root,
            archive_name:    a.data.name,
            run_dir:         a.run_dir,
            num_samples:     a.data.samples,
            train_ratio:     a.data.train_ratio,
            magnitude_scale: a.scale,
            seed:            a.data.seed,
            model:           a.model,
            window_len:      a.window_len,
            p_len:           a.p_len,
            sentinel:        a.sentinel,
            label_scaling:   a.label_scaling,
            hidden:          a.hidden,
            num_nodes:       a.num_nodes,
            graph_radius:    a.graph_radius,
            batch_size:      a.batch_size,
            epochs:          a.epochs,
            lr:              a.lr,
            weight_decay:    a.weight_decay,
        }
    }
}

impl From<DataArgs> for TrainConfig {
    fn from(a: DataArgs) -> Self {
        TrainConfig {
            archive_root: a.root,
            archive_name: a.name,
            num_samples:  a.samples,
            train_ratio:  a.train_ratio,
            seed:         a.seed,
            ..TrainConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Run directory written by `train`
    #[arg(long, default_value = "runs/curve")]
    pub run_dir: String,
}

#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Number of nodes
    #[arg(long, default_value_t = 64)]
    pub nodes: usize,

    /// Neighbours on each side
    #[arg(long, default_value_t = 2)]
    pub radius: usize,
}
