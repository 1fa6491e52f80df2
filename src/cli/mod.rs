// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All work is delegated to Layer 2 (application).
//
//   1. `sample`   - build or verify the per-count sample cache
//   2. `train`    - assemble datasets and train a model
//   3. `evaluate` - re-score the latest checkpoint of a run
//   4. `graph`    - inspect the circulant graph
//
// Reference: Rust Book §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use std::collections::BTreeMap;

use crate::application::train_use_case::TrainConfig;
use commands::{Commands, EvaluateArgs, GraphArgs, SampleArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "seismag",
    version = "0.1.0",
    about = "Prepare seismic waveform datasets and train magnitude estimators."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case; the CLI only routes and prints.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Sample(args)   => run_sample(args),
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
            Commands::Graph(args)    => run_graph(args),
        }
    }
}

fn run_sample(args: SampleArgs) -> Result<()> {
    use crate::application::pipeline::load_sampled;

    let cfg: TrainConfig = args.data.into();
    let run = load_sampled(&cfg)?;
    let records = run.sampled.records(&run.archive)?;

    let mut scales: BTreeMap<String, usize> = BTreeMap::new();
    for r in &records {
        *scales.entry(r.source_magnitude_type.clone()).or_default() += 1;
    }

    println!("Sampled {} traces, waveforms {:?}", run.sampled.len(), run.sampled.waveforms.dim());
    println!("Partition: {} train / {} test", run.partition.train.len(), run.partition.test.len());
    for (scale, count) in scales {
        println!("  {scale:<6} {count}");
    }
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Training a {} model on archive '{}/{}'", args.model, args.data.root, args.data.name);
    let run_dir = args.run_dir.clone();

    TrainUseCase::new(args.into()).execute()?;

    println!("Training complete. Run saved to '{run_dir}'.");
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let s = EvaluateUseCase::new(args.run_dir).execute()?;
    println!(
        "Epoch {} | {} test traces | loss={:.4} | rmse={:.4} | r2={:.6}",
        s.epoch, s.samples, s.loss, s.rmse, s.r2
    );
    Ok(())
}

fn run_graph(args: GraphArgs) -> Result<()> {
    use crate::graph::{adjacency_to_edges, circulant_adjacency};

    let adm   = circulant_adjacency(args.nodes, args.radius)?;
    let edges = adjacency_to_edges(&adm);
    let degrees = edges.out_degrees(args.nodes)?;

    let min = degrees.iter().min().copied().unwrap_or(0);
    let max = degrees.iter().max().copied().unwrap_or(0);
    println!(
        "Circulant graph: {} nodes, radius {} | {} directed edges | degree {}..={}",
        args.nodes, args.radius, edges.len(), min, max
    );
    Ok(())
}
