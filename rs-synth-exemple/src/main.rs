use std::fs;
use std::path::PathBuf;

use clap::Parser;

use rs_synth_core::io::save_samples;
use rs_synth_core::{GenerationInput, Synthesizer};

/// Learn a corpus of sample files and write synthetic look-alikes.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Directory holding the training samples (searched recursively)
    #[arg(short, long, default_value = "./train")]
    input: PathBuf,

    /// Directory receiving the generated `test_<n>.dat` files
    #[arg(short, long, default_value = "./test")]
    output: PathBuf,

    /// Quantization grid step applied to raw samples
    #[arg(long, default_value_t = 0.001)]
    step: f64,

    /// Bucket width used by the probability tree
    #[arg(long, default_value_t = 0.1)]
    train_step: f64,

    /// Length of every generated sequence
    #[arg(long, default_value_t = 30)]
    max_length: usize,

    /// Number of sequences to generate
    #[arg(short, long, default_value_t = 1000)]
    count: usize,

    /// Keep identical input sequences as separate training patterns
    #[arg(long)]
    allow_repeats: bool,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Restarts allowed per sequence before giving up
    #[arg(long, default_value_t = rs_synth_core::model::generation_input::DEFAULT_MAX_RESTARTS)]
    max_restarts: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    // Quantize, extract patterns and train the tree in one go
    let synth = Synthesizer::from_directory(&args.input, args.step, args.train_step, args.allow_repeats)?;
    let stats = synth.stats();
    println!("data size: {}", synth.sequences());
    println!("patterns size: {}", stats.patterns);
    println!("nodes: {} (depth {})", stats.populated_nodes, stats.max_depth);

    // Generation parameters
    let mut input = GenerationInput::new(args.max_length)?;
    input.max_restarts = args.max_restarts;

    let batch = synth.generate_batch(&input, args.count, args.seed)?;

    fs::create_dir_all(&args.output)?;
    let mut written = 0;
    for (n, sequence) in batch.iter().enumerate() {
        let path = args.output.join(format!("test_{n}.dat"));
        match save_samples(&path, sequence) {
            Ok(()) => written += 1,
            Err(e) => log::error!("can not write {}: {}", path.display(), e),
        }
    }
    println!("written {written}/{} sequences to {}", batch.len(), args.output.display());

    Ok(())
}
