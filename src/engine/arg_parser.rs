use clap::Parser;
use std::path::PathBuf;

use crate::utils::config::DemoDefaults;

/// Run the reference preprocessing pipeline: `x + 1` over `0..COUNT` on parallel workers.
#[derive(Clone, Parser)]
#[command(name = "datagen")]
#[command(about = "Run x + 1 over 0..COUNT through the parallel preprocessing pipeline.")]
pub struct Cli {
    /// Number of source items (0..COUNT).
    #[arg(long, short = 'n', default_value_t = DemoDefaults::COUNT)]
    pub count: usize,

    /// Worker threads. Default: from config file, else 3.
    #[arg(long, short = 'w')]
    pub workers: Option<usize>,

    /// Output channel capacity. Input capacity is this times the worker count.
    #[arg(long, short = 'q')]
    pub qsize: Option<usize>,

    /// Loop over the source forever (combine with --limit or stop with Ctrl+C).
    #[arg(long, short = 'r', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub repeat: Option<bool>,

    /// Shuffle each pass.
    #[arg(long, short = 's', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub shuffle: Option<bool>,

    /// Master seed for shuffling and worker seeds.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Stop after this many results.
    #[arg(long, short = 'l')]
    pub limit: Option<usize>,

    /// Skip printing results (useful for throughput runs).
    #[arg(long)]
    pub quiet: bool,

    /// Config file. Default: `.datagen.toml` in the current directory, if present.
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose output: lifecycle logging and a progress counter.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}
