//! Datagen CLI: run the reference preprocessing pipeline and print its results.

use anyhow::Result;
use clap::Parser;
use datagen::engine::arg_parser::Cli;
use datagen::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
