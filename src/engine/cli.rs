//! CLI command handler: build the config, run the reference pipeline, print results.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::engine::arg_parser::Cli;
use crate::engine::progress::{
    ProgressBar, create_counter, create_progress_bar, flush_progress_remainder,
    update_progress_bar,
};
use crate::utils::config::DemoDefaults;
use crate::utils::{apply_file_to_config, load_datagen_toml, load_datagen_toml_from, setup_logging};
use crate::{Pipeline, PipelineConfig, transform};

/// Config precedence: defaults → config file → CLI flags.
pub fn setup_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = PipelineConfig {
        n_process: DemoDefaults::WORKERS,
        ..PipelineConfig::default()
    };
    let file = match &cli.config {
        Some(path) => Some(load_datagen_toml_from(path)?),
        None => load_datagen_toml(Path::new(".")),
    };
    if let Some(file) = &file {
        apply_file_to_config(file, &mut config);
    }
    if let Some(n) = cli.workers {
        config.n_process = n;
    }
    if let Some(q) = cli.qsize {
        config.qsize = q;
    }
    if let Some(r) = cli.repeat {
        config.repeat = r;
    }
    if let Some(s) = cli.shuffle {
        config.shuffle = s;
    }
    if let Some(v) = cli.verbose {
        config.verbose = v;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    config.validate()?;
    Ok(config)
}

fn setup_progress(cli: &Cli, config: &PipelineConfig) -> Option<ProgressBar> {
    config.verbose.then(|| match (cli.limit, config.repeat) {
        (Some(limit), _) => create_progress_bar(limit, "Preprocessing"),
        (None, false) => create_progress_bar(cli.count, "Preprocessing"),
        (None, true) => create_counter("Preprocessing"),
    })
}

/// Run the pipeline until it ends, `--limit` is reached, or Ctrl+C.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let config = setup_config(cli)?;
    setup_logging(config.verbose);
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        config
    );
    if config.repeat && cli.limit.is_none() {
        warn!("--repeat without --limit runs until Ctrl+C");
    }

    let cancel_requested = Arc::new(AtomicBool::new(false));
    let cancel_requested_handler = Arc::clone(&cancel_requested);
    ctrlc::set_handler(move || {
        cancel_requested_handler.store(true, Ordering::Relaxed);
    })
    .context("set Ctrl+C handler")?;

    let data: Vec<u64> = (0..cli.count as u64).collect();
    let pipeline = Pipeline::new(data, transform::map(|x: u64| x + 1), config.clone())?;
    let bar = setup_progress(cli, &config);

    let mut results = pipeline.iter();
    let mut received = 0_usize;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for item in results.by_ref() {
        if !cli.quiet {
            writeln!(out, "{}", item).context("write result")?;
        }
        received += 1;
        if let Some(bar) = &bar
            && received.is_multiple_of(DemoDefaults::PROGRESS_BATCH)
        {
            update_progress_bar(bar, DemoDefaults::PROGRESS_BATCH);
        }
        if cli.limit.is_some_and(|limit| received >= limit)
            || cancel_requested.load(Ordering::Relaxed)
        {
            break;
        }
    }
    results.stop();
    flush_progress_remainder(bar.as_ref(), received, DemoDefaults::PROGRESS_BATCH);
    info!("Received {} items ({})", received, results.state());

    if cancel_requested.load(Ordering::Relaxed) {
        warn!("Cancelled by user after {} items", received);
    }
    if let Some(failure) = results.failures().into_iter().next() {
        return Err(failure.into_error()).context("pipeline run reported failures");
    }
    Ok(())
}
