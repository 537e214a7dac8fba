//! Load `.datagen.toml` (binary only). The library never reads files; embedding programs
//! build a [`PipelineConfig`](crate::PipelineConfig) themselves.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::PipelineConfig;
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub struct DatagenToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    n_process: Option<usize>,
    qsize: Option<usize>,
    input_scale: Option<usize>,
    repeat: Option<bool>,
    shuffle: Option<bool>,
    verbose: Option<bool>,
    seed: Option<u64>,
    worker_timeout_secs: Option<u64>,
    consumer_timeout_secs: Option<u64>,
    poll_interval_ms: Option<u64>,
    grace_period_ms: Option<u64>,
}

/// Parse a config document.
pub fn parse_datagen_toml(s: &str) -> Result<DatagenToml> {
    toml::from_str(s).context("parse datagen config")
}

/// Load `.datagen.toml` from `dir` if present. Returns None if the file is missing or invalid.
pub fn load_datagen_toml(dir: &Path) -> Option<DatagenToml> {
    let path = dir.join(PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    parse_datagen_toml(&s)
        .map_err(|e| log::warn!("{}: {:#}", path.display(), e))
        .ok()
}

/// Load an explicit config path. Unlike [`load_datagen_toml`], a missing file is an error.
pub fn load_datagen_toml_from(path: &Path) -> Result<DatagenToml> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    parse_datagen_toml(&s).with_context(|| format!("in {}", path.display()))
}

/// Overwrite config field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $cfg:expr, $field:ident) => {
        if let Some(v) = $sec.$field {
            $cfg.$field = v;
        }
    };
    ($sec:expr, $cfg:expr, $sec_field:ident => $cfg_field:ident, $conv:expr) => {
        if let Some(v) = $sec.$sec_field {
            $cfg.$cfg_field = $conv(v);
        }
    };
}

/// Apply file settings to `config` (only fields present in the file). Call before applying CLI flags.
pub fn apply_file_to_config(file: &DatagenToml, config: &mut PipelineConfig) {
    let s = &file.settings;
    apply_file_opt!(s, config, n_process);
    apply_file_opt!(s, config, qsize);
    apply_file_opt!(s, config, repeat);
    apply_file_opt!(s, config, shuffle);
    apply_file_opt!(s, config, verbose);
    if s.input_scale.is_some() {
        config.input_scale = s.input_scale;
    }
    if s.seed.is_some() {
        config.seed = s.seed;
    }
    apply_file_opt!(s, config, worker_timeout_secs => worker_timeout, Duration::from_secs);
    apply_file_opt!(s, config, consumer_timeout_secs => consumer_timeout, Duration::from_secs);
    apply_file_opt!(s, config, poll_interval_ms => poll_interval, Duration::from_millis);
    apply_file_opt!(s, config, grace_period_ms => grace_period, Duration::from_millis);
}
