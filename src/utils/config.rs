//! Application configuration constants.
//! Defaults and limits in one place.

use std::sync::OnceLock;
use std::time::Duration;

// ---- Package names (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    config_filename: String,
    worker_thread_prefix: String,
    producer_thread_name: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                config_filename: format!(".{pkg}.toml"),
                worker_thread_prefix: format!("{pkg}-worker"),
                producer_thread_name: format!("{pkg}-producer"),
            }
        })
    }

    /// File the binary looks for in the current directory (e.g. `.datagen.toml`).
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    pub fn worker_thread_name(&self, worker_id: usize) -> String {
        format!("{}-{}", self.worker_thread_prefix, worker_id)
    }

    pub fn producer_thread_name(&self) -> &str {
        &self.producer_thread_name
    }
}

// ---- Worker threads ----

/// Worker count limits.
/// Use [`WorkerLimits::current()`] to fill `all_threads` from rayon; the rest are const.
#[derive(Clone, Copy, Debug)]
pub struct WorkerLimits {
    /// Available threads (from rayon); set by [`WorkerLimits::current()`].
    pub all_threads: usize,
    /// Never default to fewer workers than this.
    pub floor: usize,
    /// Never default to more workers than this.
    pub max: usize,
}

impl Default for WorkerLimits {
    fn default() -> Self {
        Self {
            all_threads: 0, // use current() to set from rayon
            floor: Self::FLOOR_WORKERS,
            max: Self::MAX_DEFAULT_WORKERS,
        }
    }
}

impl WorkerLimits {
    pub const FLOOR_WORKERS: usize = 1;
    pub const MAX_DEFAULT_WORKERS: usize = 32;

    /// Build limits with `all_threads` set from `rayon::current_num_threads()`.
    pub fn current() -> Self {
        Self {
            all_threads: rayon::current_num_threads(),
            ..Self::default()
        }
    }

    /// Worker count used when the caller does not set `n_process`.
    pub fn default_workers(&self) -> usize {
        self.all_threads.clamp(self.floor, self.max)
    }
}

// ---- Pipeline defaults ----

/// Defaults for [`PipelineConfig`](crate::PipelineConfig).
pub struct PipelineDefaults;

impl PipelineDefaults {
    /// Output channel capacity.
    pub const QSIZE: usize = 1024;
    /// Worker wait on an empty input before forwarding `Timeout`.
    pub const WORKER_TIMEOUT: Duration = Duration::from_secs(60);
    /// Result iterator wait on an empty output before ending the sequence.
    pub const CONSUMER_TIMEOUT: Duration = Duration::from_secs(60);
    /// Worker poll slice. Not an error timeout, just how often the end flag is re-checked.
    pub const POLL_INTERVAL: Duration = Duration::from_millis(100);
    /// Bounded join per thread on stop.
    pub const GRACE_PERIOD: Duration = Duration::from_millis(500);
}

// ---- Demo binary ----

/// Defaults for the `datagen` demo binary.
pub struct DemoDefaults;

impl DemoDefaults {
    /// Items in the demo source (`0..COUNT`).
    pub const COUNT: usize = 10;
    /// Worker count used by the reference run.
    pub const WORKERS: usize = 3;
    /// Results between progress refreshes.
    pub const PROGRESS_BATCH: usize = 100;
}
