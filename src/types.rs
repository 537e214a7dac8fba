//! Public and internal types for the datagen API and pipeline.

use std::fmt;
use std::time::Duration;

use crate::error::PipelineError;
use crate::utils::config::{PipelineDefaults, WorkerLimits};

/// One slot of a pipeline channel: a payload or a control sentinel.
///
/// Sentinels live in their own variants, so no payload value can be mistaken for one.
pub enum Packet<T> {
    Item(T),
    End,
    Timeout,
}

/// Control meaning of a [`Packet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlSignal {
    /// Ordinary payload.
    None,
    /// Graceful end of stream.
    End,
    /// Nothing arrived within the wait bound (or the channel was closed).
    Timeout,
}

impl<T> Packet<T> {
    pub fn control(&self) -> ControlSignal {
        match self {
            Packet::Item(_) => ControlSignal::None,
            Packet::End => ControlSignal::End,
            Packet::Timeout => ControlSignal::Timeout,
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Packet::End)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Packet::Timeout)
    }

    pub fn into_item(self) -> Option<T> {
        match self {
            Packet::Item(item) => Some(item),
            _ => None,
        }
    }
}

impl<T> fmt::Debug for Packet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Packet::Item(_) => f.write_str("Item(..)"),
            Packet::End => f.write_str("End"),
            Packet::Timeout => f.write_str("Timeout"),
        }
    }
}

/// Lifecycle of one pipeline run: `Idle → Running → Draining → Terminated`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    /// No background threads exist.
    Idle,
    /// Producer and every worker are alive.
    Running,
    /// Stop requested: channels closing, threads being joined.
    Draining,
    /// All threads joined or detached, channels closed.
    Terminated,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineState::Idle => "idle",
            PipelineState::Running => "running",
            PipelineState::Draining => "draining",
            PipelineState::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// The transform returned an error or panicked; the worker stopped.
    Transform,
    /// The data source could not be opened or iterated; the producer stopped.
    Source,
}

/// A failure absorbed by the pipeline. Iteration still ends normally; inspect these with
/// [`Results::failures`](crate::Results::failures) to tell a crash from a clean finish.
#[derive(Clone, Debug)]
pub struct Failure {
    pub kind: FailureKind,
    /// Worker id for transform failures, `None` for the producer.
    pub worker: Option<usize>,
    pub message: String,
}

impl Failure {
    pub fn into_error(self) -> PipelineError {
        match (self.kind, self.worker) {
            (FailureKind::Transform, worker) => PipelineError::TransformFailure {
                worker: worker.unwrap_or_default(),
                message: self.message,
            },
            (FailureKind::Source, _) => PipelineError::SourceIterationFailure(self.message),
        }
    }
}

/// Pipeline options. Build with [`PipelineConfig::builder`] or start from `default()`.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Number of parallel workers (≥ 1).
    pub n_process: usize,
    /// Output channel capacity (≥ 1).
    pub qsize: usize,
    /// Input channel capacity is `qsize * input_scale`. When None, scales by `n_process`.
    pub input_scale: Option<usize>,
    /// Restart the source from the beginning after each pass.
    pub repeat: bool,
    /// Shuffle each pass. Materialized sources only; streams log a warning and ignore it.
    pub shuffle: bool,
    /// Lifecycle events at info level instead of debug.
    pub verbose: bool,
    /// Master seed for worker seeds and shuffling. Random when None.
    pub seed: Option<u64>,
    /// How long a worker waits on an empty input before giving up.
    pub worker_timeout: Duration,
    /// How long the result iterator waits on an empty output before giving up.
    pub consumer_timeout: Duration,
    /// Slice in which workers poll the input (and re-check whether the stream already ended).
    pub poll_interval: Duration,
    /// Bounded join per thread on stop before the thread is detached.
    pub grace_period: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            n_process: WorkerLimits::current().default_workers(),
            qsize: PipelineDefaults::QSIZE,
            input_scale: None,
            repeat: false,
            shuffle: false,
            verbose: false,
            seed: None,
            worker_timeout: PipelineDefaults::WORKER_TIMEOUT,
            consumer_timeout: PipelineDefaults::CONSUMER_TIMEOUT,
            poll_interval: PipelineDefaults::POLL_INTERVAL,
            grace_period: PipelineDefaults::GRACE_PERIOD,
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Capacity of the producer → workers channel.
    pub fn input_capacity(&self) -> usize {
        self.qsize
            .saturating_mul(self.input_scale.unwrap_or(self.n_process))
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.n_process == 0 {
            return Err(PipelineError::InvalidConfig(
                "n_process must be at least 1".to_string(),
            ));
        }
        if self.qsize == 0 {
            return Err(PipelineError::InvalidConfig(
                "qsize must be at least 1 (a zero-capacity channel cannot buffer sentinels)"
                    .to_string(),
            ));
        }
        if self.input_scale == Some(0) {
            return Err(PipelineError::InvalidConfig(
                "input_scale must be at least 1".to_string(),
            ));
        }
        for (name, d) in [
            ("worker_timeout", self.worker_timeout),
            ("consumer_timeout", self.consumer_timeout),
            ("poll_interval", self.poll_interval),
            ("grace_period", self.grace_period),
        ] {
            if d.is_zero() {
                return Err(PipelineError::InvalidConfig(format!(
                    "{name} must be non-zero"
                )));
            }
        }
        Ok(())
    }
}

/// Builder for [`PipelineConfig`] with method chaining.
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn n_process(mut self, n: usize) -> Self {
        self.config.n_process = n;
        self
    }

    pub fn qsize(mut self, qsize: usize) -> Self {
        self.config.qsize = qsize;
        self
    }

    pub fn input_scale(mut self, scale: usize) -> Self {
        self.config.input_scale = Some(scale);
        self
    }

    pub fn repeat(mut self, repeat: bool) -> Self {
        self.config.repeat = repeat;
        self
    }

    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.config.shuffle = shuffle;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    /// Fix the master seed. Same seed → same shuffle order and same per-worker seeds.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// - Too low: workers give up while the producer is still loading a slow source.
    /// - Too high: a stalled source keeps workers parked that long.
    pub fn worker_timeout(mut self, timeout: Duration) -> Self {
        self.config.worker_timeout = timeout;
        self
    }

    pub fn consumer_timeout(mut self, timeout: Duration) -> Self {
        self.config.consumer_timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.config.grace_period = grace;
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.config
    }
}
