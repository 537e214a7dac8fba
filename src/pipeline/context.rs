//! Pipeline context: the immutable definition shared by every run, the per-thread contexts
//! handed to the producer and workers, and the handles of a running pipeline.

use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::error::PipelineError;
use crate::filter::SkipFilter;
use crate::observer::{LifecycleEvent, SharedObserver};
use crate::source::Source;
use crate::transform::Preprocess;
use crate::{Failure, FailureKind, PipelineConfig};

use super::channel::BoundedChannel;
use super::completion::Completion;

pub type SharedTransform<I, O> = Arc<dyn Preprocess<I, Out = O>>;

/// Everything a pipeline needs to start a run. Built once by
/// [`PipelineBuilder`](crate::PipelineBuilder), shared by all runs.
pub(crate) struct PipelineParts<I, O> {
    pub source: Source<I>,
    pub transform: SharedTransform<I, O>,
    pub config: PipelineConfig,
    pub skip_input: Option<SkipFilter<I>>,
    pub skip_output: Option<SkipFilter<O>>,
    pub observer: SharedObserver,
    /// Runs started so far; mixed into the master seed so restarts are not replays.
    pub epoch: AtomicU64,
}

impl<I, O> PipelineParts<I, O> {
    pub fn emit(&self, event: LifecycleEvent) {
        self.observer.on_event(&event);
    }
}

/// Failures absorbed during a run, in the order they happened.
#[derive(Clone, Default)]
pub struct FailureLog(Arc<Mutex<Vec<Failure>>>);

impl FailureLog {
    pub fn record(&self, kind: FailureKind, worker: Option<usize>, message: String) {
        let mut failures = self.0.lock().unwrap_or_else(|e| e.into_inner());
        failures.push(Failure {
            kind,
            worker,
            message,
        });
    }

    pub fn snapshot(&self) -> Vec<Failure> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Input and output channels for one run.
pub struct PipelineChannels<I, O> {
    pub input: BoundedChannel<I>,
    pub output: BoundedChannel<O>,
}

pub fn create_pipeline_channels<I, O>(
    config: &PipelineConfig,
) -> Result<PipelineChannels<I, O>, PipelineError> {
    Ok(PipelineChannels {
        input: BoundedChannel::new(config.input_capacity())?,
        output: BoundedChannel::new(config.qsize)?,
    })
}

/// Shared context for the producer thread.
pub struct ProducerContext<I> {
    pub source: Source<I>,
    pub repeat: bool,
    pub shuffle: bool,
    pub shuffle_seed: u64,
    pub skip_input: Option<SkipFilter<I>>,
    pub failures: FailureLog,
    pub observer: SharedObserver,
}

/// Shared context for the worker threads.
pub struct WorkerContext<I, O> {
    pub transform: SharedTransform<I, O>,
    pub completion: Arc<Completion>,
    pub failures: FailureLog,
    pub observer: SharedObserver,
    pub worker_timeout: Duration,
    pub poll_interval: Duration,
}

impl<I, O> Clone for WorkerContext<I, O> {
    fn clone(&self) -> Self {
        Self {
            transform: Arc::clone(&self.transform),
            completion: Arc::clone(&self.completion),
            failures: self.failures.clone(),
            observer: Arc::clone(&self.observer),
            worker_timeout: self.worker_timeout,
            poll_interval: self.poll_interval,
        }
    }
}

/// Handles of a running pipeline. Consumer reads `output`; stop closes both channels and joins.
pub struct PipelineHandles<I, O> {
    pub input: BoundedChannel<I>,
    pub output: BoundedChannel<O>,
    pub producer_handle: Option<JoinHandle<usize>>,
    pub worker_handles: Vec<JoinHandle<()>>,
    pub completion: Arc<Completion>,
    pub n_workers: usize,
}
