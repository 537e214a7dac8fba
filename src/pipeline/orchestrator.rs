use anyhow::{Context, Result};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::observer::{LifecycleEvent, SharedObserver};
use crate::types::Packet;
use crate::{Failure, PipelineConfig, PipelineState};

use super::context::{
    FailureLog, PipelineHandles, PipelineParts, ProducerContext, WorkerContext,
    create_pipeline_channels,
};
use super::error_handler::report_failures;
use super::producer::spawn_producer;
use super::workers::spawn_workers;

/// How often a bounded join re-checks whether the thread finished.
const JOIN_POLL: Duration = Duration::from_millis(5);

/// Master RNG for one run. A fixed seed is offset by the run number so restarts differ but
/// still replay exactly.
fn master_rng(config: &PipelineConfig, epoch: u64) -> StdRng {
    match config.seed {
        Some(base) => StdRng::seed_from_u64(base.wrapping_add(epoch << 32)),
        None => StdRng::from_rng(&mut rand::rng()),
    }
}

/// Start producer and workers for one run. On a spawn failure, whatever was started is shut
/// down again before the error is returned.
pub(crate) fn run_pipeline<I, O>(
    parts: &PipelineParts<I, O>,
    failures: &FailureLog,
) -> Result<PipelineHandles<I, O>>
where
    I: Clone + Send + Sync + 'static,
    O: Send + 'static,
{
    let config = &parts.config;
    config.validate()?;
    let epoch = parts.epoch.fetch_add(1, Ordering::Relaxed);
    let mut master = master_rng(config, epoch);
    let shuffle_seed: u64 = master.random();
    let seeds: Vec<u64> = (0..config.n_process).map(|_| master.random()).collect();

    let channels = create_pipeline_channels::<I, O>(config)?;
    debug!(
        "run {}: {} workers, input cap {}, output cap {}",
        epoch,
        config.n_process,
        channels.input.capacity(),
        channels.output.capacity()
    );
    let completion = super::completion::Completion::new(config.n_process);

    let producer_handle = spawn_producer(
        channels.input.clone(),
        ProducerContext {
            source: parts.source.clone(),
            repeat: config.repeat,
            shuffle: config.shuffle,
            shuffle_seed,
            skip_input: parts.skip_input.clone(),
            failures: failures.clone(),
            observer: Arc::clone(&parts.observer),
        },
    )
    .context("start producer")?;
    parts.emit(LifecycleEvent::ProducerSpawned);

    let worker_ctx = WorkerContext {
        transform: Arc::clone(&parts.transform),
        completion: Arc::clone(&completion),
        failures: failures.clone(),
        observer: Arc::clone(&parts.observer),
        worker_timeout: config.worker_timeout,
        poll_interval: config.poll_interval,
    };
    let (worker_handles, spawn_error) =
        spawn_workers(&channels.input, &channels.output, &worker_ctx, &seeds);

    let handles = PipelineHandles {
        input: channels.input,
        output: channels.output,
        producer_handle: Some(producer_handle),
        worker_handles,
        completion,
        n_workers: config.n_process,
    };
    if let Some(e) = spawn_error {
        shutdown_pipeline_handles(handles, config.grace_period, &parts.observer);
        return Err(e).context("start worker pool");
    }
    Ok(handles)
}

/// Join `handle` if it finishes within `grace`. Returns false when the thread is still running;
/// the handle is dropped then, which detaches the thread.
fn join_with_grace<R>(handle: JoinHandle<R>, grace: Duration, observer: &SharedObserver) -> bool {
    let deadline = Instant::now() + grace;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            let thread = handle.thread().name().unwrap_or("<unnamed>").to_string();
            observer.on_event(&LifecycleEvent::Detached { thread });
            return false;
        }
        thread::sleep(JOIN_POLL);
    }
    // Worker panics are already caught per item; a panic here came from outside the transform.
    if handle.join().is_err() {
        log::error!("pipeline thread panicked outside the transform");
    }
    true
}

/// Stop a run: close output first (wakes the consumer), then input (wakes the producer and idle
/// workers), then join workers newest-first and the producer, each bounded by `grace`.
pub(crate) fn shutdown_pipeline_handles<I, O>(
    handles: PipelineHandles<I, O>,
    grace: Duration,
    observer: &SharedObserver,
) {
    let PipelineHandles {
        input,
        output,
        producer_handle,
        mut worker_handles,
        ..
    } = handles;

    output.close();
    input.close();

    let mut detached = 0_usize;
    while let Some(handle) = worker_handles.pop() {
        if !join_with_grace(handle, grace, observer) {
            detached += 1;
        }
    }
    if let Some(handle) = producer_handle
        && !join_with_grace(handle, grace, observer)
    {
        detached += 1;
    }
    if detached > 0 {
        debug!("{} thread(s) detached; they exit at their next channel operation", detached);
    }
}

/// Owns one pipeline run at a time: start, stop, and receive from the output channel.
///
/// Dropping a `Controller` stops it, so every exit path (early return, `?`, panic) tears the
/// threads down.
pub struct Controller<I, O> {
    parts: Arc<PipelineParts<I, O>>,
    handles: Option<PipelineHandles<I, O>>,
    state: PipelineState,
    failures: FailureLog,
}

impl<I, O> Controller<I, O>
where
    I: Clone + Send + Sync + 'static,
    O: Send + 'static,
{
    pub(crate) fn new(parts: Arc<PipelineParts<I, O>>) -> Self {
        Self {
            parts,
            handles: None,
            state: PipelineState::Idle,
            failures: FailureLog::default(),
        }
    }

    /// Start a fresh run. A run already in progress is stopped first.
    pub fn start(&mut self) -> Result<()> {
        if self.handles.is_some() {
            self.stop();
        }
        self.failures = FailureLog::default();
        let handles = run_pipeline(&self.parts, &self.failures)?;
        self.handles = Some(handles);
        self.set_state(PipelineState::Running);
        Ok(())
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.handles.is_some()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.parts.config
    }

    /// Failures absorbed by the current (or last) run.
    pub fn failures(&self) -> Vec<Failure> {
        self.failures.snapshot()
    }

    /// Workers of the current run that have not yet sent their closing sentinel.
    pub fn remaining_workers(&self) -> usize {
        self.handles
            .as_ref()
            .map_or(0, |h| h.completion.remaining())
    }

    /// Next packet from the output channel, waiting up to `timeout`.
    /// `Packet::Timeout` when not running.
    pub fn recv(&self, timeout: Duration) -> Packet<O> {
        self.recv_packet(timeout).unwrap_or(Packet::Timeout)
    }

    pub(crate) fn recv_packet(&self, timeout: Duration) -> Option<Packet<O>> {
        self.handles.as_ref()?.output.recv_packet(timeout)
    }

    pub(crate) fn try_recv(&self) -> Option<Packet<O>> {
        self.handles.as_ref()?.output.try_get()
    }

    pub(crate) fn n_workers(&self) -> usize {
        self.handles
            .as_ref()
            .map_or(self.parts.config.n_process, |h| h.n_workers)
    }

    pub(crate) fn all_workers_done(&self) -> bool {
        self.handles
            .as_ref()
            .is_none_or(|h| h.completion.is_done())
    }

    pub(crate) fn parts(&self) -> &PipelineParts<I, O> {
        &self.parts
    }
}

impl<I, O> Controller<I, O> {
    /// Stop the current run. Idempotent; returns within roughly `(n_process + 1) * grace_period`.
    pub fn stop(&mut self) {
        let Some(handles) = self.handles.take() else {
            return;
        };
        self.set_state(PipelineState::Draining);
        shutdown_pipeline_handles(handles, self.parts.config.grace_period, &self.parts.observer);
        report_failures(&self.failures, self.parts.config.verbose);
        self.set_state(PipelineState::Terminated);
    }

    fn set_state(&mut self, state: PipelineState) {
        self.state = state;
        self.parts.emit(LifecycleEvent::StateChanged(state));
    }
}

impl<I, O> Drop for Controller<I, O> {
    fn drop(&mut self) {
        self.stop();
    }
}
