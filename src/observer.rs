//! Lifecycle events and the observer that receives them.

use log::{Level, log, warn};
use std::sync::Arc;

use crate::PipelineState;

/// Something that happened to a pipeline run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    StateChanged(PipelineState),
    ProducerSpawned,
    /// Producer exited after pushing `pushed` items.
    ProducerStopped { pushed: usize },
    WorkerSpawned { worker: usize, seed: u64 },
    WorkerStopped { worker: usize },
    /// Thread still alive after the grace period; left to exit on its own.
    Detached { thread: String },
    TransformFailed { worker: usize, message: String },
    SourceFailed { message: String },
    /// Consumer stopped waiting while `remaining` workers had not reported.
    ConsumerTimedOut { remaining: usize },
}

/// Receives lifecycle events. Called from the consumer, producer and worker threads.
pub trait LifecycleObserver: Send + Sync {
    fn on_event(&self, event: &LifecycleEvent);
}

pub type SharedObserver = Arc<dyn LifecycleObserver>;

/// Default observer: writes events through the `log` facade.
/// Routine events go to info when `verbose`, debug otherwise; failures always warn.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver {
    pub verbose: bool,
}

impl LogObserver {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn routine_level(&self) -> Level {
        if self.verbose {
            Level::Info
        } else {
            Level::Debug
        }
    }
}

impl LifecycleObserver for LogObserver {
    fn on_event(&self, event: &LifecycleEvent) {
        let level = self.routine_level();
        match event {
            LifecycleEvent::StateChanged(state) => log!(level, "pipeline {}", state),
            LifecycleEvent::ProducerSpawned => log!(level, "  (Producer) started"),
            LifecycleEvent::ProducerStopped { pushed } => {
                log!(level, "  (Producer) stopped after {} items", pushed)
            }
            LifecycleEvent::WorkerSpawned { worker, seed } => {
                log!(level, "  (Worker {}) started, seed {}", worker, seed)
            }
            LifecycleEvent::WorkerStopped { worker } => {
                log!(level, "  (Worker {}) stopped", worker)
            }
            LifecycleEvent::Detached { thread } => {
                warn!("{} did not exit within the grace period; detaching", thread)
            }
            LifecycleEvent::TransformFailed { worker, message } => {
                warn!("worker {} transform failed: {}", worker, message)
            }
            LifecycleEvent::SourceFailed { message } => warn!("producer error: {}", message),
            LifecycleEvent::ConsumerTimedOut { remaining } => warn!(
                "timed out waiting for results with {} worker(s) still running; stragglers are dropped",
                remaining
            ),
        }
    }
}
