//! Result iterator: the consumer side of a run.

use log::{debug, error};

use crate::filter::should_skip;
use crate::observer::LifecycleEvent;
use crate::types::Packet;
use crate::{Failure, PipelineState};

use super::orchestrator::Controller;

/// Lazy sequence of transformed items for one run.
///
/// The run starts on the first `next()` and stops when every worker has sent its closing
/// sentinel, when nothing arrives within `consumer_timeout`, or when this value is dropped.
/// Once exhausted it stays exhausted; call [`Pipeline::iter`](crate::Pipeline::iter) again for
/// a new run.
pub struct Results<I, O> {
    controller: Controller<I, O>,
    started: bool,
    finished: bool,
    draining: bool,
    sentinels: usize,
    yielded: usize,
}

impl<I, O> Results<I, O>
where
    I: Clone + Send + Sync + 'static,
    O: Send + 'static,
{
    pub(crate) fn new(controller: Controller<I, O>) -> Self {
        Self {
            controller,
            started: false,
            finished: false,
            draining: false,
            sentinels: 0,
            yielded: 0,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.controller.state()
    }

    /// Failures absorbed so far in this run. Empty means every item was transformed.
    pub fn failures(&self) -> Vec<Failure> {
        self.controller.failures()
    }

    /// Items handed to the caller so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    /// True once the producer's `End` came through and only stragglers are being collected.
    pub fn is_draining(&self) -> bool {
        self.draining
    }

    /// Stop the run now. Later `next()` calls return `None`.
    pub fn stop(&mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            self.controller.stop();
            debug!("results: {} items yielded", self.yielded);
        }
    }

    /// A worker forwarded its closing sentinel. When all have, every item is already behind us.
    fn on_worker_sentinel(&mut self, end: bool) -> bool {
        self.sentinels += 1;
        if end && !self.draining {
            self.draining = true;
            debug!("results: end received, draining remaining workers");
        }
        self.sentinels >= self.controller.n_workers()
    }

    /// Take what is already queued without waiting. Used once every worker has finished.
    fn next_flushed(&mut self) -> Option<O> {
        while let Some(packet) = self.controller.try_recv() {
            if let Packet::Item(item) = packet {
                if should_skip(self.controller.parts().skip_output.as_ref(), &item) {
                    continue;
                }
                return Some(item);
            }
        }
        None
    }
}

impl<I, O> Iterator for Results<I, O>
where
    I: Clone + Send + Sync + 'static,
    O: Send + 'static,
{
    type Item = O;

    fn next(&mut self) -> Option<O> {
        if self.finished {
            return None;
        }
        if !self.started {
            self.started = true;
            if let Err(e) = self.controller.start() {
                error!("failed to start pipeline: {:#}", e);
                self.finish();
                return None;
            }
        }

        let timeout = self.controller.config().consumer_timeout;
        loop {
            match self.controller.recv_packet(timeout) {
                Some(Packet::Item(item)) => {
                    if should_skip(self.controller.parts().skip_output.as_ref(), &item) {
                        continue;
                    }
                    self.yielded += 1;
                    return Some(item);
                }
                Some(Packet::End) => {
                    if self.on_worker_sentinel(true) {
                        break;
                    }
                }
                Some(Packet::Timeout) => {
                    if self.on_worker_sentinel(false) {
                        break;
                    }
                }
                None => {
                    // Workers may all have finished with a sentinel lost to a close race.
                    if self.controller.all_workers_done() {
                        if let Some(item) = self.next_flushed() {
                            self.yielded += 1;
                            return Some(item);
                        }
                    } else {
                        let remaining = self.controller.remaining_workers();
                        self.controller
                            .parts()
                            .emit(LifecycleEvent::ConsumerTimedOut { remaining });
                    }
                    break;
                }
            }
        }
        self.finish();
        None
    }
}

impl<I, O> std::iter::FusedIterator for Results<I, O>
where
    I: Clone + Send + Sync + 'static,
    O: Send + 'static,
{
}
