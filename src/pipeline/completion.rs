//! Completion countdown shared by the workers and the result iterator.
//!
//! Each worker forwards exactly one sentinel and then counts itself out. Once the count hits
//! zero every worker's output is already in the output channel, so the consumer can finish by
//! emptying the channel instead of guessing with a timeout.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug)]
pub struct Completion {
    remaining: AtomicUsize,
    end_seen: AtomicBool,
}

impl Completion {
    pub fn new(workers: usize) -> Arc<Self> {
        Arc::new(Self {
            remaining: AtomicUsize::new(workers),
            end_seen: AtomicBool::new(false),
        })
    }

    /// Workers that have not yet pushed their closing sentinel.
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    pub fn is_done(&self) -> bool {
        self.remaining() == 0
    }

    /// Record that some worker consumed the producer's `End`.
    pub fn mark_end_seen(&self) {
        self.end_seen.store(true, Ordering::Release);
    }

    pub fn end_seen(&self) -> bool {
        self.end_seen.load(Ordering::Acquire)
    }

    fn finish_one(&self) {
        let _ = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }
}

/// Counts its worker out on drop, so early returns and panics are covered.
pub struct CompletionGuard {
    completion: Arc<Completion>,
}

impl CompletionGuard {
    pub fn new(completion: Arc<Completion>) -> Self {
        Self { completion }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.completion.finish_one();
    }
}
