//! Shared helpers for integration tests.

#![allow(dead_code)]

use datagen::{LifecycleEvent, LifecycleObserver, PipelineConfig};
use std::sync::Mutex;
use std::time::Duration;

/// Config with short waits so tests end quickly.
pub fn fast_config(n_process: usize) -> PipelineConfig {
    PipelineConfig {
        n_process,
        worker_timeout: Duration::from_secs(5),
        consumer_timeout: Duration::from_secs(5),
        poll_interval: Duration::from_millis(10),
        grace_period: Duration::from_millis(500),
        ..PipelineConfig::default()
    }
}

/// Observer that keeps every event for later assertions.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl LifecycleObserver for Recorder {
    fn on_event(&self, event: &LifecycleEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
