//! Progress counter for the demo binary.

use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex};

// Progress bar type alias
pub type ProgressBar = Arc<Mutex<Bar>>;

/// Create a counter for unknown total (shows count without percentage)
pub fn create_counter(desc: &'static str) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = 0,
        desc = desc,
        animation = Animation::Classic,
        position = 0,
        unit = " items"
    )))
}

/// Create a bar for a known total.
pub fn create_progress_bar(total: usize, desc: &'static str) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = total,
        desc = desc,
        animation = Animation::Classic
    )))
}

/// Update progress bar if available
/// Uses try_lock to avoid blocking if mutex is contended (non-blocking)
pub fn update_progress_bar(pb: &ProgressBar, n: usize) {
    if let Ok(mut pb) = pb.try_lock() {
        let _ = pb.update(n);
    }
}

/// Final progress update for the remainder after batched updates.
pub fn flush_progress_remainder(pb: Option<&ProgressBar>, total: usize, chunk_size: usize) {
    if let Some(pb) = pb {
        let remaining = total % chunk_size;
        if remaining > 0 {
            update_progress_bar(pb, remaining);
        }
        if let Ok(mut bar) = pb.try_lock() {
            let _ = bar.refresh();
        }
    }
}
