//! Thread-local worker identity and randomness.
//!
//! Every pool worker gets an id (0 to n_process-1) and its own seeded RNG when it starts,
//! so random augmentations inside a transform never repeat across workers and replay
//! exactly under a fixed master seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;

thread_local! {
    /// Worker id, `None` outside pool threads.
    pub static WORKER_ID: RefCell<Option<usize>> = const { RefCell::new(None) };

    /// Seeded RNG for the current worker.
    pub static WORKER_RNG: RefCell<Option<StdRng>> = const { RefCell::new(None) };
}

/// Install id and seed for the calling worker thread.
pub fn init_worker(worker_id: usize, seed: u64) {
    WORKER_ID.with(|id| *id.borrow_mut() = Some(worker_id));
    WORKER_RNG.with(|rng| *rng.borrow_mut() = Some(StdRng::seed_from_u64(seed)));
}

/// Id of the calling worker, or `None` when not called from a pool thread.
pub fn current_worker_id() -> Option<usize> {
    WORKER_ID.with(|id| *id.borrow())
}

/// Run `f` with the worker RNG, or with the thread RNG when not in a worker.
pub fn with_worker_rng<R>(f: impl FnOnce(&mut dyn rand::RngCore) -> R) -> R {
    WORKER_RNG.with(|rng| {
        let mut rng_ref = rng.borrow_mut();
        match rng_ref.as_mut() {
            Some(rng) => f(rng),
            None => f(&mut rand::rng()),
        }
    })
}

/// Random bool from the worker RNG. Used by transforms like random flips.
pub fn worker_gen_bool(p: f64) -> bool {
    with_worker_rng(|rng| rng.random_bool(p))
}

/// Random value in `[low, high)` from the worker RNG.
pub fn worker_gen_range(low: u64, high: u64) -> u64 {
    with_worker_rng(|rng| rng.random_range(low..high))
}
