//! Producer: iterate the source (optionally shuffled, optionally forever) into the input channel.

use log::{debug, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crate::FailureKind;
use crate::error::PipelineError;
use crate::filter::should_skip;
use crate::observer::LifecycleEvent;
use crate::source::Source;
use crate::utils::config::PackagePaths;

use super::channel::BoundedChannel;
use super::context::ProducerContext;
use super::workers::panic_message;

/// How one pass over the source ended.
pub enum PassOutcome {
    /// Source exhausted after pushing `pushed` items.
    Completed { pushed: usize },
    /// Opening or iterating the source failed.
    Failed { pushed: usize, msg: String },
    /// Input channel closed under us: the pipeline is stopping.
    Closed { pushed: usize },
}

pub fn spawn_producer<I>(
    input: BoundedChannel<I>,
    ctx: ProducerContext<I>,
) -> Result<JoinHandle<usize>, PipelineError>
where
    I: Clone + Send + Sync + 'static,
{
    let name = PackagePaths::get().producer_thread_name().to_string();
    thread::Builder::new()
        .name(name.clone())
        .spawn(move || {
            let pushed = run_produce_loop(&input, &ctx);
            ctx.observer
                .on_event(&LifecycleEvent::ProducerStopped { pushed });
            pushed
        })
        .map_err(|_| PipelineError::Spawn(name))
}

/// Run passes until the source is exhausted (no repeat), fails, or the channel closes.
/// Pushes exactly one `End` unless the channel was closed. Returns the number of items pushed.
pub fn run_produce_loop<I: Clone>(input: &BoundedChannel<I>, ctx: &ProducerContext<I>) -> usize {
    let mut rng = StdRng::seed_from_u64(ctx.shuffle_seed);
    if ctx.shuffle && !ctx.source.is_materialized() {
        warn!("shuffle is not supported for stream sources; items keep source order");
    }

    let mut pushed = 0_usize;
    let mut passes = 0_usize;
    loop {
        passes += 1;
        match run_pass(input, ctx, &mut rng) {
            PassOutcome::Completed { pushed: n } => {
                pushed += n;
                if !ctx.repeat {
                    break;
                }
                if n == 0 {
                    warn!("source produced no items in a pass; not repeating");
                    break;
                }
            }
            PassOutcome::Failed { pushed: n, msg } => {
                pushed += n;
                ctx.observer
                    .on_event(&LifecycleEvent::SourceFailed { message: msg.clone() });
                ctx.failures.record(FailureKind::Source, None, msg);
                break;
            }
            PassOutcome::Closed { pushed: n } => {
                debug!("producer: input closed during pass {}", passes);
                return pushed + n;
            }
        }
    }
    debug!("producer: {} items over {} pass(es), sending end", pushed, passes);
    // A close racing this is expected during stop.
    let _ = input.put_end();
    pushed
}

/// One pass over the source. A panic in the source iterator or the input filter ends the pass
/// as a failure instead of taking the producer thread down without an `End`.
fn run_pass<I: Clone>(
    input: &BoundedChannel<I>,
    ctx: &ProducerContext<I>,
    rng: &mut StdRng,
) -> PassOutcome {
    let mut pushed = 0_usize;
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        iterate_source(input, ctx, rng, &mut pushed)
    }));
    match outcome {
        Ok(outcome) => outcome,
        Err(payload) => PassOutcome::Failed {
            pushed,
            msg: format!("source panicked: {}", panic_message(payload.as_ref())),
        },
    }
}

fn iterate_source<I: Clone>(
    input: &BoundedChannel<I>,
    ctx: &ProducerContext<I>,
    rng: &mut StdRng,
    pushed: &mut usize,
) -> PassOutcome {
    let mut offer = |item: I| -> bool {
        if should_skip(ctx.skip_input.as_ref(), &item) {
            return true;
        }
        if input.put(item).is_err() {
            return false;
        }
        *pushed += 1;
        true
    };

    match &ctx.source {
        Source::Materialized(items) => {
            let mut order: Vec<usize> = (0..items.len()).collect();
            if ctx.shuffle {
                order.shuffle(rng);
            }
            for idx in order {
                if !offer(items[idx].clone()) {
                    return PassOutcome::Closed { pushed: *pushed };
                }
            }
        }
        Source::Stream(open) => {
            let stream = match open() {
                Ok(stream) => stream,
                Err(e) => {
                    return PassOutcome::Failed {
                        pushed: *pushed,
                        msg: format!("open source: {:#}", e),
                    };
                }
            };
            for result in stream {
                match result {
                    Ok(item) => {
                        if !offer(item) {
                            return PassOutcome::Closed { pushed: *pushed };
                        }
                    }
                    Err(e) => {
                        return PassOutcome::Failed {
                            pushed: *pushed,
                            msg: format!("{:#}", e),
                        };
                    }
                }
            }
        }
    }
    PassOutcome::Completed { pushed: *pushed }
}
