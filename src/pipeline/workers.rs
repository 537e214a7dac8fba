use log::debug;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::FailureKind;
use crate::error::PipelineError;
use crate::observer::LifecycleEvent;
use crate::types::{ControlSignal, Packet};
use crate::utils::config::PackagePaths;
use crate::utils::worker_rng::init_worker;

use super::channel::BoundedChannel;
use super::completion::CompletionGuard;
use super::context::WorkerContext;

enum Applied {
    Forwarded,
    Failed(String),
    Closed,
}

/// Single worker: pull from `input`, transform, push to `output`, then forward exactly one
/// sentinel. Counts itself out of the completion countdown after that sentinel.
fn worker_loop<I, O>(
    worker_id: usize,
    seed: u64,
    input: BoundedChannel<I>,
    output: BoundedChannel<O>,
    ctx: WorkerContext<I, O>,
) where
    I: 'static,
    O: Send + 'static,
{
    init_worker(worker_id, seed);
    let _guard = CompletionGuard::new(ctx.completion.clone());

    let mut processed = 0_usize;
    let closing = loop {
        match next_input(&input, &ctx) {
            Packet::Item(item) => match apply_transform(worker_id, item, &output, &ctx) {
                Applied::Forwarded => processed += 1,
                Applied::Failed(msg) => {
                    ctx.observer.on_event(&LifecycleEvent::TransformFailed {
                        worker: worker_id,
                        message: msg.clone(),
                    });
                    ctx.failures
                        .record(FailureKind::Transform, Some(worker_id), msg);
                    break ControlSignal::End;
                }
                Applied::Closed => {
                    debug!("worker {}: output closed after {} items", worker_id, processed);
                    ctx.observer
                        .on_event(&LifecycleEvent::WorkerStopped { worker: worker_id });
                    return;
                }
            },
            Packet::End => {
                ctx.completion.mark_end_seen();
                break ControlSignal::End;
            }
            Packet::Timeout => break ControlSignal::Timeout,
        }
    };

    debug!(
        "worker {}: {} items, closing with {:?}",
        worker_id, processed, closing
    );
    // Closed output means stop() is running; nothing left to signal.
    let _ = match closing {
        ControlSignal::End => output.put_end(),
        _ => output.put_timeout(),
    };
    ctx.observer
        .on_event(&LifecycleEvent::WorkerStopped { worker: worker_id });
}

/// Wait for the next input packet in `poll_interval` slices, up to `worker_timeout` total.
/// Gives up early with `Timeout` once the input is closed or another worker took the `End`.
fn next_input<I, O>(input: &BoundedChannel<I>, ctx: &WorkerContext<I, O>) -> Packet<I> {
    let deadline = Instant::now() + ctx.worker_timeout;
    loop {
        let now = Instant::now();
        if now >= deadline {
            return Packet::Timeout;
        }
        match input.get(ctx.poll_interval.min(deadline - now)) {
            Packet::Timeout => {
                if input.is_closed() || ctx.completion.end_seen() {
                    return Packet::Timeout;
                }
            }
            packet => return packet,
        }
    }
}

/// Run the transform on one item and push every output. Errors and panics are contained here.
fn apply_transform<I, O>(
    worker_id: usize,
    item: I,
    output: &BoundedChannel<O>,
    ctx: &WorkerContext<I, O>,
) -> Applied
where
    I: 'static,
    O: Send + 'static,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let transformed = ctx.transform.preprocess(item)?;
        let mut closed = false;
        transformed.for_each_until(|out| {
            if output.put(out).is_err() {
                closed = true;
            }
            !closed
        });
        anyhow::Ok(closed)
    }));
    match outcome {
        Ok(Ok(false)) => Applied::Forwarded,
        Ok(Ok(true)) => Applied::Closed,
        Ok(Err(e)) => Applied::Failed(format!("{:#}", e)),
        Err(payload) => Applied::Failed(format!(
            "panicked: {} (worker {})",
            panic_message(payload.as_ref()),
            worker_id
        )),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

/// Spawn one worker per seed. Each gets clones of both channels; ids follow `seeds` order.
pub fn spawn_workers<I, O>(
    input: &BoundedChannel<I>,
    output: &BoundedChannel<O>,
    ctx: &WorkerContext<I, O>,
    seeds: &[u64],
) -> (Vec<JoinHandle<()>>, Option<PipelineError>)
where
    I: Send + 'static,
    O: Send + 'static,
{
    let mut handles = Vec::with_capacity(seeds.len());
    for (worker_id, &seed) in seeds.iter().enumerate() {
        let input = input.clone();
        let output = output.clone();
        let ctx_w = ctx.clone();
        let name = PackagePaths::get().worker_thread_name(worker_id);
        let spawned = thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker_loop(worker_id, seed, input, output, ctx_w));
        match spawned {
            Ok(handle) => {
                ctx.observer
                    .on_event(&LifecycleEvent::WorkerSpawned { worker: worker_id, seed });
                handles.push(handle);
            }
            Err(_) => return (handles, Some(PipelineError::Spawn(name))),
        }
    }
    (handles, None)
}
