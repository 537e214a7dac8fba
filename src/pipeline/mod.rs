//! Pipeline components: channel, producer, worker pool, controller, result iterator.
//!
//! ```text
//! source ─► Producer ─► input channel ─► Worker × N ─► output channel ─► Results ─► caller
//!                 (End once)        (one End/Timeout each)        (stop after N sentinels)
//! ```

pub mod builder;
pub mod channel;
pub mod completion;
pub mod context;
pub mod error_handler;
pub mod orchestrator;
pub mod producer;
pub mod results;
pub mod workers;

pub use builder::{Pipeline, PipelineBuilder};
pub use channel::BoundedChannel;
pub use completion::{Completion, CompletionGuard};
pub use context::{FailureLog, PipelineChannels, SharedTransform, create_pipeline_channels};
pub use error_handler::report_failures;
pub use orchestrator::Controller;
pub use producer::{PassOutcome, run_produce_loop, spawn_producer};
pub use results::Results;
pub use workers::spawn_workers;
