//! Error taxonomy for the pipeline.
//!
//! Only [`PipelineError::InvalidConfig`] and [`PipelineError::Spawn`] ever reach a caller as an
//! `Err`. The rest are absorbed inside the pipeline and surface as log lines and
//! [`Failure`](crate::Failure) records.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Put or get attempted after `close()`. Expected while the pipeline is stopping.
    #[error("channel closed")]
    ChannelClosed,

    /// The transform returned an error or panicked.
    #[error("transform failed on worker {worker}: {message}")]
    TransformFailure { worker: usize, message: String },

    /// Opening or iterating the data source failed.
    #[error("source iteration failed: {0}")]
    SourceIterationFailure(String),

    #[error("invalid pipeline config: {0}")]
    InvalidConfig(String),

    #[error("failed to spawn {0} thread")]
    Spawn(String),
}

/// Marker returned by `put` on a closed channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("channel closed")]
pub struct ChannelClosed;

impl From<ChannelClosed> for PipelineError {
    fn from(_: ChannelClosed) -> Self {
        PipelineError::ChannelClosed
    }
}
