//! Datagen: parallel data-preprocessing pipeline.
//!
//! A producer thread feeds raw items into a bounded channel, `n_process` worker threads apply
//! a [`Preprocess`] transform, and [`Results`] hands the transformed items to the caller as a
//! lazy iterator.
//!
//! ```ignore
//! use datagen::{Pipeline, PipelineConfig, transform};
//!
//! let config = PipelineConfig::builder().n_process(3).shuffle(true).build();
//! let pipeline = Pipeline::new((1..=10).collect::<Vec<u32>>(), transform::map(|x: u32| x + 1), config)?;
//! let mut out: Vec<u32> = pipeline.iter().collect();
//! out.sort();
//! assert_eq!(out, (2..=11).collect::<Vec<_>>());
//! ```

pub mod engine;
pub mod error;
pub mod filter;
pub mod observer;
pub mod pipeline;
pub mod source;
pub mod transform;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use error::{ChannelClosed, PipelineError};
pub use filter::{Blank, SkipFilter};
pub use observer::{LifecycleEvent, LifecycleObserver, LogObserver};
pub use pipeline::{BoundedChannel, Controller, Pipeline, PipelineBuilder, Results};
pub use source::Source;
pub use transform::{Output, Preprocess};

/// Result alias used by public datagen API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;
