use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use crate::PipelineConfig;
use crate::filter::SkipFilter;
use crate::observer::{LogObserver, SharedObserver};
use crate::source::Source;
use crate::transform::Preprocess;

use super::context::PipelineParts;
use super::orchestrator::Controller;
use super::results::Results;

/// A configured pipeline: source + transform + options. Cheap to clone; every
/// [`iter`](Self::iter) or [`controller`](Self::controller) call is an independent run.
pub struct Pipeline<I, O> {
    parts: Arc<PipelineParts<I, O>>,
}

impl<I, O> Clone for Pipeline<I, O> {
    fn clone(&self) -> Self {
        Self {
            parts: Arc::clone(&self.parts),
        }
    }
}

impl<I, O> Pipeline<I, O>
where
    I: Clone + Send + Sync + 'static,
    O: Send + 'static,
{
    pub fn builder<P>(source: impl Into<Source<I>>, transform: P) -> PipelineBuilder<I, O>
    where
        P: Preprocess<I, Out = O>,
    {
        PipelineBuilder {
            source: source.into(),
            transform: Arc::new(transform),
            config: PipelineConfig::default(),
            skip_input: None,
            skip_output: None,
            observer: None,
        }
    }

    pub fn new<P>(
        source: impl Into<Source<I>>,
        transform: P,
        config: PipelineConfig,
    ) -> Result<Self>
    where
        P: Preprocess<I, Out = O>,
    {
        Self::builder(source, transform).config(config).build()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.parts.config
    }

    /// Lazy results of a fresh run. Threads start on the first `next()`.
    pub fn iter(&self) -> Results<I, O> {
        Results::new(self.controller())
    }

    /// Explicit start/stop handle for a fresh run. Stops on drop.
    pub fn controller(&self) -> Controller<I, O> {
        Controller::new(Arc::clone(&self.parts))
    }
}

impl<I, O> IntoIterator for &Pipeline<I, O>
where
    I: Clone + Send + Sync + 'static,
    O: Send + 'static,
{
    type Item = O;
    type IntoIter = Results<I, O>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Builder for [`Pipeline`] with method chaining.
pub struct PipelineBuilder<I, O> {
    source: Source<I>,
    transform: Arc<dyn Preprocess<I, Out = O>>,
    config: PipelineConfig,
    skip_input: Option<SkipFilter<I>>,
    skip_output: Option<SkipFilter<O>>,
    observer: Option<SharedObserver>,
}

impl<I, O> PipelineBuilder<I, O>
where
    I: Clone + Send + Sync + 'static,
    O: Send + 'static,
{
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Drop raw items matching `filter` before they are queued.
    pub fn skip_input_if(mut self, filter: SkipFilter<I>) -> Self {
        self.skip_input = Some(filter);
        self
    }

    /// Drop transformed items matching `filter` before they are yielded.
    pub fn skip_output_if(mut self, filter: SkipFilter<O>) -> Self {
        self.skip_output = Some(filter);
        self
    }

    /// Replace the default [`LogObserver`].
    pub fn observer(mut self, observer: SharedObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Validate the config and build. Nothing is spawned until a run starts.
    pub fn build(self) -> Result<Pipeline<I, O>> {
        self.config.validate()?;
        let observer = self
            .observer
            .unwrap_or_else(|| Arc::new(LogObserver::new(self.config.verbose)));
        Ok(Pipeline {
            parts: Arc::new(PipelineParts {
                source: self.source,
                transform: self.transform,
                config: self.config,
                skip_input: self.skip_input,
                skip_output: self.skip_output,
                observer,
                epoch: AtomicU64::new(0),
            }),
        })
    }
}
