//! Data sources the producer can iterate.

use anyhow::Result;
use std::fmt;
use std::sync::Arc;

/// Boxed stream of raw items; an `Err` element ends the current pass.
pub type ItemStream<T> = Box<dyn Iterator<Item = Result<T>> + Send>;

type StreamFactory<T> = dyn Fn() -> Result<ItemStream<T>> + Send + Sync;

/// Where raw items come from.
///
/// - **`Materialized`**: an in-memory list. Each pass clones items out of it; `shuffle` permutes
///   the pass order.
/// - **`Stream`**: a factory re-opened on every pass (so `repeat` works on one-shot readers).
///   Cannot be shuffled without buffering a whole pass, so `shuffle` is ignored with a warning.
pub enum Source<T> {
    Materialized(Arc<Vec<T>>),
    Stream(Arc<StreamFactory<T>>),
}

impl<T> Clone for Source<T> {
    fn clone(&self) -> Self {
        match self {
            Source::Materialized(items) => Source::Materialized(Arc::clone(items)),
            Source::Stream(open) => Source::Stream(Arc::clone(open)),
        }
    }
}

impl<T> fmt::Debug for Source<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Materialized(items) => write!(f, "Materialized({} items)", items.len()),
            Source::Stream(_) => f.write_str("Stream"),
        }
    }
}

impl<T> Source<T> {
    pub fn from_vec(items: Vec<T>) -> Self {
        Source::Materialized(Arc::new(items))
    }

    /// Stream source from a factory returning a fresh iterator of items per pass.
    pub fn from_fn<F, I>(open: F) -> Self
    where
        F: Fn() -> I + Send + Sync + 'static,
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
        T: 'static,
    {
        Source::Stream(Arc::new(move || {
            Ok(Box::new(open().into_iter().map(Ok)) as ItemStream<T>)
        }))
    }

    /// Stream source whose opening and items may fail (e.g. file readers).
    pub fn from_fallible<F>(open: F) -> Self
    where
        F: Fn() -> Result<ItemStream<T>> + Send + Sync + 'static,
    {
        Source::Stream(Arc::new(open))
    }

    pub fn is_materialized(&self) -> bool {
        matches!(self, Source::Materialized(_))
    }
}

impl<T> From<Vec<T>> for Source<T> {
    fn from(items: Vec<T>) -> Self {
        Source::from_vec(items)
    }
}
