//! The transform capability: turn one raw item into zero, one or many outputs.

use anyhow::Result;

/// Result of transforming one item.
///
/// `Many` is expanded lazily on the worker thread; its elements reach the output channel in
/// the order the iterator yields them.
pub enum Output<T> {
    Empty,
    One(T),
    Many(Box<dyn Iterator<Item = T>>),
}

impl<T> Output<T> {
    pub fn one(item: T) -> Self {
        Output::One(item)
    }

    pub fn many<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: 'static,
    {
        Output::Many(Box::new(iter.into_iter()))
    }

    /// Push every produced element through `emit`, stopping early if it returns false.
    /// Returns how many elements were emitted.
    pub(crate) fn for_each_until(self, mut emit: impl FnMut(T) -> bool) -> usize {
        match self {
            Output::Empty => 0,
            Output::One(item) => usize::from(emit(item)),
            Output::Many(iter) => {
                let mut n = 0;
                for item in iter {
                    if !emit(item) {
                        break;
                    }
                    n += 1;
                }
                n
            }
        }
    }
}

impl<T> From<Option<T>> for Output<T> {
    fn from(item: Option<T>) -> Self {
        match item {
            Some(item) => Output::One(item),
            None => Output::Empty,
        }
    }
}

impl<T: 'static> From<Vec<T>> for Output<T> {
    fn from(items: Vec<T>) -> Self {
        Output::many(items)
    }
}

/// Preprocessing hook run on every worker.
///
/// Shared by all workers through an `Arc`, so it must not rely on per-call mutable state;
/// use [`with_worker_rng`](crate::utils::with_worker_rng) for randomness.
pub trait Preprocess<I>: Send + Sync + 'static {
    type Out: Send + 'static;

    fn preprocess(&self, item: I) -> Result<Output<Self::Out>>;
}

impl<I, O, F> Preprocess<I> for F
where
    F: Fn(I) -> Result<Output<O>> + Send + Sync + 'static,
    O: Send + 'static,
{
    type Out = O;

    fn preprocess(&self, item: I) -> Result<Output<O>> {
        self(item)
    }
}

/// Transform from an infallible one-to-one function.
pub fn map<I, O, F>(f: F) -> impl Preprocess<I, Out = O>
where
    F: Fn(I) -> O + Send + Sync + 'static,
    I: 'static,
    O: Send + 'static,
{
    move |item: I| -> Result<Output<O>> { Ok(Output::One(f(item))) }
}

/// Transform from an infallible one-to-many function; the collection is expanded in order.
pub fn flat_map<I, O, C, F>(f: F) -> impl Preprocess<I, Out = O>
where
    F: Fn(I) -> C + Send + Sync + 'static,
    C: IntoIterator<Item = O>,
    C::IntoIter: 'static,
    I: 'static,
    O: Send + 'static,
{
    move |item: I| -> Result<Output<O>> { Ok(Output::many(f(item))) }
}
