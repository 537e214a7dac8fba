//! Skip policies: which items count as "empty" and are dropped instead of forwarded.
//!
//! The producer applies the input policy before queueing a raw item; the result iterator
//! applies the output policy before yielding a transformed one. Both default to keeping
//! everything. [`blank`] opts in to dropping conventionally empty values.

use std::sync::Arc;

/// Predicate returning true for items that should be skipped.
pub type SkipFilter<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Types with a well-defined notion of "empty".
pub trait Blank {
    fn is_blank(&self) -> bool;
}

macro_rules! impl_blank_zero {
    ($($t:ty),*) => {
        $(impl Blank for $t {
            fn is_blank(&self) -> bool {
                *self == 0 as $t
            }
        })*
    };
}

impl_blank_zero!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl Blank for bool {
    fn is_blank(&self) -> bool {
        !*self
    }
}

impl Blank for String {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl Blank for &str {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl<T> Blank for Vec<T> {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl<T> Blank for Option<T> {
    fn is_blank(&self) -> bool {
        self.is_none()
    }
}

/// Skip every [`Blank`] value.
pub fn blank<T: Blank + 'static>() -> SkipFilter<T> {
    Arc::new(|item: &T| item.is_blank())
}

/// Wrap a closure as a skip filter.
pub fn skip_if<T, F>(f: F) -> SkipFilter<T>
where
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn should_skip<T>(filter: Option<&SkipFilter<T>>, item: &T) -> bool {
    filter.is_some_and(|f| f(item))
}
