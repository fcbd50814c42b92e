//! Sentinel errors and wrap-chain matching.
//!
//! A [`Sentinel`] is the registration key of an error handler. Matching walks
//! the `source()` chain of the dispatched error and compares every link with
//! the sentinel by value, never by display text.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Error type accepted by dispatch and handed to handlers.
pub type DynError = dyn Error + 'static;

type MatchFn = dyn Fn(&DynError) -> bool + Send + Sync;

/// Iterates the wrap-chain of `err`, outermost first.
///
/// The first item is `err` itself; each following item is the `source()` of
/// the previous one. An error without a source yields a chain of length 1.
pub fn chain<'a>(err: &'a DynError) -> impl Iterator<Item = &'a DynError> {
    std::iter::successors(Some(err), |&link| link.source())
}

/// Comparable error value used as a lookup key.
///
/// Cloning is cheap: the comparison closure is shared behind an `Arc`.
#[derive(Clone)]
pub struct Sentinel {
    label: String,
    matcher: Arc<MatchFn>,
}

impl Sentinel {
    /// Sentinel matching any chain link of type `E` equal to `value`.
    pub fn new<E>(value: E) -> Self
    where
        E: Error + PartialEq + Send + Sync + 'static,
    {
        let label = format!("{value:?}");
        Self {
            label,
            matcher: Arc::new(move |link: &DynError| {
                link.downcast_ref::<E>().is_some_and(|candidate| *candidate == value)
            }),
        }
    }

    /// Sentinel backed by a `'static` error value.
    ///
    /// A link matches when it is the very same value (pointer identity) or an
    /// equal one.
    pub fn from_static<E>(value: &'static E) -> Self
    where
        E: Error + PartialEq + Sync + 'static,
    {
        Self {
            label: format!("{value:?}"),
            matcher: Arc::new(move |link: &DynError| {
                link.downcast_ref::<E>()
                    .is_some_and(|candidate| std::ptr::eq(candidate, value) || candidate == value)
            }),
        }
    }

    /// Sentinel matching any chain link whose concrete type is `E`.
    #[must_use]
    pub fn of_type<E>() -> Self
    where
        E: Error + 'static,
    {
        Self {
            label: std::any::type_name::<E>().to_string(),
            matcher: Arc::new(|link: &DynError| link.is::<E>()),
        }
    }

    /// Returns true if any link in the wrap-chain of `err` equals this sentinel.
    #[must_use]
    pub fn matches(&self, err: &DynError) -> bool {
        chain(err).any(|link| (self.matcher)(link))
    }

    /// Debug rendering of the sentinel value, used in logs.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Sentinel").field(&self.label).finish()
    }
}
