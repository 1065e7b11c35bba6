// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::fmt::Debug;
use std::sync::Arc;

use arc_swap::ArcSwap;

use super::{OptionsSource, Subscription};
use crate::utils::define_fn_wrapper;

define_fn_wrapper!(Validate<T>(Fn(value: &T) -> bool));
define_fn_wrapper!(OnRejected(Fn(name: &str)));

/// The latest valid value of one named options instance.
///
/// The cache subscribes to an [`OptionsSource`] and swaps in every value published under its
/// name. Readers call [`current`][Self::current], which never blocks and never observes a
/// partially updated value. A missing or invalid initial value resolves to `T::default()`;
/// invalid updates are ignored so the last valid value stays in effect.
///
/// The cache does not log rejected values on its own. Components that own a pipeline, such as
/// [`FaultInjector`][crate::chaos::FaultInjector], report them through their log events.
///
/// # Examples
///
/// ```rust
/// use airbag::options::{NamedOptionsCache, OptionsMonitor};
///
/// let monitor = OptionsMonitor::new();
/// monitor.set("orders", 3_u32);
///
/// let cache = NamedOptionsCache::with_validator("orders", &monitor, |value: &u32| *value < 10);
/// assert_eq!(*cache.current(), 3);
///
/// monitor.set("orders", 50);
/// assert_eq!(*cache.current(), 3);
///
/// monitor.set("orders", 5);
/// assert_eq!(*cache.current(), 5);
/// ```
pub struct NamedOptionsCache<T> {
    name: Cow<'static, str>,
    current: Arc<ArcSwap<T>>,
    _subscription: Subscription,
}

impl<T> NamedOptionsCache<T>
where
    T: Default + Send + Sync + 'static,
{
    /// Creates a cache for `name` that accepts every value.
    pub fn new<S>(name: impl Into<Cow<'static, str>>, source: &S) -> Self
    where
        S: OptionsSource<T> + ?Sized,
    {
        Self::create(name.into(), source, Validate::new(|_| true), OnRejected::new(|_| {}))
    }

    /// Creates a cache for `name` that only accepts values for which `validate` returns `true`.
    pub fn with_validator<S>(
        name: impl Into<Cow<'static, str>>,
        source: &S,
        validate: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self
    where
        S: OptionsSource<T> + ?Sized,
    {
        Self::create(name.into(), source, Validate::new(validate), OnRejected::new(|_| {}))
    }

    /// Like [`with_validator`][Self::with_validator], calling `on_rejected` with the name for
    /// every value the validator turns down.
    pub(crate) fn with_rejection_handler<S>(
        name: impl Into<Cow<'static, str>>,
        source: &S,
        validate: impl Fn(&T) -> bool + Send + Sync + 'static,
        on_rejected: OnRejected,
    ) -> Self
    where
        S: OptionsSource<T> + ?Sized,
    {
        Self::create(name.into(), source, Validate::new(validate), on_rejected)
    }

    fn create<S>(name: Cow<'static, str>, source: &S, validate: Validate<T>, on_rejected: OnRejected) -> Self
    where
        S: OptionsSource<T> + ?Sized,
    {
        let placeholder = Arc::new(T::default());
        let current = Arc::new(ArcSwap::new(Arc::clone(&placeholder)));

        // Subscribe before reading the initial value so that no update can slip in between.
        let subscription = {
            let current = Arc::clone(&current);
            let name = name.clone();
            let validate = validate.clone();
            let on_rejected = on_rejected.clone();
            source.on_change(Arc::new(move |changed: &str, value: &Arc<T>| {
                if changed != name {
                    return;
                }

                if validate.call(value) {
                    current.store(Arc::clone(value));
                } else {
                    on_rejected.call(&name);
                }
            }))
        };

        match source.get(&name) {
            Some(initial) if validate.call(&initial) => {
                // A listener may already have stored a newer value.
                let _previous = current.compare_and_swap(&placeholder, initial);
            }
            Some(_) => on_rejected.call(&name),
            None => {}
        }

        Self {
            name,
            current,
            _subscription: subscription,
        }
    }
}

impl<T> NamedOptionsCache<T> {
    /// Returns the name this cache follows.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the latest valid value.
    #[must_use]
    pub fn current(&self) -> Arc<T> {
        self.current.load_full()
    }
}

impl<T: Debug> Debug for NamedOptionsCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedOptionsCache")
            .field("name", &self.name)
            .field("current", &self.current.load())
            .finish_non_exhaustive()
    }
}
