// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;
use std::sync::Arc;

/// Callback invoked with the name and new value of every changed named options instance.
pub type ChangeListener<T> = Arc<dyn Fn(&str, &Arc<T>) + Send + Sync>;

/// A provider of named options values that can notify about runtime changes.
///
/// Implementations must store a new value before notifying listeners about it, so that a
/// listener calling [`get`][Self::get] observes the value it was notified with or a newer one.
pub trait OptionsSource<T>: Send + Sync {
    /// Returns the current value registered under `name`.
    fn get(&self, name: &str) -> Option<Arc<T>>;

    /// Registers `listener` for change notifications until the returned [`Subscription`] is dropped.
    fn on_change(&self, listener: ChangeListener<T>) -> Subscription;
}

/// Keeps a change listener registered; dropping it unregisters the listener.
#[must_use = "dropping a subscription unregisters its listener"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Creates a subscription that runs `unsubscribe` when dropped.
    pub fn new(unsubscribe: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Creates a subscription with nothing to unregister, for sources that never change.
    pub fn empty() -> Self {
        Self { unsubscribe: None }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}
