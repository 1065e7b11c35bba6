// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use super::{ChangeListener, OptionsSource, Subscription};

/// An in-memory, thread-safe [`OptionsSource`].
///
/// Clones share the same values and listeners. Listeners run on the thread that calls
/// [`set`][Self::set], after the new value has been stored.
///
/// # Examples
///
/// ```rust
/// use airbag::options::{OptionsMonitor, OptionsSource};
///
/// let monitor = OptionsMonitor::new();
/// monitor.set("primary", 42_u32);
///
/// assert_eq!(monitor.get("primary").as_deref(), Some(&42));
/// assert!(monitor.get("secondary").is_none());
/// ```
pub struct OptionsMonitor<T> {
    inner: Arc<MonitorInner<T>>,
}

struct MonitorInner<T> {
    values: RwLock<HashMap<String, Arc<T>>>,
    listeners: Mutex<Listeners<T>>,
}

struct Listeners<T> {
    next_id: u64,
    entries: Vec<(u64, ChangeListener<T>)>,
}

impl<T> OptionsMonitor<T> {
    /// Creates an empty monitor.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                values: RwLock::new(HashMap::new()),
                listeners: Mutex::new(Listeners {
                    next_id: 0,
                    entries: Vec::new(),
                }),
            }),
        }
    }

    /// Stores `value` under `name` and notifies every registered listener.
    pub fn set(&self, name: impl Into<String>, value: T) {
        let name = name.into();
        let value = Arc::new(value);
        self.inner.values.write().insert(name.clone(), Arc::clone(&value));

        // Listeners run outside the lock so they may call back into the monitor.
        let listeners: Vec<_> = self
            .inner
            .listeners
            .lock()
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(&name, &value);
        }
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().entries.len()
    }
}

impl<T: Send + Sync + 'static> OptionsSource<T> for OptionsMonitor<T> {
    fn get(&self, name: &str) -> Option<Arc<T>> {
        self.inner.values.read().get(name).cloned()
    }

    fn on_change(&self, listener: ChangeListener<T>) -> Subscription {
        let id = {
            let mut listeners = self.inner.listeners.lock();
            let id = listeners.next_id;
            listeners.next_id = listeners.next_id.wrapping_add(1);
            listeners.entries.push((id, listener));
            id
        };

        let weak: Weak<MonitorInner<T>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.listeners.lock().entries.retain(|(entry, _)| *entry != id);
            }
        })
    }
}

impl<T> Default for OptionsMonitor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for OptionsMonitor<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for OptionsMonitor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionsMonitor")
            .field("names", &self.inner.values.read().len())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn static_assertions() {
        static_assertions::assert_impl_all!(OptionsMonitor<String>: Send, Sync, Clone, Debug);
    }

    #[test]
    fn set_then_get() {
        let monitor = OptionsMonitor::new();
        monitor.set("a", "one".to_string());
        monitor.set("a", "two".to_string());

        assert_eq!(monitor.get("a").as_deref().map(String::as_str), Some("two"));
        assert!(monitor.get("b").is_none());
    }

    #[test]
    fn listeners_observe_stored_value() {
        let monitor = OptionsMonitor::new();
        let observer = monitor.clone();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let _subscription = monitor.on_change(Arc::new(move |name: &str, value: &Arc<u32>| {
            assert_eq!(observer.get(name).as_deref(), Some(value.as_ref()));
            sink.lock().push((name.to_string(), **value));
        }));

        monitor.set("a", 1);
        monitor.set("b", 2);

        assert_eq!(*seen.lock(), vec![("a".to_string(), 1), ("b".to_string(), 2)]);
    }

    #[test]
    fn dropping_subscription_stops_notifications() {
        let monitor = OptionsMonitor::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let subscription = monitor.on_change(Arc::new(move |_: &str, _: &Arc<u32>| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(monitor.listener_count(), 1);

        monitor.set("a", 1);
        drop(subscription);
        monitor.set("a", 2);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(monitor.listener_count(), 0);
    }

    #[test]
    fn subscription_outliving_monitor_is_harmless() {
        let monitor = OptionsMonitor::<u32>::new();
        let subscription = monitor.on_change(Arc::new(|_: &str, _: &Arc<u32>| {}));

        drop(monitor);
        drop(subscription);
    }

    #[test]
    fn debug_reports_counts() {
        let monitor = OptionsMonitor::new();
        monitor.set("a", 1_u8);

        assert_eq!(format!("{monitor:?}"), "OptionsMonitor { names: 1, listeners: 0 }");
    }
}
