// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Named options with runtime change notifications.
//!
//! [`OptionsSource`] abstracts where named options come from, [`OptionsMonitor`] is an
//! in-memory source, and [`NamedOptionsCache`] keeps the latest valid value of one name
//! available to lock-free readers.

mod monitor;
mod named_cache;
mod source;

pub use monitor::OptionsMonitor;
pub use named_cache::NamedOptionsCache;
pub(crate) use named_cache::OnRejected;
pub use source::{ChangeListener, OptionsSource, Subscription};
