// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Retry timing helpers.
//!
//! - [`RetryAfter`] and [`RetryAfterSource`] read server-provided `Retry-After` hints.
//! - [`RetryDelayAggregator`] computes how long a backoff schedule would wait in total, which
//!   lets callers budget retries against a deadline without running them.

mod aggregate;
mod backoff;
mod retry_after;

pub use aggregate::{RetryDelayAggregator, aggregate_delay};
pub use backoff::Backoff;
pub use retry_after::{RetryAfter, RetryAfterSource};
