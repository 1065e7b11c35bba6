// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Fault injection, request replay, hedging and retry hints for outbound requests.
//!
//! This crate holds the building blocks that an HTTP client pipeline needs to stay resilient and
//! to be tested against failure. The pieces are independent; a pipeline picks the ones it needs
//! and shares a [`ResilienceContext`] between them.
//!
//! # Building Blocks
//!
//! - [`snapshot`]: Captures a request once so it can be replayed for retries and hedges, with a
//!   pool that recycles capture buffers.
//! - [`chaos`]: Injects errors, substituted responses and latency into calls, driven by
//!   hot-reloadable named options and weighted fault groups.
//! - [`hedging`]: Races a primary attempt against delayed speculative attempts.
//! - [`retry`]: Parses `Retry-After` hints and computes deterministic total retry delays.
//! - [`options`]: Named, hot-reloadable configuration with validation.
//! - [`Randomizer`]: The source of randomness used for fault decisions and jitter, replaceable
//!   in tests.
//!
//! # Quick Start
//!
//! Inject a 503 response into a quarter of the calls of the `catalog` client:
//!
//! ```rust
//! use airbag::chaos::{FaultGroupOptions, FaultInjectionOptions, FaultInjector, FaultKind, FaultRegistry, FaultResponse};
//! use airbag::options::OptionsMonitor;
//! use airbag::ResilienceContext;
//! use http::{Extensions, StatusCode};
//! use tick::Clock;
//!
//! # async fn example(clock: Clock) {
//! let monitor = OptionsMonitor::new();
//! monitor.set(
//!     "catalog",
//!     FaultInjectionOptions::new()
//!         .group(
//!             FaultGroupOptions::new("unavailable")
//!                 .probability(0.25)
//!                 .fault(FaultKind::Response { key: "503".into() }),
//!         )
//!         .weight("unavailable", 1.0),
//! );
//!
//! let registry = FaultRegistry::new().with_response("503", FaultResponse::new(StatusCode::SERVICE_UNAVAILABLE));
//! let injector = FaultInjector::new("catalog", &ResilienceContext::new(&clock), &monitor, registry);
//!
//! let result = injector.run(&Extensions::new(), || async { "real response" }).await;
//! # let _ = result;
//! # }
//! ```
//!
//! # Recovery Metadata
//!
//! Outputs classify themselves through [`Recovery`] and [`RecoveryInfo`], re-exported from the
//! `recoverable` crate. The hedging engine uses this classification to decide whether an
//! attempt's output is acceptable, and `Retry-After` hints convert into [`RecoveryInfo`] with a
//! delay.
//!
//! # Features
//!
//! - `serde`: Derives `Serialize` and `Deserialize` for the option types so they can be loaded
//!   from configuration files.
//! - `logs`: Emits structured log events through `tracing`. Logs must also be switched on per
//!   pipeline with `ResilienceContext::enable_logs`.

#[doc(inline)]
pub use recoverable::{Recovery, RecoveryInfo, RecoveryKind};

pub mod chaos;
pub mod hedging;
pub mod options;
pub mod retry;
pub mod snapshot;

mod context;
pub use context::ResilienceContext;

mod rnd;
pub use rnd::Randomizer;

mod shared;
pub use shared::{NotSet, Set};

pub(crate) mod utils;

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
pub(crate) mod testing;
