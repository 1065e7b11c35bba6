// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Speculative parallel attempts for latency-sensitive calls.
//!
//! [`HedgingEngine`] starts a primary attempt and, if no acceptable result has arrived after a
//! delay, launches additional hedged attempts that race the primary. The first acceptable
//! result wins; every other attempt still running has its [`HedgingAttempt`] cancellation
//! token cancelled.
//!
//! Attempts that replay an HTTP request typically share one
//! [`RequestSnapshot`][crate::snapshot::RequestSnapshot] and rebuild the request per attempt.
//!
//! # Configuration
//!
//! | Parameter | Default | Set by |
//! |-----------|---------|--------|
//! | Output classification | required | [`recovery_with`][HedgingBuilder::recovery_with], [`recovery`][HedgingBuilder::recovery] |
//! | Maximum hedges | `1` | [`max_hedged_attempts`][HedgingBuilder::max_hedged_attempts] |
//! | Mode | 2 second delay | [`hedging_mode`][HedgingBuilder::hedging_mode] |
//! | Hedge gate | always | [`should_hedge`][HedgingBuilder::should_hedge] |
//! | Hedge observer | none | [`on_hedge`][HedgingBuilder::on_hedge] |
//!
//! # Logs
//!
//! With the `logs` feature and [`ResilienceContext::enable_logs`][crate::ResilienceContext::enable_logs],
//! the engine emits `airbag.hedge` for every hedge launched and `airbag.hedge.exhausted` when no
//! attempt produced an acceptable result.

mod args;
mod attempt;
mod builder;
mod callbacks;
mod constants;
mod engine;
mod mode;
mod outcome;

pub use args::{HedgingDelayArgs, RecoveryArgs, ShouldHedgeArgs};
pub use attempt::HedgingAttempt;
pub use builder::HedgingBuilder;
pub use engine::HedgingEngine;
pub use mode::HedgingMode;
pub use outcome::{Hedged, HedgingError};
