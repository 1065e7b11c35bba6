// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use tick::Clock;

/// Arguments for the [`recovery_with`][super::HedgingBuilder::recovery_with] callback.
#[derive(Debug)]
pub struct RecoveryArgs<'a> {
    pub(super) clock: &'a Clock,
    pub(super) attempt: u32,
}

impl RecoveryArgs<'_> {
    /// Returns the clock the engine runs on.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        self.clock
    }

    /// Returns the number of the attempt that produced the output; 1 is the primary.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

/// Arguments for the [`should_hedge`][super::HedgingBuilder::should_hedge] callback.
#[derive(Debug, Clone, Copy)]
pub struct ShouldHedgeArgs {
    pub(super) attempt: u32,
    pub(super) elapsed: Duration,
}

impl ShouldHedgeArgs {
    /// Returns the number the hedge would get; the first hedge is attempt 2.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Returns the time elapsed since the primary attempt started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// Arguments for the [`HedgingMode::dynamic`][super::HedgingMode::dynamic] callback.
#[derive(Debug, Clone, Copy)]
pub struct HedgingDelayArgs {
    pub(super) hedge_index: u32,
}

impl HedgingDelayArgs {
    /// Returns the 0-based index of the hedge about to be launched.
    ///
    /// Index 0 is the first hedge (attempt 2).
    #[must_use]
    pub fn hedge_index(&self) -> u32 {
        self.hedge_index
    }
}
