// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Debug};
use std::time::Duration;

use super::args::HedgingDelayArgs;
use super::callbacks::DelayFn;
use super::constants::DEFAULT_HEDGING_DELAY;

/// When hedges are launched relative to the previous attempt.
///
/// A hedge is also launched early, regardless of the mode, as soon as an in-flight attempt
/// completes with an unacceptable result.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// use airbag::hedging::HedgingMode;
///
/// // Primary and every hedge start together.
/// let eager = HedgingMode::immediate();
///
/// // Wait 300ms after each launch before starting the next hedge.
/// let fixed = HedgingMode::delay(Duration::from_millis(300));
///
/// // Back off between hedges: 100ms, 200ms, 300ms, ...
/// let growing = HedgingMode::dynamic(|args| Duration::from_millis(100 * u64::from(args.hedge_index() + 1)));
/// # let _ = (eager, fixed, growing);
/// ```
#[derive(Clone)]
pub struct HedgingMode(Schedule);

#[derive(Clone)]
enum Schedule {
    Immediate,
    Fixed(Duration),
    Dynamic(DelayFn),
}

impl HedgingMode {
    /// Launches every hedge together with the primary attempt.
    #[must_use]
    pub fn immediate() -> Self {
        Self(Schedule::Immediate)
    }

    /// Waits `delay` after each launch before starting the next hedge.
    #[must_use]
    pub fn delay(delay: Duration) -> Self {
        Self(Schedule::Fixed(delay))
    }

    /// Computes the wait before each hedge from its index.
    #[must_use]
    pub fn dynamic(delay_fn: impl Fn(HedgingDelayArgs) -> Duration + Send + Sync + 'static) -> Self {
        Self(Schedule::Dynamic(DelayFn::new(delay_fn)))
    }

    pub(crate) fn is_immediate(&self) -> bool {
        matches!(self.0, Schedule::Immediate)
    }

    /// The wait between the previous launch and hedge number `hedge_index` (0-based).
    pub(crate) fn delay_for(&self, hedge_index: u32) -> Duration {
        match &self.0 {
            Schedule::Immediate => Duration::ZERO,
            Schedule::Fixed(delay) => *delay,
            Schedule::Dynamic(delay_fn) => delay_fn.call(HedgingDelayArgs { hedge_index }),
        }
    }
}

impl Default for HedgingMode {
    fn default() -> Self {
        Self::delay(DEFAULT_HEDGING_DELAY)
    }
}

impl Debug for HedgingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Schedule::Immediate => f.write_str("HedgingMode::Immediate"),
            Schedule::Fixed(delay) => write!(f, "HedgingMode::Delay({delay:?})"),
            Schedule::Dynamic(_) => f.write_str("HedgingMode::Dynamic"),
        }
    }
}
