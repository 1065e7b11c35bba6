// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::cmp::min;
use std::time::Duration;

use super::Backoff;
use super::backoff::DelaySchedule;
use crate::Randomizer;

/// Draw used for jitter while aggregating, making every schedule reproducible.
const AGGREGATION_DRAW: f64 = 0.5;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Computes the total time a retry schedule would wait, without waiting.
///
/// The aggregator sums the delay hints of the first `retry_count` retries of a backoff
/// strategy. Jitter, when enabled, uses a fixed draw of `0.5`, so the same configuration always
/// produces the same total. The sum saturates at [`Duration::MAX`].
///
/// Constant and linear schedules are summed in closed form; exponential schedules stop walking
/// once they level off at the cap or overflow, so large retry counts stay cheap.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// use airbag::retry::{Backoff, RetryDelayAggregator};
///
/// let linear = RetryDelayAggregator::new(Backoff::Linear, Duration::from_secs(1));
/// assert_eq!(linear.aggregate(3), Duration::from_secs(6));
///
/// let capped = RetryDelayAggregator::new(Backoff::Exponential, Duration::from_secs(1))
///     .max_delay(Duration::from_secs(3));
/// assert_eq!(capped.aggregate(4), Duration::from_secs(1 + 2 + 3 + 3));
/// ```
#[derive(Debug, Clone)]
pub struct RetryDelayAggregator {
    backoff: Backoff,
    base_delay: Duration,
    max_delay: Option<Duration>,
    use_jitter: bool,
}

impl RetryDelayAggregator {
    /// Creates an aggregator for `backoff` starting at `base_delay`, without jitter.
    #[must_use]
    pub fn new(backoff: Backoff, base_delay: Duration) -> Self {
        Self {
            backoff,
            base_delay,
            max_delay: None,
            use_jitter: false,
        }
    }

    /// Caps every individual delay at `max_delay`.
    #[must_use]
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Enables or disables jitter.
    #[must_use]
    pub fn use_jitter(mut self, use_jitter: bool) -> Self {
        self.use_jitter = use_jitter;
        self
    }

    /// Returns the individual delay hints of the first `retry_count` retries.
    pub fn delays(&self, retry_count: u32) -> impl Iterator<Item = Duration> + use<> {
        DelaySchedule::new(self.backoff, self.base_delay)
            .max_delay(self.max_delay)
            .jitter(self.use_jitter, Randomizer::fixed(AGGREGATION_DRAW))
            .take(usize::try_from(retry_count).unwrap_or(usize::MAX))
    }

    /// Returns the sum of the first `retry_count` delay hints.
    #[must_use]
    pub fn aggregate(&self, retry_count: u32) -> Duration {
        if retry_count == 0 || self.base_delay.is_zero() {
            return Duration::ZERO;
        }

        // A draw of 0.5 leaves constant and linear delays unchanged.
        match self.backoff {
            Backoff::Constant => {
                let delay = self.max_delay.map_or(self.base_delay, |max| min(self.base_delay, max));
                nanos_to_duration(delay.as_nanos().checked_mul(u128::from(retry_count)))
            }
            Backoff::Linear => self.linear_total(retry_count),
            Backoff::Exponential => self.stepped_total(retry_count),
        }
    }

    fn linear_total(&self, retry_count: u32) -> Duration {
        let base = self.base_delay.as_nanos();
        let count = u128::from(retry_count);

        // Retries up to `ramp` wait `retry * base`; the rest wait the cap.
        let (ramp, cap) = match self.max_delay {
            Some(max) => (min(count, max.as_nanos() / base), max.as_nanos()),
            None => (count, 0),
        };

        let ramp_total = base.checked_mul(ramp * (ramp + 1) / 2);
        let plateau_total = cap.checked_mul(count - ramp);

        nanos_to_duration(ramp_total.zip(plateau_total).and_then(|(ramp, plateau)| ramp.checked_add(plateau)))
    }

    fn stepped_total(&self, retry_count: u32) -> Duration {
        let mut total = Duration::ZERO;
        let mut remaining = retry_count;
        let mut previous = None;

        for delay in self.delays(retry_count) {
            // Two equal delays in a row: the schedule has levelled off at the cap.
            if previous == Some(delay) {
                return delay
                    .checked_mul(remaining)
                    .and_then(|rest| total.checked_add(rest))
                    .unwrap_or(Duration::MAX);
            }

            let Some(sum) = total.checked_add(delay) else {
                return Duration::MAX;
            };

            total = sum;
            remaining -= 1;
            previous = Some(delay);
        }

        total
    }
}

fn nanos_to_duration(nanos: Option<u128>) -> Duration {
    nanos
        .and_then(|nanos| {
            let secs = u64::try_from(nanos / NANOS_PER_SEC).ok()?;
            let subsec = u32::try_from(nanos % NANOS_PER_SEC).ok()?;
            Some(Duration::new(secs, subsec))
        })
        .unwrap_or(Duration::MAX)
}

/// Sums the first `retry_count` delays of `backoff` starting at `base_delay`, without jitter.
///
/// Shorthand for `RetryDelayAggregator::new(backoff, base_delay).aggregate(retry_count)`.
#[must_use]
pub fn aggregate_delay(retry_count: u32, base_delay: Duration, backoff: Backoff) -> Duration {
    RetryDelayAggregator::new(backoff, base_delay).aggregate(retry_count)
}
