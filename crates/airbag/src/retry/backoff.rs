// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::cmp::min;
use std::time::Duration;

use crate::Randomizer;

/// Spread of the symmetric jitter: a delay `d` lands in `[0.75 * d, 1.25 * d]`.
const JITTER_FACTOR: f64 = 0.5;

/// Growth factor of exponential backoff without jitter.
const EXPONENTIAL_FACTOR: f64 = 2.0;

/// Defines how the delay between retry attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(any(feature = "serde", test), derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(any(feature = "serde", test), serde(rename_all = "snake_case"))]
pub enum Backoff {
    /// The same delay before every attempt.
    ///
    /// **Example with `2s` base delay:** `2s, 2s, 2s, 2s, ...`
    Constant,

    /// The delay grows by the base delay with every attempt.
    ///
    /// **Example with `2s` base delay:** `2s, 4s, 6s, 8s, ...`
    Linear,

    /// The delay doubles with every attempt.
    ///
    /// **Example with `2s` base delay:** `2s, 4s, 8s, 16s, ...`
    Exponential,
}

/// The per-attempt delay hints of a backoff strategy.
///
/// Yields the delay before retry 1, 2, 3 and so on. The iterator never ends.
#[derive(Debug, Clone)]
pub(crate) struct DelaySchedule {
    backoff: Backoff,
    base_delay: Duration,
    max_delay: Option<Duration>,
    use_jitter: bool,
    rnd: Randomizer,
    attempt: u32,
    // Position on the decorrelated jitter curve reached by the previous delay.
    prev: f64,
}

impl DelaySchedule {
    pub(crate) fn new(backoff: Backoff, base_delay: Duration) -> Self {
        Self {
            backoff,
            base_delay,
            max_delay: None,
            use_jitter: false,
            rnd: Randomizer::default(),
            attempt: 0,
            prev: 0.0,
        }
    }

    pub(crate) fn max_delay(self, max_delay: Option<Duration>) -> Self {
        Self { max_delay, ..self }
    }

    pub(crate) fn jitter(self, use_jitter: bool, rnd: Randomizer) -> Self {
        Self { use_jitter, rnd, ..self }
    }
}

impl Iterator for DelaySchedule {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        if self.base_delay.is_zero() {
            return Some(Duration::ZERO);
        }

        let retry = self.attempt.saturating_add(1);
        let delay = match (self.backoff, self.use_jitter) {
            (Backoff::Constant, false) => self.base_delay,
            (Backoff::Constant, true) => apply_jitter(self.base_delay, &self.rnd),
            (Backoff::Linear, false) => self.base_delay.saturating_mul(retry),
            (Backoff::Linear, true) => apply_jitter(self.base_delay.saturating_mul(retry), &self.rnd),
            (Backoff::Exponential, false) => mul_pow2(self.base_delay, self.attempt),
            (Backoff::Exponential, true) => decorrelated_jitter_v2(self.attempt, self.base_delay, &mut self.prev, &self.rnd),
        };

        self.attempt = retry;
        Some(self.max_delay.map_or(delay, |max| min(delay, max)))
    }
}

fn mul_pow2(base: Duration, exponent: u32) -> Duration {
    let factor = EXPONENTIAL_FACTOR.powi(i32::try_from(exponent).unwrap_or(i32::MAX));
    secs_to_duration_saturating(base.as_secs_f64() * factor)
}

/// Moves `delay` by a uniform offset in `[-delay/4, +delay/4]`; a draw of `0.5` leaves it unchanged.
fn apply_jitter(delay: Duration, rnd: &Randomizer) -> Duration {
    let ms = delay.as_secs_f64() * 1000.0;
    let offset = (ms * JITTER_FACTOR) / 2.0;
    let jittered = (ms * JITTER_FACTOR).mul_add(rnd.next_f64(), -offset);

    secs_to_duration_saturating((ms + jittered) / 1000.0)
}

/// Decorrelated jitter, second generation (`Polly.Contrib.WaitAndRetry`).
///
/// Each step samples a point `t = attempt + U[0,1)` on the curve `2^t * tanh(sqrt(4t))` and
/// returns the distance from the previous point, scaled so that medians fall near
/// `base, 2 * base, 4 * base, ...`.
fn decorrelated_jitter_v2(attempt: u32, base_delay: Duration, prev: &mut f64, rnd: &Randomizer) -> Duration {
    // Smooths the first delay.
    const P_FACTOR: f64 = 4.0;

    // Moves the medians from 1.4, 2.8, 5.6 to roughly 1, 2, 4.
    const RP_SCALING: f64 = 1.0 / 1.4;

    let t = f64::from(attempt) + rnd.next_f64();
    let next = t.exp2() * (P_FACTOR * t).sqrt().tanh();

    if !next.is_finite() {
        *prev = next;
        return Duration::MAX;
    }

    let step = next - *prev;
    *prev = next;

    secs_to_duration_saturating(step * RP_SCALING * base_delay.as_secs_f64())
}

pub(crate) fn secs_to_duration_saturating(secs: f64) -> Duration {
    if secs <= 0.0 || secs.is_nan() {
        return Duration::ZERO;
    }

    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}
