// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;
use std::sync::Arc;

/// The largest draw below `1.0`.
const MAX_DRAW: f64 = 1.0 - f64::EPSILON;

/// Non-cryptographic random number source shared by the chaos and retry components.
///
/// The default source draws from `fastrand`'s thread-local generator: every thread owns its
/// own state, so concurrent callers never contend on a lock and no process-wide registry of
/// generators is kept.
///
/// This source is **NOT cryptographically secure**. It is meant for sampling, weighted
/// selection and jitter only.
///
/// Deterministic sources ([`fixed`][Self::fixed], [`from_fn`][Self::from_fn]) are available
/// for simulations and tests.
///
/// # Examples
///
/// ```rust
/// use airbag::Randomizer;
///
/// let fixed = Randomizer::fixed(0.25);
/// assert_eq!(fixed.next_double(4.0), 1.0);
/// assert_eq!(fixed.next_int(8), 2);
/// ```
#[derive(Clone, Default)]
pub struct Randomizer(Source);

#[derive(Clone, Default)]
enum Source {
    #[default]
    ThreadLocal,
    Custom(Arc<dyn Fn() -> f64 + Send + Sync>),
}

impl Debug for Randomizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Source::ThreadLocal => write!(f, "Randomizer(ThreadLocal)"),
            Source::Custom(_) => write!(f, "Randomizer(Custom)"),
        }
    }
}

impl Randomizer {
    /// Creates a randomizer backed by the calling thread's generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a randomizer that always yields `value` from [`next_f64`][Self::next_f64].
    ///
    /// Values are clamped into `[0.0, 1.0)`, so `1.0` and above become the largest draw below
    /// `1.0`; a NaN becomes `0.0`.
    #[must_use]
    pub fn fixed(value: f64) -> Self {
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, MAX_DRAW) };
        Self(Source::Custom(Arc::new(move || value)))
    }

    /// Creates a randomizer whose draws come from `f`.
    ///
    /// `f` should return values in `[0.0, 1.0)`.
    #[must_use]
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        Self(Source::Custom(Arc::new(f)))
    }

    /// Returns a value in `[0.0, 1.0)`.
    #[must_use]
    pub fn next_f64(&self) -> f64 {
        match &self.0 {
            Source::ThreadLocal => fastrand::f64(),
            Source::Custom(generator) => generator(),
        }
    }

    /// Returns a value in `[0.0, max)`.
    #[must_use]
    pub fn next_double(&self, max: f64) -> f64 {
        self.next_f64() * max
    }

    /// Returns a value in `[0, max)`. A `max` of zero yields zero.
    #[must_use]
    pub fn next_int(&self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }

        match &self.0 {
            Source::ThreadLocal => fastrand::u32(..max),
            Source::Custom(generator) => scale_to_int(generator(), max),
        }
    }
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "the value is clamped into the u32 range before casting"
)]
fn scale_to_int(draw: f64, max: u32) -> u32 {
    (draw * f64::from(max)).floor().clamp(0.0, f64::from(max - 1)) as u32
}
