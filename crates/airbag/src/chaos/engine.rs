// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use super::{FaultError, FaultGroupOptions, FaultKind, FaultRegistry, FaultResponse};
use crate::Randomizer;

/// The outcome of evaluating a fault group for one call.
#[derive(Debug, Clone)]
pub enum FaultDecision {
    /// The call proceeds untouched.
    None,
    /// The call fails with this error.
    Error(FaultError),
    /// The call returns this response without reaching the transport.
    Response(FaultResponse),
    /// The call is delayed by this duration before proceeding.
    Latency(Duration),
}

impl FaultDecision {
    /// Returns `true` when nothing is injected.
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Decides whether a fault group fires and resolves its payload.
///
/// A group fires when a draw in `[0, 1)` falls below its probability. Probabilities of `1.0`
/// and above always fire; `0.0`, negative values and NaN never do. Disabled groups never fire.
///
/// Payload keys missing from the [`FaultRegistry`] resolve to [`FaultDecision::None`] so that a
/// configuration mistake never breaks the call it was meant to disturb. The engine itself does
/// not log; [`FaultInjector`][super::FaultInjector] reports missing keys for its pipeline.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// use airbag::Randomizer;
/// use airbag::chaos::{FaultDecision, FaultGroupOptions, FaultInjectionEngine, FaultKind, FaultRegistry};
///
/// let engine = FaultInjectionEngine::new(FaultRegistry::new(), Randomizer::fixed(0.4));
/// let slow = FaultGroupOptions::new("slow")
///     .probability(0.5)
///     .fault(FaultKind::Latency { latency: Duration::from_secs(1) });
///
/// assert!(matches!(engine.evaluate(&slow), FaultDecision::Latency(d) if d == Duration::from_secs(1)));
/// assert!(engine.evaluate(&slow.probability(0.3)).is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct FaultInjectionEngine {
    registry: FaultRegistry,
    rnd: Randomizer,
}

impl FaultInjectionEngine {
    /// Creates an engine resolving payloads from `registry` and drawing from `rnd`.
    #[must_use]
    pub fn new(registry: FaultRegistry, rnd: Randomizer) -> Self {
        Self { registry, rnd }
    }

    /// Returns the payload registry.
    #[must_use]
    pub fn registry(&self) -> &FaultRegistry {
        &self.registry
    }

    /// Evaluates `group` for a single call.
    #[must_use]
    pub fn evaluate(&self, group: &FaultGroupOptions) -> FaultDecision {
        self.resolve(group).unwrap_or(FaultDecision::None)
    }

    /// Like [`evaluate`][Self::evaluate], but reports the payload key that is missing from the
    /// registry instead of folding it into [`FaultDecision::None`].
    pub(crate) fn resolve<'a>(&self, group: &'a FaultGroupOptions) -> Result<FaultDecision, &'a str> {
        if !group.enabled || !self.fires(group.probability) {
            return Ok(FaultDecision::None);
        }

        match &group.fault {
            FaultKind::NoOp => Ok(FaultDecision::None),
            FaultKind::Error { key } => self.registry.error(key).map(FaultDecision::Error).ok_or(key.as_str()),
            FaultKind::Response { key } => self.registry.response(key).map(FaultDecision::Response).ok_or(key.as_str()),
            FaultKind::Latency { latency } => Ok(FaultDecision::Latency(*latency)),
        }
    }

    fn fires(&self, probability: f64) -> bool {
        if probability.is_nan() || probability <= 0.0 {
            return false;
        }

        if probability >= 1.0 {
            return true;
        }

        self.rnd.next_f64() < probability
    }
}
