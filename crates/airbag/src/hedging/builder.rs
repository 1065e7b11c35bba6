// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::sync::Arc;

use tick::Clock;

use super::args::{RecoveryArgs, ShouldHedgeArgs};
use super::attempt::HedgingAttempt;
use super::callbacks::{OnHedge, ShouldHedge, ShouldRecover};
use super::constants::DEFAULT_MAX_HEDGED_ATTEMPTS;
use super::engine::{HedgingEngine, HedgingShared};
use super::mode::HedgingMode;
use crate::utils::TelemetryHelper;
use crate::{NotSet, Recovery, RecoveryInfo, ResilienceContext, Set};

/// Builder for [`HedgingEngine`].
///
/// Created by [`HedgingEngine::builder`]. The classification of outputs is required, so
/// [`build`][HedgingBuilder::build] only becomes available after
/// [`recovery_with`][HedgingBuilder::recovery_with] or [`recovery`][HedgingBuilder::recovery]
/// has been called.
///
/// # Defaults
///
/// | Parameter | Default | Set by |
/// |-----------|---------|--------|
/// | Maximum hedges | `1` (two attempts in total) | [`max_hedged_attempts`][HedgingBuilder::max_hedged_attempts] |
/// | Mode | [`HedgingMode::delay`] of 2 seconds | [`hedging_mode`][HedgingBuilder::hedging_mode] |
/// | Hedge gate | always hedge | [`should_hedge`][HedgingBuilder::should_hedge] |
/// | Hedge observer | none | [`on_hedge`][HedgingBuilder::on_hedge] |
pub struct HedgingBuilder<Out, S = Set> {
    clock: Clock,
    max_hedged_attempts: u32,
    hedging_mode: HedgingMode,
    should_recover: Option<ShouldRecover<Out>>,
    should_hedge: Option<ShouldHedge>,
    on_hedge: Option<OnHedge>,
    telemetry: TelemetryHelper,
    _state: PhantomData<fn(S) -> Out>,
}

impl<Out> HedgingBuilder<Out, NotSet> {
    pub(super) fn new(name: impl Into<Cow<'static, str>>, context: &ResilienceContext) -> Self {
        Self {
            clock: context.clock().clone(),
            max_hedged_attempts: DEFAULT_MAX_HEDGED_ATTEMPTS,
            hedging_mode: HedgingMode::default(),
            should_recover: None,
            should_hedge: None,
            on_hedge: None,
            telemetry: context.create_telemetry(name.into()),
            _state: PhantomData,
        }
    }
}

impl<Out, S> HedgingBuilder<Out, S> {
    /// Sets how many hedges may be launched in addition to the primary attempt.
    ///
    /// Zero disables hedging; the primary attempt then runs alone.
    #[must_use]
    pub fn max_hedged_attempts(mut self, count: u32) -> Self {
        self.max_hedged_attempts = count;
        self
    }

    /// Sets when hedges are launched.
    #[must_use]
    pub fn hedging_mode(mut self, mode: HedgingMode) -> Self {
        self.hedging_mode = mode;
        self
    }

    /// Classifies each completed output.
    ///
    /// An output whose [`RecoveryKind`][crate::RecoveryKind] is `Retry` or `Unavailable` is not
    /// acceptable: the engine keeps waiting for other attempts and may launch a hedge right away.
    /// Any other kind ends the call with that output.
    #[must_use]
    pub fn recovery_with(
        mut self,
        recover_fn: impl Fn(&Out, RecoveryArgs<'_>) -> RecoveryInfo + Send + Sync + 'static,
    ) -> HedgingBuilder<Out, Set> {
        self.should_recover = Some(ShouldRecover::new(recover_fn));
        self.into_state()
    }

    /// Classifies outputs with their [`Recovery`] implementation.
    #[must_use]
    pub fn recovery(self) -> HedgingBuilder<Out, Set>
    where
        Out: Recovery,
    {
        self.recovery_with(|out, _args| out.recovery())
    }

    /// Gates every hedge that is due.
    ///
    /// Returning `false` stops hedging for the rest of the call; attempts already running
    /// continue.
    #[must_use]
    pub fn should_hedge(mut self, should_hedge: impl Fn(ShouldHedgeArgs) -> bool + Send + Sync + 'static) -> Self {
        self.should_hedge = Some(ShouldHedge::new(should_hedge));
        self
    }

    /// Observes every hedge right before it is launched.
    #[must_use]
    pub fn on_hedge(mut self, on_hedge: impl Fn(&HedgingAttempt) + Send + Sync + 'static) -> Self {
        self.on_hedge = Some(OnHedge::new(on_hedge));
        self
    }

    fn into_state<T>(self) -> HedgingBuilder<Out, T> {
        HedgingBuilder {
            clock: self.clock,
            max_hedged_attempts: self.max_hedged_attempts,
            hedging_mode: self.hedging_mode,
            should_recover: self.should_recover,
            should_hedge: self.should_hedge,
            on_hedge: self.on_hedge,
            telemetry: self.telemetry,
            _state: PhantomData,
        }
    }
}

impl<Out> HedgingBuilder<Out, Set> {
    /// Builds the engine.
    #[must_use]
    pub fn build(self) -> HedgingEngine<Out> {
        let shared = HedgingShared {
            clock: self.clock,
            max_hedged_attempts: self.max_hedged_attempts,
            hedging_mode: self.hedging_mode,
            should_recover: self.should_recover.expect("should_recover must be set in Set state"),
            should_hedge: self.should_hedge,
            on_hedge: self.on_hedge,
            telemetry: self.telemetry,
        };

        HedgingEngine { shared: Arc::new(shared) }
    }
}

impl<Out, S> Debug for HedgingBuilder<Out, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HedgingBuilder")
            .field("max_hedged_attempts", &self.max_hedged_attempts)
            .field("hedging_mode", &self.hedging_mode)
            .field("should_recover", &self.should_recover.is_some())
            .field("should_hedge", &self.should_hedge.is_some())
            .field("on_hedge", &self.on_hedge.is_some())
            .finish_non_exhaustive()
    }
}
