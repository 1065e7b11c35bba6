// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::fmt::{self, Debug};
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{Either, select};
use futures_util::stream::{FuturesUnordered, StreamExt};
use tick::{Clock, Stopwatch};
use tokio_util::sync::CancellationToken;

use super::args::{RecoveryArgs, ShouldHedgeArgs};
use super::attempt::HedgingAttempt;
use super::builder::HedgingBuilder;
use super::callbacks::{OnHedge, ShouldHedge, ShouldRecover};
use super::mode::HedgingMode;
use super::outcome::{Hedged, HedgingError};
use crate::utils::TelemetryHelper;
use crate::{NotSet, RecoveryKind, ResilienceContext};

/// Races a primary attempt against delayed hedges and returns the first acceptable output.
///
/// The primary attempt starts immediately. A hedge is launched each time the configured
/// [`HedgingMode`] delay elapses since the previous launch, and immediately whenever an
/// attempt completes with an unacceptable output, until the hedge limit is reached.
/// Outputs are consumed in completion order. The first acceptable one wins and the
/// cancellation token of every attempt still running is cancelled; the engine does not wait
/// for them to wind down.
///
/// The engine is cheap to clone and can serve many concurrent calls.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// use airbag::hedging::{HedgingEngine, HedgingMode};
/// use airbag::{RecoveryInfo, ResilienceContext};
/// use tick::Clock;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example(clock: Clock) {
/// let context = ResilienceContext::new(&clock).name("inventory_client");
/// let engine = HedgingEngine::builder("hedging", &context)
///     .recovery_with(|status: &u16, _| {
///         if *status >= 500 { RecoveryInfo::retry() } else { RecoveryInfo::never() }
///     })
///     .max_hedged_attempts(2)
///     .hedging_mode(HedgingMode::delay(Duration::from_millis(200)))
///     .build();
///
/// let hedged = engine
///     .execute(&CancellationToken::new(), |attempt| async move {
///         // Send the request here; stop early once `attempt.cancellation()` fires.
///         if attempt.is_primary() { 503 } else { 200 }
///     })
///     .await
///     .expect("the hedge succeeds");
///
/// assert_eq!(*hedged.output(), 200);
/// # }
/// ```
pub struct HedgingEngine<Out> {
    pub(super) shared: Arc<HedgingShared<Out>>,
}

pub(crate) struct HedgingShared<Out> {
    pub(crate) clock: Clock,
    pub(crate) max_hedged_attempts: u32,
    pub(crate) hedging_mode: HedgingMode,
    pub(crate) should_recover: ShouldRecover<Out>,
    pub(crate) should_hedge: Option<ShouldHedge>,
    pub(crate) on_hedge: Option<OnHedge>,
    pub(crate) telemetry: TelemetryHelper,
}

/// What woke the coordination loop.
enum Wake<T> {
    Cancelled,
    Completed(Option<(u32, T)>),
    HedgeDue,
}

/// Per-call launch bookkeeping.
struct Launches {
    launched: u32,
    limit: u32,
    stopped: bool,
    in_flight: Vec<(u32, CancellationToken)>,
    started: Stopwatch,
    last_launch: Stopwatch,
}

impl<Out> HedgingEngine<Out> {
    /// Starts building an engine named `name` within the pipeline described by `context`.
    #[must_use]
    pub fn builder(name: impl Into<Cow<'static, str>>, context: &ResilienceContext) -> HedgingBuilder<Out, NotSet> {
        HedgingBuilder::new(name, context)
    }

    /// Runs one hedged call.
    ///
    /// `launch` is invoked once per attempt with a [`HedgingAttempt`] that carries the
    /// attempt number and a token derived from `cancellation`.
    ///
    /// # Errors
    ///
    /// Returns [`HedgingError::Exhausted`] when every launched attempt completed with an
    /// unacceptable output, and [`HedgingError::Cancelled`] when `cancellation` fires first.
    #[cfg_attr(test, mutants::skip)]
    pub async fn execute<F, Fut>(&self, cancellation: &CancellationToken, mut launch: F) -> Result<Hedged<Out>, HedgingError<Out>>
    where
        F: FnMut(HedgingAttempt) -> Fut,
        Fut: Future<Output = Out>,
    {
        if cancellation.is_cancelled() {
            return Err(HedgingError::Cancelled { attempts: 0 });
        }

        let shared = &*self.shared;
        let mut launches = Launches::new(&shared.clock, shared.max_hedged_attempts);
        let mut futs = FuturesUnordered::new();
        let mut last = None;

        let primary = launches.register(&shared.clock, cancellation);
        futs.push(tag(primary.number(), launch(primary)));

        if shared.hedging_mode.is_immediate() {
            while let Some(attempt) = shared.next_hedge(&mut launches, cancellation) {
                futs.push(tag(attempt.number(), launch(attempt)));
            }
        }

        loop {
            let wait = launches.wait(&shared.hedging_mode);

            let wake = {
                let cancelled = pin!(cancellation.cancelled());
                let next = pin!(futs.next());
                let delay = pin!(shared.clock.delay(wait));
                match select(cancelled, select(next, delay)).await {
                    Either::Left(((), _)) => Wake::Cancelled,
                    Either::Right((Either::Left((completed, _)), _)) => Wake::Completed(completed),
                    Either::Right((Either::Right(((), _)), _)) => Wake::HedgeDue,
                }
            };

            match wake {
                Wake::Cancelled => {
                    return Err(HedgingError::Cancelled {
                        attempts: launches.launched,
                    });
                }
                Wake::Completed(Some((number, out))) => {
                    launches.complete(number);

                    if shared.is_acceptable(&out, number) {
                        let cancelled = launches.cancel_in_flight();
                        return Ok(Hedged {
                            output: out,
                            attempt: number,
                            launched: launches.launched,
                            cancelled,
                        });
                    }

                    last = Some(out);

                    // Do not wait for the delay timer once an attempt has failed.
                    if let Some(attempt) = shared.next_hedge(&mut launches, cancellation) {
                        futs.push(tag(attempt.number(), launch(attempt)));
                    }
                }
                Wake::Completed(None) => {
                    shared.emit_exhausted(launches.launched);
                    return Err(HedgingError::Exhausted {
                        attempts: launches.launched,
                        last: last.expect("at least one attempt was launched"),
                    });
                }
                Wake::HedgeDue => {
                    if let Some(attempt) = shared.next_hedge(&mut launches, cancellation) {
                        futs.push(tag(attempt.number(), launch(attempt)));
                    }
                }
            }
        }
    }
}

async fn tag<Fut: Future>(number: u32, fut: Fut) -> (u32, Fut::Output) {
    (number, fut.await)
}

impl Launches {
    fn new(clock: &Clock, max_hedged_attempts: u32) -> Self {
        Self {
            launched: 0,
            limit: max_hedged_attempts.saturating_add(1),
            stopped: false,
            in_flight: Vec::new(),
            started: clock.stopwatch(),
            last_launch: clock.stopwatch(),
        }
    }

    fn can_hedge(&self) -> bool {
        !self.stopped && self.launched < self.limit
    }

    /// Time left until the next hedge is due; `Duration::MAX` when no hedge can follow.
    fn wait(&self, mode: &HedgingMode) -> Duration {
        if !self.can_hedge() {
            return Duration::MAX;
        }

        mode.delay_for(self.launched.saturating_sub(1))
            .saturating_sub(self.last_launch.elapsed())
    }

    fn register(&mut self, clock: &Clock, cancellation: &CancellationToken) -> HedgingAttempt {
        self.launched = self.launched.saturating_add(1);
        self.last_launch = clock.stopwatch();

        let token = cancellation.child_token();
        self.in_flight.push((self.launched, token.clone()));
        HedgingAttempt::new(self.launched, token)
    }

    fn complete(&mut self, number: u32) {
        self.in_flight.retain(|(n, _)| *n != number);
    }

    fn cancel_in_flight(&mut self) -> u32 {
        let mut cancelled = 0u32;
        for (_, token) in self.in_flight.drain(..) {
            token.cancel();
            cancelled = cancelled.saturating_add(1);
        }
        cancelled
    }
}

impl<Out> HedgingShared<Out> {
    fn is_acceptable(&self, out: &Out, attempt: u32) -> bool {
        let recovery = self.should_recover.call(out, RecoveryArgs { clock: &self.clock, attempt });

        !matches!(recovery.kind(), RecoveryKind::Retry | RecoveryKind::Unavailable)
    }

    fn next_hedge(&self, launches: &mut Launches, cancellation: &CancellationToken) -> Option<HedgingAttempt> {
        if !launches.can_hedge() {
            return None;
        }

        if let Some(should_hedge) = &self.should_hedge {
            let args = ShouldHedgeArgs {
                attempt: launches.launched.saturating_add(1),
                elapsed: launches.started.elapsed(),
            };

            if !should_hedge.call(args) {
                launches.stopped = true;
                return None;
            }
        }

        let attempt = launches.register(&self.clock, cancellation);

        if let Some(on_hedge) = &self.on_hedge {
            on_hedge.call(&attempt);
        }
        self.emit_hedge(attempt.number());

        Some(attempt)
    }

    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(unused_variables, clippy::unused_self, reason = "unused when logs feature not used")
    )]
    fn emit_hedge(&self, attempt: u32) {
        #[cfg(any(feature = "logs", test))]
        if self.telemetry.logs_enabled {
            tracing::event!(
                name: "airbag.hedge",
                tracing::Level::INFO,
                pipeline.name = %self.telemetry.pipeline_name,
                strategy.name = %self.telemetry.strategy_name,
                resilience.attempt.index = attempt,
            );
        }
    }

    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(unused_variables, clippy::unused_self, reason = "unused when logs feature not used")
    )]
    fn emit_exhausted(&self, attempts: u32) {
        #[cfg(any(feature = "logs", test))]
        if self.telemetry.logs_enabled {
            tracing::event!(
                name: "airbag.hedge.exhausted",
                tracing::Level::WARN,
                pipeline.name = %self.telemetry.pipeline_name,
                strategy.name = %self.telemetry.strategy_name,
                resilience.attempt.count = attempts,
            );
        }
    }
}

impl<Out> Clone for HedgingEngine<Out> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<Out> Debug for HedgingEngine<Out> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HedgingEngine")
            .field("max_hedged_attempts", &self.shared.max_hedged_attempts)
            .field("hedging_mode", &self.shared.hedging_mode)
            .finish_non_exhaustive()
    }
}
