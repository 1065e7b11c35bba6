// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;

use http::Extensions;
use thiserror::Error;
use tick::Clock;

use super::{
    FaultDecision, FaultError, FaultGroupOptions, FaultInjectionEngine, FaultInjectionOptions, FaultRegistry, FaultResponse,
    WeightedGroupSelector,
};
use crate::options::{NamedOptionsCache, OnRejected, OptionsSource};
use crate::utils::TelemetryHelper;
use crate::{Randomizer, ResilienceContext};

/// Routes a request to a specific fault group, bypassing weighted selection.
///
/// Insert it into the request's extensions.
///
/// ```rust
/// use airbag::chaos::FaultGroupName;
/// use http::Extensions;
///
/// let mut extensions = Extensions::new();
/// extensions.insert(FaultGroupName::new("checkout_errors"));
/// assert_eq!(extensions.get::<FaultGroupName>().unwrap().as_str(), "checkout_errors");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FaultGroupName(Cow<'static, str>);

impl FaultGroupName {
    /// Creates a group override.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Returns the group name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A fault that short-circuited an operation.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum InjectedFault {
    /// An injected error.
    #[error("injected fault: {0}")]
    Error(#[source] FaultError),

    /// An injected response that replaces the real one.
    #[error("injected {} response", .0.status())]
    Response(FaultResponse),
}

/// Applies fault injection options to individual calls.
///
/// The injector follows one named [`FaultInjectionOptions`] instance through a
/// [`NamedOptionsCache`], so reconfiguration takes effect on the next call. Invalid option
/// updates are ignored and, with logs enabled on the context, reported as
/// `airbag.options.rejected`. Payload keys missing from the registry are reported as
/// `airbag.fault.missing` and inject nothing. For every call it picks a fault group (the [`FaultGroupName`] extension
/// when present, weighted selection otherwise), evaluates it, and applies the decision.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// use airbag::chaos::{FaultGroupOptions, FaultInjectionOptions, FaultInjector, FaultKind, FaultRegistry};
/// use airbag::options::OptionsMonitor;
/// use airbag::ResilienceContext;
/// use http::Extensions;
/// use tick::Clock;
///
/// # async fn example(clock: Clock) {
/// let monitor = OptionsMonitor::new();
/// monitor.set(
///     "catalog",
///     FaultInjectionOptions::new()
///         .group(FaultGroupOptions::new("slow").probability(0.1).fault(FaultKind::Latency {
///             latency: Duration::from_millis(500),
///         }))
///         .weight("slow", 1.0),
/// );
///
/// let context = ResilienceContext::new(&clock);
/// let injector = FaultInjector::new("catalog", &context, &monitor, FaultRegistry::new());
///
/// let result = injector.run(&Extensions::new(), || async { "catalog page" }).await;
/// assert_eq!(result.unwrap(), "catalog page");
/// # }
/// ```
#[derive(Debug)]
pub struct FaultInjector {
    options: NamedOptionsCache<FaultInjectionOptions>,
    selector: WeightedGroupSelector,
    engine: FaultInjectionEngine,
    clock: Clock,
    #[cfg(any(feature = "logs", test))]
    telemetry: TelemetryHelper,
}

impl FaultInjector {
    /// Creates an injector following the options published under `name`.
    ///
    /// `name` also identifies the injector in log events.
    pub fn new<S>(
        name: impl Into<Cow<'static, str>>,
        context: &ResilienceContext,
        source: &S,
        registry: FaultRegistry,
    ) -> Self
    where
        S: OptionsSource<FaultInjectionOptions> + ?Sized,
    {
        let name = name.into();
        let rnd = Randomizer::new();
        let telemetry = context.create_telemetry(name.clone());

        Self {
            options: NamedOptionsCache::with_rejection_handler(
                name,
                source,
                |options: &FaultInjectionOptions| options.validate().is_ok(),
                rejection_logger(&telemetry),
            ),
            selector: WeightedGroupSelector::new(rnd.clone()),
            engine: FaultInjectionEngine::new(registry, rnd),
            clock: context.clock().clone(),
            #[cfg(any(feature = "logs", test))]
            telemetry,
        }
    }

    /// Replaces the random source used for group selection and probability draws.
    #[must_use]
    pub fn with_randomizer(self, rnd: Randomizer) -> Self {
        Self {
            selector: WeightedGroupSelector::new(rnd.clone()),
            engine: FaultInjectionEngine::new(self.engine.registry().clone(), rnd),
            ..self
        }
    }

    /// Returns the options currently in effect.
    #[must_use]
    pub fn options(&self) -> std::sync::Arc<FaultInjectionOptions> {
        self.options.current()
    }

    /// Decides which fault, if any, applies to a call carrying `extensions`.
    ///
    /// Unknown group names and empty or zero-weight tables yield [`FaultDecision::None`].
    #[must_use]
    pub fn decide(&self, extensions: &Extensions) -> FaultDecision {
        let options = self.options.current();
        let name = match extensions.get::<FaultGroupName>() {
            Some(name) => Some(name.as_str()),
            None => self.selector.select(&options.weights),
        };

        let Some(group) = name.and_then(|name| options.find_group(name)) else {
            return FaultDecision::None;
        };

        match self.engine.resolve(group) {
            Ok(decision) => {
                self.emit_telemetry(group, &decision);
                decision
            }
            Err(key) => {
                self.emit_missing_payload(group, key);
                FaultDecision::None
            }
        }
    }

    /// Runs `operation` under fault injection.
    ///
    /// Latency faults wait on the context clock and then run the operation. Error and response
    /// faults return without running it.
    ///
    /// # Errors
    ///
    /// Returns [`InjectedFault`] when an error or response fault fires.
    pub async fn run<T, F, Fut>(&self, extensions: &Extensions, operation: F) -> Result<T, InjectedFault>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        match self.decide(extensions) {
            FaultDecision::None => Ok(operation().await),
            FaultDecision::Latency(latency) => {
                self.clock.delay(latency).await;
                Ok(operation().await)
            }
            FaultDecision::Error(error) => Err(InjectedFault::Error(error)),
            FaultDecision::Response(response) => Err(InjectedFault::Response(response)),
        }
    }

    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(unused_variables, clippy::unused_self, reason = "unused when logs are not compiled in")
    )]
    fn emit_telemetry(&self, group: &FaultGroupOptions, decision: &FaultDecision) {
        #[cfg(any(feature = "logs", test))]
        if self.telemetry.logs_enabled {
            let kind = match decision {
                FaultDecision::None => return,
                FaultDecision::Error(_) => "error",
                FaultDecision::Response(_) => "response",
                FaultDecision::Latency(_) => "latency",
            };

            tracing::event!(
                name: "airbag.fault",
                tracing::Level::INFO,
                pipeline.name = %self.telemetry.pipeline_name,
                strategy.name = %self.telemetry.strategy_name,
                fault.group = %group.name,
                fault.kind = kind,
            );
        }
    }

    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(unused_variables, clippy::unused_self, reason = "unused when logs are not compiled in")
    )]
    fn emit_missing_payload(&self, group: &FaultGroupOptions, key: &str) {
        #[cfg(any(feature = "logs", test))]
        if self.telemetry.logs_enabled {
            tracing::event!(
                name: "airbag.fault.missing",
                tracing::Level::WARN,
                pipeline.name = %self.telemetry.pipeline_name,
                strategy.name = %self.telemetry.strategy_name,
                fault.group = %group.name,
                fault.key = key,
                "fault payload is not registered, skipping injection"
            );
        }
    }
}

#[cfg_attr(
    not(any(feature = "logs", test)),
    expect(unused_variables, reason = "unused when logs are not compiled in")
)]
fn rejection_logger(telemetry: &TelemetryHelper) -> OnRejected {
    #[cfg(any(feature = "logs", test))]
    let telemetry = telemetry.clone();

    OnRejected::new(move |options_name| {
        #[cfg(any(feature = "logs", test))]
        if telemetry.logs_enabled {
            tracing::event!(
                name: "airbag.options.rejected",
                tracing::Level::WARN,
                pipeline.name = %telemetry.pipeline_name,
                strategy.name = %telemetry.strategy_name,
                options.name = options_name,
                "ignoring invalid options value"
            );
        }
    })
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use futures::executor::block_on;
    use http::StatusCode;
    use tick::ClockControl;

    use super::*;
    use crate::chaos::FaultKind;
    use crate::options::OptionsMonitor;

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    fn registry() -> FaultRegistry {
        FaultRegistry::new()
            .with_error("boom", Boom)
            .with_response("busy", FaultResponse::new(StatusCode::TOO_MANY_REQUESTS))
    }

    fn options() -> FaultInjectionOptions {
        FaultInjectionOptions::new()
            .group(
                FaultGroupOptions::new("errors")
                    .probability(1.0)
                    .fault(FaultKind::Error { key: "boom".into() }),
            )
            .group(
                FaultGroupOptions::new("busy")
                    .probability(1.0)
                    .fault(FaultKind::Response { key: "busy".into() }),
            )
            .group(
                FaultGroupOptions::new("slow")
                    .probability(1.0)
                    .fault(FaultKind::Latency {
                        latency: Duration::from_secs(3),
                    }),
            )
            .weight("errors", 1.0)
            .weight("busy", 1.0)
    }

    fn injector(clock: &Clock, draw: f64) -> (OptionsMonitor<FaultInjectionOptions>, FaultInjector) {
        let monitor = OptionsMonitor::new();
        monitor.set("chaos", options());
        let context = ResilienceContext::new(clock).name("test_pipeline").enable_logs();
        let injector = FaultInjector::new("chaos", &context, &monitor, registry()).with_randomizer(Randomizer::fixed(draw));
        (monitor, injector)
    }

    #[test]
    fn static_assertions() {
        static_assertions::assert_impl_all!(FaultInjector: Send, Sync);
        static_assertions::assert_impl_all!(InjectedFault: Send, Sync, std::error::Error);
    }

    #[test]
    fn weighted_selection_picks_group() {
        let clock = Clock::new_frozen();

        let (_monitor, low) = injector(&clock, 0.1);
        assert!(matches!(low.decide(&Extensions::new()), FaultDecision::Error(_)));

        let (_monitor, high) = injector(&clock, 0.9);
        assert!(matches!(high.decide(&Extensions::new()), FaultDecision::Response(_)));
    }

    #[test]
    fn extension_overrides_selection() {
        let clock = Clock::new_frozen();
        let (_monitor, injector) = injector(&clock, 0.1);
        let mut extensions = Extensions::new();
        extensions.insert(FaultGroupName::new("slow"));

        assert!(matches!(injector.decide(&extensions), FaultDecision::Latency(d) if d == Duration::from_secs(3)));
    }

    #[test]
    fn unknown_group_fails_open() {
        let clock = Clock::new_frozen();
        let (_monitor, injector) = injector(&clock, 0.1);
        let mut extensions = Extensions::new();
        extensions.insert(FaultGroupName::new("missing"));

        assert!(injector.decide(&extensions).is_none());
    }

    #[test]
    fn zero_weights_fail_open() {
        let clock = Clock::new_frozen();
        let (monitor, injector) = injector(&clock, 0.1);
        monitor.set("chaos", options().weight("errors", 0.0));
        assert!(!injector.decide(&Extensions::new()).is_none());

        let mut zeroed = options();
        zeroed.weights = vec![];
        monitor.set("chaos", zeroed.weight("errors", 0.0).weight("busy", 0.0));
        assert!(injector.decide(&Extensions::new()).is_none());
    }

    #[test]
    fn invalid_reload_is_ignored() {
        let clock = Clock::new_frozen();
        let (monitor, injector) = injector(&clock, 0.1);

        monitor.set("chaos", options().weight("errors", -1.0));
        assert_eq!(*injector.options(), options());
    }

    #[test]
    fn run_short_circuits_on_error() {
        let clock = Clock::new_frozen();
        let (_monitor, injector) = injector(&clock, 0.1);
        let called = AtomicBool::new(false);

        let result = block_on(injector.run(&Extensions::new(), || async {
            called.store(true, Ordering::SeqCst);
        }));

        assert_eq!(result.unwrap_err().to_string(), "injected fault: boom");
        assert!(!called.load(Ordering::SeqCst));
    }

    #[test]
    fn run_short_circuits_on_response() {
        let clock = Clock::new_frozen();
        let (_monitor, injector) = injector(&clock, 0.9);

        let error = block_on(injector.run(&Extensions::new(), || async { 1 })).unwrap_err();

        assert!(matches!(&error, InjectedFault::Response(r) if r.status() == StatusCode::TOO_MANY_REQUESTS));
        assert_eq!(error.to_string(), "injected 429 Too Many Requests response");
    }

    #[test]
    fn run_waits_for_latency_then_runs() {
        let control = ClockControl::new().auto_advance_timers(true);
        let clock = control.to_clock();
        let (_monitor, injector) = injector(&clock, 0.1);
        let mut extensions = Extensions::new();
        extensions.insert(FaultGroupName::new("slow"));

        let stopwatch = clock.stopwatch();
        let result = block_on(injector.run(&extensions, || async { "done" }));

        assert_eq!(result.unwrap(), "done");
        assert!(stopwatch.elapsed() >= Duration::from_secs(3));
    }

    #[test]
    fn run_without_fault_runs_operation() {
        let monitor = OptionsMonitor::new();
        let context = ResilienceContext::new(Clock::new_frozen());
        let injector = FaultInjector::new("chaos", &context, &monitor, registry());
        let ran = Arc::new(AtomicBool::new(false));

        let value = block_on(injector.run(&Extensions::new(), || async {
            ran.store(true, Ordering::SeqCst);
            7
        }))
        .unwrap();

        assert_eq!(value, 7);
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn injected_fault_is_logged() {
        use tracing_subscriber::util::SubscriberInitExt;

        use crate::testing::LogCapture;

        let log_capture = LogCapture::new();
        let _guard = log_capture.subscriber().set_default();

        let clock = Clock::new_frozen();
        let (_monitor, injector) = injector(&clock, 0.1);
        let _ = injector.decide(&Extensions::new());

        log_capture.assert_contains("airbag::chaos");
        log_capture.assert_contains("test_pipeline");
        log_capture.assert_contains("fault.group=errors");
        log_capture.assert_contains("fault.kind=\"error\"");
    }

    #[test]
    fn logs_stay_silent_unless_enabled() {
        use tracing_subscriber::util::SubscriberInitExt;

        use crate::testing::LogCapture;

        let log_capture = LogCapture::new();
        let _guard = log_capture.subscriber().set_default();

        let monitor = OptionsMonitor::new();
        monitor.set("chaos", options());
        let context = ResilienceContext::new(Clock::new_frozen());
        let injector = FaultInjector::new("chaos", &context, &monitor, registry()).with_randomizer(Randomizer::fixed(0.1));
        assert!(!injector.decide(&Extensions::new()).is_none());

        log_capture.assert_empty();
    }

    fn with_ghost_group() -> FaultInjectionOptions {
        options().group(
            FaultGroupOptions::new("ghost")
                .probability(1.0)
                .fault(FaultKind::Error { key: "unregistered".into() }),
        )
    }

    #[test]
    fn missing_payload_is_logged_for_pipeline() {
        use tracing_subscriber::util::SubscriberInitExt;

        use crate::testing::LogCapture;

        let log_capture = LogCapture::new();
        let _guard = log_capture.subscriber().set_default();

        let clock = Clock::new_frozen();
        let (monitor, injector) = injector(&clock, 0.1);
        monitor.set("chaos", with_ghost_group());
        let mut extensions = Extensions::new();
        extensions.insert(FaultGroupName::new("ghost"));

        assert!(injector.decide(&extensions).is_none());
        log_capture.assert_contains("WARN");
        log_capture.assert_contains("pipeline.name=test_pipeline");
        log_capture.assert_contains("strategy.name=chaos");
        log_capture.assert_contains("fault.group=ghost");
        log_capture.assert_contains("fault.key=\"unregistered\"");
    }

    #[test]
    fn rejected_reload_is_logged_for_pipeline() {
        use tracing_subscriber::util::SubscriberInitExt;

        use crate::testing::LogCapture;

        let log_capture = LogCapture::new();
        let _guard = log_capture.subscriber().set_default();

        let clock = Clock::new_frozen();
        let (monitor, _injector) = injector(&clock, 0.1);
        monitor.set("chaos", options().weight("errors", -1.0));

        log_capture.assert_contains("ignoring invalid options value");
        log_capture.assert_contains("pipeline.name=test_pipeline");
        log_capture.assert_contains("strategy.name=chaos");
        log_capture.assert_contains("options.name=\"chaos\"");
    }

    #[test]
    fn warnings_stay_silent_unless_enabled() {
        use tracing_subscriber::util::SubscriberInitExt;

        use crate::testing::LogCapture;

        let log_capture = LogCapture::new();
        let _guard = log_capture.subscriber().set_default();

        let monitor = OptionsMonitor::new();
        monitor.set("chaos", with_ghost_group());
        let context = ResilienceContext::new(Clock::new_frozen());
        let injector = FaultInjector::new("chaos", &context, &monitor, registry());
        let mut extensions = Extensions::new();
        extensions.insert(FaultGroupName::new("ghost"));

        assert!(injector.decide(&extensions).is_none());
        monitor.set("chaos", options().weight("errors", -1.0));
        assert_eq!(*injector.options(), with_ghost_group());

        log_capture.assert_empty();
    }
}
